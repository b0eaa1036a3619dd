// rlox: Lox interpreter/compiler in Rust.
//    Copyright 2023 James Smith <j@mes.sh>
//
//    Licensed under the Apache License, Version 2.0 (the "License");
//    you may not use this file except in compliance with the License.
//    You may obtain a copy of the License at
//
//        http://www.apache.org/licenses/LICENSE-2.0
//
//    Unless required by applicable law or agreed to in writing, software
//    distributed under the License is distributed on an "AS IS" BASIS,
//    WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//    See the License for the specific language governing permissions and
//    limitations under the License.

use std::fmt;
use std::rc::Rc;

use super::callable::{Clock, LoxClass, LoxFunction, LoxInstance};

#[derive(Debug, Clone)]
pub enum LoxValue {
    Bool(bool),
    Number(f64),
    String(String),
    Function(Rc<LoxFunction>),
    NativeFunction(Rc<Clock>),
    Class(Rc<LoxClass>),
    Instance(Rc<LoxInstance>),
    Nil,
}

impl PartialEq for LoxValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (LoxValue::Bool(a), LoxValue::Bool(b)) => a == b,
            (LoxValue::Number(a), LoxValue::Number(b)) => a == b,
            (LoxValue::String(a), LoxValue::String(b)) => a == b,
            (LoxValue::Nil, LoxValue::Nil) => true,
            (LoxValue::Function(a), LoxValue::Function(b)) => Rc::ptr_eq(a, b),
            (LoxValue::NativeFunction(a), LoxValue::NativeFunction(b)) => Rc::ptr_eq(a, b),
            (LoxValue::Class(a), LoxValue::Class(b)) => Rc::ptr_eq(a, b),
            (LoxValue::Instance(a), LoxValue::Instance(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for LoxValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoxValue::Bool(v) => write!(f, "{v}"),
            LoxValue::Nil => write!(f, "nil"),
            LoxValue::Number(n) => {
                let repr = n.to_string();
                if let Some(stripped) = repr.strip_suffix(".0") {
                    write!(f, "{stripped}")
                } else {
                    write!(f, "{repr}")
                }
            }
            LoxValue::String(s) => write!(f, "{s}"),
            LoxValue::Function(fun) => write!(f, "{fun}"),
            LoxValue::NativeFunction(native) => write!(f, "{native}"),
            LoxValue::Class(class) => write!(f, "{class}"),
            LoxValue::Instance(instance) => write!(f, "{instance}"),
        }
    }
}

impl LoxValue {
    pub fn is_truthy(&self) -> bool {
        match self {
            LoxValue::Bool(v) => *v,
            LoxValue::Nil => false,
            _ => true,
        }
    }
}
