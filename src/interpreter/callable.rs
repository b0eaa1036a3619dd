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

//! Runtime representations of the three callable kinds the interpreter
//! dispatches on (`NativeFn`, `LoxFunction`, `LoxClass`) plus `LoxInstance`,
//! which carries fields and methods but is not itself callable.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::errors::RuntimeError;
use crate::parser::ast::Stmt;
use crate::scanner::Token;

use super::environment::Environment;
use super::value::LoxValue;
use super::Interpreter;

/// The capability set every invocable runtime value implements: how many
/// arguments it wants, and what happens when it's given them.
pub(super) trait Callable {
    fn arity(&self) -> usize;
    fn call(&self, interpreter: &mut Interpreter, arguments: Vec<LoxValue>) -> Result<LoxValue, RuntimeError>;
}

/// The single native builtin the language ships: `clock()`.
#[derive(Debug)]
pub(super) struct Clock;

impl Callable for Clock {
    fn arity(&self) -> usize {
        0
    }

    fn call(&self, _interpreter: &mut Interpreter, _arguments: Vec<LoxValue>) -> Result<LoxValue, RuntimeError> {
        let micros = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock is after the epoch")
            .as_micros() as f64;
        Ok(LoxValue::Number(micros))
    }
}

impl fmt::Display for Clock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<native fn>")
    }
}

/// A user-defined function or method. `closure` is the environment captured
/// at the point of declaration; it is what makes the value a genuine
/// closure rather than a plain code pointer.
#[derive(Debug)]
pub(super) struct LoxFunction {
    name: String,
    params: Rc<[Token]>,
    body: Rc<[Stmt]>,
    closure: Rc<RefCell<Environment>>,
    is_initializer: bool,
}

impl LoxFunction {
    pub fn new(
        name: &Token,
        params: Rc<[Token]>,
        body: Rc<[Stmt]>,
        closure: Rc<RefCell<Environment>>,
        is_initializer: bool,
    ) -> Self {
        Self {
            name: name.lexeme().to_string(),
            params,
            body,
            closure,
            is_initializer,
        }
    }

    /// Returns a copy of this function whose innermost closure frame binds
    /// `this` to `instance`. The original closure is untouched, so other
    /// bound copies of the same method (e.g. from a different instance)
    /// stay independent.
    pub fn bind(&self, instance: Rc<LoxInstance>) -> LoxFunction {
        let env = Environment::with_enclosing(&self.closure);
        env.borrow_mut().define("this", LoxValue::Instance(instance));

        LoxFunction {
            name: self.name.clone(),
            params: Rc::clone(&self.params),
            body: Rc::clone(&self.body),
            closure: env,
            is_initializer: self.is_initializer,
        }
    }
}

impl Callable for LoxFunction {
    fn arity(&self) -> usize {
        self.params.len()
    }

    fn call(&self, interpreter: &mut Interpreter, arguments: Vec<LoxValue>) -> Result<LoxValue, RuntimeError> {
        let env = Environment::with_enclosing(&self.closure);
        for (param, arg) in self.params.iter().zip(arguments) {
            env.borrow_mut().define(param.lexeme(), arg);
        }

        let signal = interpreter.execute_block(&self.body, env)?;

        if self.is_initializer {
            // `bind` always wraps `this` directly around `self.closure`, so
            // it sits at distance 0 regardless of the call's own frame.
            let this = super::environment::get_at_str(&self.closure, 0, "this")
                .expect("initializer closure always binds 'this'");
            return Ok(this);
        }

        Ok(match signal {
            super::Signal::Return(value) => value,
            super::Signal::Normal => LoxValue::Nil,
        })
    }
}

impl fmt::Display for LoxFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<fn {}>", self.name)
    }
}

/// A class value. `methods` holds only what this class declares directly;
/// lookups that miss fall through to `superclass`.
#[derive(Debug)]
pub(super) struct LoxClass {
    name: String,
    superclass: Option<Rc<LoxClass>>,
    methods: HashMap<String, Rc<LoxFunction>>,
}

impl LoxClass {
    pub fn new(name: &str, superclass: Option<Rc<LoxClass>>, methods: HashMap<String, Rc<LoxFunction>>) -> Self {
        Self {
            name: name.to_string(),
            superclass,
            methods,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn find_method(&self, name: &str) -> Option<Rc<LoxFunction>> {
        if let Some(method) = self.methods.get(name) {
            return Some(Rc::clone(method));
        }
        self.superclass.as_ref().and_then(|superclass| superclass.find_method(name))
    }
}

impl LoxClass {
    pub fn arity(&self) -> usize {
        self.find_method("init").map(|init| init.arity()).unwrap_or(0)
    }

    /// Constructs a new instance, running `init` (if declared) against it.
    /// Always returns the instance, even when `init` is an initializer with
    /// a bare `return;` inside it — see `LoxFunction::call`'s initializer case.
    pub fn instantiate(self: &Rc<Self>, interpreter: &mut Interpreter, arguments: Vec<LoxValue>) -> Result<LoxValue, RuntimeError> {
        let instance = LoxInstance::new(Rc::clone(self));

        if let Some(init) = self.find_method("init") {
            init.bind(Rc::clone(&instance)).call(interpreter, arguments)?;
        }

        Ok(LoxValue::Instance(instance))
    }
}

impl fmt::Display for LoxClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// A runtime instance of a `LoxClass`. Fields live directly on the
/// instance; methods are looked up on the class and bound lazily on access.
#[derive(Debug)]
pub(super) struct LoxInstance {
    class: Rc<LoxClass>,
    fields: RefCell<HashMap<String, LoxValue>>,
}

impl LoxInstance {
    pub fn new(class: Rc<LoxClass>) -> Rc<LoxInstance> {
        Rc::new(LoxInstance {
            class,
            fields: RefCell::new(HashMap::new()),
        })
    }

    pub fn get(self: &Rc<Self>, name: &Token) -> Result<LoxValue, RuntimeError> {
        if let Some(value) = self.fields.borrow().get(name.lexeme()) {
            return Ok(value.clone());
        }

        if let Some(method) = self.class.find_method(name.lexeme()) {
            let bound = method.bind(Rc::clone(self));
            return Ok(LoxValue::Function(Rc::new(bound)));
        }

        Err(RuntimeError::new(
            name.clone(),
            format!("Undefined property '{}'.", name.lexeme()),
        ))
    }

    pub fn set(&self, name: &Token, value: LoxValue) {
        self.fields.borrow_mut().insert(name.lexeme().to_string(), value);
    }
}

impl fmt::Display for LoxInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} instance", self.class.name())
    }
}
