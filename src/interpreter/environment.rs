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

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::errors::RuntimeError;
use crate::scanner::Token;

use super::value::LoxValue;

/// One lexical scope. Scopes form a singly-linked chain via `enclosing`, so
/// a closure can keep its declaring scope alive by holding a clone of its
/// `Rc` long after the block that created it has returned — unlike a flat
/// `Vec<Scope>` stack, popping an outer scope here can't invalidate a
/// reference a closure is still holding.
#[derive(Debug)]
pub(super) struct Environment {
    values: HashMap<String, LoxValue>,
    enclosing: Option<Rc<RefCell<Environment>>>,
}

impl Environment {
    pub fn new_global() -> Rc<RefCell<Environment>> {
        Rc::new(RefCell::new(Environment {
            values: HashMap::new(),
            enclosing: None,
        }))
    }

    pub fn with_enclosing(enclosing: &Rc<RefCell<Environment>>) -> Rc<RefCell<Environment>> {
        Rc::new(RefCell::new(Environment {
            values: HashMap::new(),
            enclosing: Some(Rc::clone(enclosing)),
        }))
    }

    pub fn define(&mut self, name: &str, value: LoxValue) {
        self.values.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &Token) -> Result<LoxValue, RuntimeError> {
        if let Some(value) = self.values.get(name.lexeme()) {
            return Ok(value.clone());
        }

        if let Some(enclosing) = &self.enclosing {
            return enclosing.borrow().get(name);
        }

        Err(RuntimeError::new(
            name.clone(),
            format!("Undefined variable '{}'.", name.lexeme()),
        ))
    }

    pub fn assign(&mut self, name: &Token, value: LoxValue) -> Result<(), RuntimeError> {
        if self.values.contains_key(name.lexeme()) {
            self.values.insert(name.lexeme().to_string(), value);
            return Ok(());
        }

        if let Some(enclosing) = &self.enclosing {
            return enclosing.borrow_mut().assign(name, value);
        }

        Err(RuntimeError::new(
            name.clone(),
            format!("Undefined variable '{}'.", name.lexeme()),
        ))
    }
}

/// Walks `distance` enclosing links from `env` and returns the environment
/// found there. Used by `get_at`/`assign_at` once the resolver has told us
/// exactly how many hops a reference needs, instead of searching the chain.
pub(super) fn ancestor(env: &Rc<RefCell<Environment>>, distance: usize) -> Rc<RefCell<Environment>> {
    let mut current = Rc::clone(env);
    for _ in 0..distance {
        let next = current
            .borrow()
            .enclosing
            .as_ref()
            .expect("resolver-computed distance exceeds the environment chain")
            .clone();
        current = next;
    }
    current
}

pub(super) fn get_at(env: &Rc<RefCell<Environment>>, distance: usize, name: &Token) -> Result<LoxValue, RuntimeError> {
    ancestor(env, distance)
        .borrow()
        .values
        .get(name.lexeme())
        .cloned()
        .ok_or_else(|| RuntimeError::new(name.clone(), format!("Undefined variable '{}'.", name.lexeme())))
}

pub(super) fn get_at_str(env: &Rc<RefCell<Environment>>, distance: usize, name: &str) -> Option<LoxValue> {
    ancestor(env, distance).borrow().values.get(name).cloned()
}

pub(super) fn assign_at(
    env: &Rc<RefCell<Environment>>,
    distance: usize,
    name: &Token,
    value: LoxValue,
) -> Result<(), RuntimeError> {
    ancestor(env, distance).borrow_mut().values.insert(name.lexeme().to_string(), value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::{Token, TokenType};

    fn tok(name: &str) -> Token {
        Token::new(TokenType::Identifier, name.to_string(), 1)
    }

    #[test]
    fn test_basics() {
        let env = Environment::new_global();
        env.borrow_mut().define("var1", LoxValue::Bool(true));
        env.borrow_mut().define("var2", LoxValue::Nil);

        assert_eq!(env.borrow().get(&tok("var2")).unwrap(), LoxValue::Nil);
        assert_eq!(env.borrow().get(&tok("var1")).unwrap(), LoxValue::Bool(true));
    }

    #[test]
    fn test_assignment() {
        let env = Environment::new_global();
        env.borrow_mut().define("var_test", LoxValue::Bool(true));
        env.borrow_mut().assign(&tok("var_test"), LoxValue::Bool(false)).unwrap();
        assert_eq!(env.borrow().get(&tok("var_test")).unwrap(), LoxValue::Bool(false));
    }

    #[test]
    fn test_failing_assignment() {
        let env = Environment::new_global();
        env.borrow_mut().define("fail_me", LoxValue::Bool(true));

        assert!(env.borrow_mut().assign(&tok("var_test"), LoxValue::Bool(false)).is_err());
    }

    #[test]
    fn test_nested_get() {
        let root = Environment::new_global();
        root.borrow_mut().define("name1", LoxValue::Bool(true));
        root.borrow_mut().define("name2", LoxValue::Bool(false));

        let child = Environment::with_enclosing(&root);
        child.borrow_mut().define("name3", LoxValue::String("Found".to_string()));

        let grandchild = Environment::with_enclosing(&child);

        assert!(grandchild.borrow().get(&tok("name1")).is_ok());
        assert!(grandchild.borrow().get(&tok("name2")).is_ok());
        assert!(grandchild.borrow().get(&tok("name3")).is_ok());
    }

    #[test]
    fn test_nested_assignment_reaches_parent_scope() {
        let root = Environment::new_global();
        root.borrow_mut().define("name1", LoxValue::Bool(true));

        let child = Environment::with_enclosing(&root);
        assert!(child.borrow_mut().assign(&tok("name4"), LoxValue::Number(32.)).is_err());
        assert!(child.borrow_mut().assign(&tok("name1"), LoxValue::Nil).is_ok());

        assert_eq!(root.borrow().get(&tok("name1")).unwrap(), LoxValue::Nil);
    }

    #[test]
    fn closure_keeps_declaring_scope_alive_after_block_returns() {
        let global = Environment::new_global();
        let closure = {
            let block = Environment::with_enclosing(&global);
            block.borrow_mut().define("captured", LoxValue::Number(7.0));
            // `block` drops here; `closure` is the only remaining handle.
            block
        };

        assert_eq!(closure.borrow().get(&tok("captured")).unwrap(), LoxValue::Number(7.0));
    }
}
