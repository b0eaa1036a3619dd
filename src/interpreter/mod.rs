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

//! Evaluates the AST the parser builds, using the resolver's `locals` side
//! table to jump straight to the right environment frame instead of
//! re-walking the scope chain on every variable access.

mod callable;
mod environment;
mod value;

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{self, Write};
use std::rc::Rc;

use log::trace;

use crate::errors::RuntimeError;
use crate::parser::ast::{Expr, ExprLiteral, NodeId, Stmt};
use crate::scanner::{Token, TokenType};

use callable::{Callable, Clock, LoxClass, LoxFunction};
use environment::Environment;
pub use value::LoxValue;

type Result<T> = std::result::Result<T, RuntimeError>;

/// The non-error unwind used to carry a function's return value up through
/// nested blocks and loops, kept distinct from `RuntimeError` so a `return`
/// three blocks deep doesn't look like a failure to the caller.
pub(super) enum Signal {
    Normal,
    Return(LoxValue),
}

pub struct Interpreter {
    globals: Rc<RefCell<Environment>>,
    env: Rc<RefCell<Environment>>,
    locals: HashMap<NodeId, usize>,
    writer: Box<dyn Write>,
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_writer(Box::new(io::stdout()))
    }

    /// Builds an interpreter that writes `print` output to `writer` instead
    /// of standard out, so tests can assert on program output directly.
    pub fn with_writer(writer: Box<dyn Write>) -> Self {
        let globals = Environment::new_global();
        globals.borrow_mut().define("clock", LoxValue::NativeFunction(Rc::new(Clock)));

        Self {
            globals: Rc::clone(&globals),
            env: globals,
            locals: HashMap::new(),
            writer,
        }
    }

    /// Runs one program's statements against this interpreter's (persistent)
    /// global environment. `locals` replaces the previous side table wholesale
    /// rather than merging into it: a REPL line's `NodeId`s are meaningless
    /// once that line's statements have executed, so stale entries from an
    /// earlier line can never collide with a later one.
    pub fn interpret(&mut self, program: &[Stmt], locals: HashMap<NodeId, usize>) -> Result<()> {
        self.locals = locals;
        for stmt in program {
            self.execute_stmt(stmt)?;
        }
        Ok(())
    }

    fn execute_stmt(&mut self, stmt: &Stmt) -> Result<Signal> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
                Ok(Signal::Normal)
            }
            Stmt::Print(expr) => {
                let value = self.evaluate(expr)?;
                writeln!(self.writer, "{value}").expect("print target should accept writes");
                Ok(Signal::Normal)
            }
            Stmt::Var(name, initializer) => {
                let value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => LoxValue::Nil,
                };
                self.env.borrow_mut().define(name.lexeme(), value);
                Ok(Signal::Normal)
            }
            Stmt::Block(stmts) => {
                let env = Environment::with_enclosing(&self.env);
                self.execute_block(stmts, env)
            }
            Stmt::If(condition, then_branch, else_branch) => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute_stmt(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.execute_stmt(else_branch)
                } else {
                    Ok(Signal::Normal)
                }
            }
            Stmt::While(condition, body) => {
                while self.evaluate(condition)?.is_truthy() {
                    match self.execute_stmt(body)? {
                        Signal::Normal => {}
                        signal @ Signal::Return(_) => return Ok(signal),
                    }
                }
                Ok(Signal::Normal)
            }
            Stmt::Fun(name, params, body) => {
                let fun = LoxFunction::new(name, Rc::from(params.clone()), Rc::from(body.clone()), Rc::clone(&self.env), false);
                self.env.borrow_mut().define(name.lexeme(), LoxValue::Function(Rc::new(fun)));
                Ok(Signal::Normal)
            }
            Stmt::Return(_keyword, value) => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => LoxValue::Nil,
                };
                Ok(Signal::Return(value))
            }
            Stmt::Class(name, superclass, methods) => self.execute_class(name, superclass, methods),
        }
    }

    fn execute_class(&mut self, name: &Token, superclass: &Option<Box<Expr>>, methods: &[Stmt]) -> Result<Signal> {
        let superclass = match superclass {
            Some(expr) => match self.evaluate(expr)? {
                LoxValue::Class(class) => Some(class),
                _ => {
                    let token = match expr.as_ref() {
                        Expr::Variable(_, token) => token.clone(),
                        _ => name.clone(),
                    };
                    return Err(RuntimeError::new(token, "Superclass must be a class."));
                }
            },
            None => None,
        };

        self.env.borrow_mut().define(name.lexeme(), LoxValue::Nil);

        let enclosing = if let Some(superclass) = &superclass {
            let env = Environment::with_enclosing(&self.env);
            env.borrow_mut().define("super", LoxValue::Class(Rc::clone(superclass)));
            Some(std::mem::replace(&mut self.env, env))
        } else {
            None
        };

        let mut method_table = HashMap::new();
        for method in methods {
            if let Stmt::Fun(method_name, params, body) = method {
                let is_initializer = method_name.lexeme() == "init";
                let fun = LoxFunction::new(
                    method_name,
                    Rc::from(params.clone()),
                    Rc::from(body.clone()),
                    Rc::clone(&self.env),
                    is_initializer,
                );
                method_table.insert(method_name.lexeme().to_string(), Rc::new(fun));
            }
        }

        if let Some(previous) = enclosing {
            self.env = previous;
        }

        let class = Rc::new(LoxClass::new(name.lexeme(), superclass, method_table));
        self.env.borrow_mut().assign(name, LoxValue::Class(class))?;

        Ok(Signal::Normal)
    }

    /// Executes `stmts` against a fresh environment frame, restoring the
    /// caller's frame afterward whether the block finished, returned, or
    /// raised a runtime error. Shared by plain `{ }` blocks and function
    /// calls (see `callable::LoxFunction::call`).
    pub(super) fn execute_block(&mut self, stmts: &[Stmt], env: Rc<RefCell<Environment>>) -> Result<Signal> {
        let previous = std::mem::replace(&mut self.env, env);

        let mut result = Ok(Signal::Normal);
        for stmt in stmts {
            match self.execute_stmt(stmt) {
                Ok(Signal::Normal) => {}
                Ok(signal @ Signal::Return(_)) => {
                    result = Ok(signal);
                    break;
                }
                Err(e) => {
                    result = Err(e);
                    break;
                }
            }
        }

        self.env = previous;
        result
    }

    fn evaluate(&mut self, expr: &Expr) -> Result<LoxValue> {
        match expr {
            Expr::Literal(_, lit) => Ok(match lit {
                ExprLiteral::Bool(b) => LoxValue::Bool(*b),
                ExprLiteral::Number(n) => LoxValue::Number(*n),
                ExprLiteral::String(s) => LoxValue::String(s.clone()),
                ExprLiteral::Nil => LoxValue::Nil,
            }),
            Expr::Variable(id, name) => self.lookup_variable(*id, name),
            Expr::Grouping(_, inner) => self.evaluate(inner),
            Expr::Unary(_, op, right) => self.unary(op, right),
            Expr::Binary(_, left, op, right) => self.binary(left, op, right),
            Expr::Assign(id, name, value) => {
                let value = self.evaluate(value)?;
                self.assign_variable(*id, name, value.clone())?;
                Ok(value)
            }
            Expr::Logical(_, left, op, right) => {
                let left = self.evaluate(left)?;
                match op.token_type() {
                    TokenType::Or if left.is_truthy() => Ok(left),
                    TokenType::And if !left.is_truthy() => Ok(left),
                    _ => self.evaluate(right),
                }
            }
            Expr::Call(_, callee, paren, arguments) => self.call(callee, paren, arguments),
            Expr::Get(_, object, name) => match self.evaluate(object)? {
                LoxValue::Instance(instance) => instance.get(name),
                _ => Err(RuntimeError::new(name.clone(), "Only instances have properties.")),
            },
            Expr::Set(_, object, name, value) => match self.evaluate(object)? {
                LoxValue::Instance(instance) => {
                    let value = self.evaluate(value)?;
                    instance.set(name, value.clone());
                    Ok(value)
                }
                _ => Err(RuntimeError::new(name.clone(), "Only instances have fields.")),
            },
            Expr::This(id, keyword) => self.lookup_variable(*id, keyword),
            Expr::Super(id, keyword, method) => self.super_get(*id, keyword, method),
        }
    }

    fn unary(&mut self, op: &Token, right: &Expr) -> Result<LoxValue> {
        let right = self.evaluate(right)?;
        match op.token_type() {
            TokenType::Bang => Ok(LoxValue::Bool(!right.is_truthy())),
            TokenType::Minus => match right {
                LoxValue::Number(n) => Ok(LoxValue::Number(-n)),
                _ => Err(RuntimeError::new(op.clone(), "Operand must be a number.")),
            },
            other => unreachable!("parser never emits Unary with operator {other:?}"),
        }
    }

    fn binary(&mut self, left: &Expr, op: &Token, right: &Expr) -> Result<LoxValue> {
        let left = self.evaluate(left)?;
        let right = self.evaluate(right)?;

        use LoxValue::{Number, String};

        match op.token_type() {
            TokenType::Plus => match (&left, &right) {
                (Number(a), Number(b)) => Ok(Number(a + b)),
                (String(a), String(b)) => Ok(String(format!("{a}{b}"))),
                _ => Err(RuntimeError::new(op.clone(), "Operands must be two numbers or two strings.")),
            },
            TokenType::Minus => numeric(op, &left, &right, |a, b| a - b),
            TokenType::Star => numeric(op, &left, &right, |a, b| a * b),
            TokenType::Slash => numeric(op, &left, &right, |a, b| if b == 0.0 { f64::NAN } else { a / b }),
            TokenType::Greater => comparison(op, &left, &right, |a, b| a > b),
            TokenType::GreaterEqual => comparison(op, &left, &right, |a, b| a >= b),
            TokenType::Less => comparison(op, &left, &right, |a, b| a < b),
            TokenType::LessEqual => comparison(op, &left, &right, |a, b| a <= b),
            TokenType::EqualEqual => Ok(LoxValue::Bool(left == right)),
            TokenType::BangEqual => Ok(LoxValue::Bool(left != right)),
            other => unreachable!("parser never emits Binary with operator {other:?}"),
        }
    }

    fn call(&mut self, callee: &Expr, paren: &Token, arguments: &[Expr]) -> Result<LoxValue> {
        let callee = self.evaluate(callee)?;

        let mut args = Vec::with_capacity(arguments.len());
        for arg in arguments {
            args.push(self.evaluate(arg)?);
        }

        let arity = match &callee {
            LoxValue::Function(f) => f.arity(),
            LoxValue::NativeFunction(f) => f.arity(),
            LoxValue::Class(c) => c.arity(),
            _ => return Err(RuntimeError::new(paren.clone(), "Can only call functions and classes.")),
        };

        if arity != args.len() {
            return Err(RuntimeError::new(
                paren.clone(),
                format!("Expected {arity} arguments but got {}.", args.len()),
            ));
        }

        match callee {
            LoxValue::Function(f) => f.call(self, args),
            LoxValue::NativeFunction(f) => f.call(self, args),
            LoxValue::Class(c) => c.instantiate(self, args),
            _ => unreachable!("arity check above already rejected non-callables"),
        }
    }

    fn super_get(&mut self, id: NodeId, keyword: &Token, method: &Token) -> Result<LoxValue> {
        let distance = *self
            .locals
            .get(&id)
            .expect("resolver always resolves a valid 'super' expression");

        let superclass = environment::get_at_str(&self.env, distance, "super")
            .expect("resolver guarantees an enclosing 'super' binding");
        let instance = environment::get_at_str(&self.env, distance - 1, "this")
            .expect("resolver guarantees an enclosing 'this' binding");

        let (LoxValue::Class(superclass), LoxValue::Instance(instance)) = (superclass, instance) else {
            unreachable!("'super'/'this' bindings are always Class/Instance values");
        };

        match superclass.find_method(method.lexeme()) {
            Some(found) => Ok(LoxValue::Function(Rc::new(found.bind(instance)))),
            None => Err(RuntimeError::new(
                keyword.clone(),
                format!("Undefined property '{}'.", method.lexeme()),
            )),
        }
    }

    fn lookup_variable(&self, id: NodeId, name: &Token) -> Result<LoxValue> {
        match self.locals.get(&id) {
            Some(&distance) => {
                trace!("looking up {} at distance {distance}", name.lexeme());
                environment::get_at(&self.env, distance, name)
            }
            None => self.globals.borrow().get(name),
        }
    }

    fn assign_variable(&mut self, id: NodeId, name: &Token, value: LoxValue) -> Result<()> {
        match self.locals.get(&id) {
            Some(&distance) => environment::assign_at(&self.env, distance, name, value),
            None => self.globals.borrow_mut().assign(name, value),
        }
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

fn numeric(op: &Token, left: &LoxValue, right: &LoxValue, f: impl Fn(f64, f64) -> f64) -> Result<LoxValue> {
    match (left, right) {
        (LoxValue::Number(a), LoxValue::Number(b)) => Ok(LoxValue::Number(f(*a, *b))),
        _ => Err(RuntimeError::new(op.clone(), "Operands must be numbers.")),
    }
}

fn comparison(op: &Token, left: &LoxValue, right: &LoxValue, f: impl Fn(f64, f64) -> bool) -> Result<LoxValue> {
    match (left, right) {
        (LoxValue::Number(a), LoxValue::Number(b)) => Ok(LoxValue::Bool(f(*a, *b))),
        _ => Err(RuntimeError::new(op.clone(), "Operands must be numbers.")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;
    use crate::resolver::Resolver;
    use crate::scanner::Scanner;

    #[test]
    fn arithmetic_prints_sum() {
        let out = run_capturing("print 1 + 2;");
        assert_eq!(out, "3\n");
    }

    fn run_capturing(source: &str) -> String {
        let mut scanner = Scanner::new();
        let tokens = scanner.scan_tokens(source).to_vec();
        assert!(scanner.errors().is_empty());

        let mut parser = Parser::new(tokens);
        let program = parser.parse();
        assert!(parser.errors().is_empty());

        let mut resolver = Resolver::new();
        resolver.resolve(&program);
        assert!(resolver.errors().is_empty());
        let locals = resolver.into_locals();

        let buffer = Rc::new(RefCell::new(Vec::<u8>::new()));
        let mut interpreter = Interpreter::with_writer(Box::new(SharedBuf(Rc::clone(&buffer))));
        interpreter.interpret(&program, locals).expect("program should run without a runtime error");

        let bytes = buffer.borrow().clone();
        String::from_utf8(bytes).unwrap()
    }

    struct SharedBuf(Rc<RefCell<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().write(buf)
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn closures_observe_reassignment_after_capture() {
        let out = run_capturing(
            "fun make() { var a = 1; fun get() { return a; } a = 2; return get(); } print make();",
        );
        assert_eq!(out, "2\n");
    }

    #[test]
    fn shadowing_in_block_does_not_affect_closure_over_outer_scope() {
        let out = run_capturing(
            r#"var a = "global"; { fun f() { print a; } var a = "local"; f(); }"#,
        );
        assert_eq!(out, "global\n");
    }

    #[test]
    fn superclass_method_dispatch_chains_to_subclass() {
        let out = run_capturing(
            r#"class A { m() { print "A"; } } class B < A { m() { super.m(); print "B"; } } B().m();"#,
        );
        assert_eq!(out, "A\nB\n");
    }

    #[test]
    fn bare_return_from_function_yields_nil() {
        let out = run_capturing("fun f() { return; } print f();");
        assert_eq!(out, "nil\n");
    }

    #[test]
    fn division_by_zero_yields_nan_not_an_error() {
        let out = run_capturing("print 1 / 0;");
        assert_eq!(out, "NaN\n");
    }

    #[test]
    fn whole_numbers_print_without_trailing_zero() {
        let out = run_capturing("print 6 / 2;");
        assert_eq!(out, "3\n");
    }

    #[test]
    fn adding_number_and_string_is_a_runtime_error() {
        let mut scanner = Scanner::new();
        let tokens = scanner.scan_tokens(r#"var x; x = x + 1;"#).to_vec();
        let mut parser = Parser::new(tokens);
        let program = parser.parse();
        let mut resolver = Resolver::new();
        resolver.resolve(&program);
        let locals = resolver.into_locals();

        let mut interpreter = Interpreter::with_writer(Box::new(Vec::<u8>::new()));
        let err = interpreter.interpret(&program, locals).unwrap_err();
        assert!(err.message.contains("Operands must be two numbers or two strings."));
    }

    #[test]
    fn init_always_returns_the_instance_even_with_a_bare_return() {
        let out = run_capturing(
            r#"class Foo { init() { this.x = 1; return; } } var f = Foo(); print f.x;"#,
        );
        assert_eq!(out, "1\n");
    }

    #[test]
    fn field_set_then_get_round_trips() {
        let out = run_capturing(r#"class Box {} var b = Box(); b.value = 42; print b.value;"#);
        assert_eq!(out, "42\n");
    }

    #[test]
    fn calling_a_non_callable_is_a_runtime_error() {
        let mut scanner = Scanner::new();
        let tokens = scanner.scan_tokens("var x = 1; x();").to_vec();
        let mut parser = Parser::new(tokens);
        let program = parser.parse();
        let mut resolver = Resolver::new();
        resolver.resolve(&program);
        let locals = resolver.into_locals();

        let mut interpreter = Interpreter::with_writer(Box::new(Vec::<u8>::new()));
        let err = interpreter.interpret(&program, locals).unwrap_err();
        assert!(err.message.contains("Can only call functions and classes."));
    }
}
