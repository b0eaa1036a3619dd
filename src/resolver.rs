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

//! Static analysis pass between parsing and interpretation. Walks the AST
//! once, tracking lexical scopes exactly the way the interpreter's
//! `Environment` chain will at runtime, and records how many environment
//! hops separate each variable reference from its declaration. That side
//! table lets the interpreter look a name up in O(1) instead of walking
//! the chain to the global scope on every access.

use std::collections::HashMap;

use log::trace;

use crate::errors::ResolveError;
use crate::parser::ast::{Expr, ExprLiteral, NodeId, Stmt};
use crate::scanner::Token;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FunctionType {
    None,
    Function,
    Initializer,
    Method,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClassType {
    None,
    Class,
    Subclass,
}

pub struct Resolver {
    scopes: Vec<HashMap<String, bool>>,
    locals: HashMap<NodeId, usize>,
    errors: Vec<ResolveError>,
    current_function: FunctionType,
    current_class: ClassType,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Resolver {
    pub fn new() -> Self {
        Self {
            scopes: vec![],
            locals: HashMap::new(),
            errors: vec![],
            current_function: FunctionType::None,
            current_class: ClassType::None,
        }
    }

    pub fn errors(&self) -> &[ResolveError] {
        &self.errors
    }

    /// Consumes the resolver, handing over the `NodeId -> scope distance`
    /// side table the interpreter needs.
    pub fn into_locals(self) -> HashMap<NodeId, usize> {
        self.locals
    }

    pub fn resolve(&mut self, statements: &[Stmt]) {
        for stmt in statements {
            self.resolve_stmt(stmt);
        }
    }

    fn resolve_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Block(statements) => {
                self.begin_scope();
                self.resolve(statements);
                self.end_scope();
            }
            Stmt::Class(name, superclass, methods) => self.resolve_class(name, superclass, methods),
            Stmt::Expression(expr) => self.resolve_expr(expr),
            Stmt::Fun(name, params, body) => {
                self.declare(name);
                self.define(name);
                self.resolve_function(params, body, FunctionType::Function);
            }
            Stmt::If(condition, then_branch, else_branch) => {
                self.resolve_expr(condition);
                self.resolve_stmt(then_branch);
                if let Some(else_branch) = else_branch {
                    self.resolve_stmt(else_branch);
                }
            }
            Stmt::Print(expr) => self.resolve_expr(expr),
            Stmt::Return(keyword, value) => {
                if self.current_function == FunctionType::None {
                    self.errors.push(ResolveError::new(
                        keyword.clone(),
                        "Can't return from top-level code.",
                    ));
                }
                if let Some(value) = value {
                    if self.current_function == FunctionType::Initializer {
                        self.errors.push(ResolveError::new(
                            keyword.clone(),
                            "Can't return a value from an initializer.",
                        ));
                    }
                    self.resolve_expr(value);
                }
            }
            Stmt::Var(name, initializer) => {
                self.declare(name);
                if let Some(initializer) = initializer {
                    self.resolve_expr(initializer);
                }
                self.define(name);
            }
            Stmt::While(condition, body) => {
                self.resolve_expr(condition);
                self.resolve_stmt(body);
            }
        }
    }

    fn resolve_class(&mut self, name: &Token, superclass: &Option<Box<Expr>>, methods: &[Stmt]) {
        let enclosing_class = self.current_class;
        self.current_class = ClassType::Class;

        self.declare(name);
        self.define(name);

        if let Some(superclass) = superclass {
            if let Expr::Variable(_, super_name) = superclass.as_ref() {
                if super_name.lexeme() == name.lexeme() {
                    self.errors.push(ResolveError::new(
                        super_name.clone(),
                        "A class can't inherit from itself.",
                    ));
                }
            }
            self.current_class = ClassType::Subclass;
            self.resolve_expr(superclass);

            self.begin_scope();
            self.scopes.last_mut().unwrap().insert("super".to_string(), true);
        }

        self.begin_scope();
        self.scopes.last_mut().unwrap().insert("this".to_string(), true);

        for method in methods {
            if let Stmt::Fun(method_name, params, body) = method {
                let declaration = if method_name.lexeme() == "init" {
                    FunctionType::Initializer
                } else {
                    FunctionType::Method
                };
                self.resolve_function(params, body, declaration);
            }
        }

        self.end_scope();

        if superclass.is_some() {
            self.end_scope();
        }

        self.current_class = enclosing_class;
    }

    fn resolve_function(&mut self, params: &[Token], body: &[Stmt], kind: FunctionType) {
        let enclosing_function = self.current_function;
        self.current_function = kind;

        self.begin_scope();
        for param in params {
            self.declare(param);
            self.define(param);
        }
        self.resolve(body);
        self.end_scope();

        self.current_function = enclosing_function;
    }

    fn resolve_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Assign(id, name, value) => {
                self.resolve_expr(value);
                self.resolve_local(*id, name);
            }
            Expr::Binary(_, left, _, right) | Expr::Logical(_, left, _, right) => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }
            Expr::Call(_, callee, _, arguments) => {
                self.resolve_expr(callee);
                for arg in arguments {
                    self.resolve_expr(arg);
                }
            }
            Expr::Get(_, object, _) => self.resolve_expr(object),
            Expr::Grouping(_, inner) => self.resolve_expr(inner),
            Expr::Literal(_, lit) => match lit {
                ExprLiteral::Bool(_) | ExprLiteral::Number(_) | ExprLiteral::String(_) | ExprLiteral::Nil => {}
            },
            Expr::Set(_, object, _, value) => {
                self.resolve_expr(value);
                self.resolve_expr(object);
            }
            Expr::Super(id, keyword, _) => {
                match self.current_class {
                    ClassType::None => self.errors.push(ResolveError::new(
                        keyword.clone(),
                        "Can't use 'super' outside of a class.",
                    )),
                    ClassType::Class => self.errors.push(ResolveError::new(
                        keyword.clone(),
                        "Can't use 'super' in a class with no superclass.",
                    )),
                    ClassType::Subclass => {}
                }
                self.resolve_local(*id, keyword);
            }
            Expr::This(id, keyword) => {
                if self.current_class == ClassType::None {
                    self.errors
                        .push(ResolveError::new(keyword.clone(), "Can't use 'this' outside of a class."));
                }
                self.resolve_local(*id, keyword);
            }
            Expr::Unary(_, _, right) => self.resolve_expr(right),
            Expr::Variable(id, name) => {
                if let Some(scope) = self.scopes.last() {
                    if scope.get(name.lexeme()) == Some(&false) {
                        self.errors.push(ResolveError::new(
                            name.clone(),
                            "Can't read local variable in its own initializer.",
                        ));
                    }
                }
                self.resolve_local(*id, name);
            }
        }
    }

    fn resolve_local(&mut self, id: NodeId, name: &Token) {
        for (distance, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains_key(name.lexeme()) {
                trace!("resolved {} at distance {distance}", name.lexeme());
                self.locals.insert(id, distance);
                return;
            }
        }
        // Not found in any scope: treated as global, left out of `locals`.
    }

    fn declare(&mut self, name: &Token) {
        let Some(scope) = self.scopes.last_mut() else {
            return;
        };

        if scope.contains_key(name.lexeme()) {
            self.errors.push(ResolveError::new(
                name.clone(),
                "Already a variable with this name in this scope.",
            ));
        }

        scope.insert(name.lexeme().to_string(), false);
    }

    fn define(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.lexeme().to_string(), true);
        }
    }

    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn end_scope(&mut self) {
        self.scopes.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;
    use crate::scanner::Scanner;

    fn resolve(source: &str) -> Resolver {
        let mut scanner = Scanner::new();
        let tokens = scanner.scan_tokens(source).to_vec();
        let mut parser = Parser::new(tokens);
        let stmts = parser.parse();
        assert!(parser.errors().is_empty());

        let mut resolver = Resolver::new();
        resolver.resolve(&stmts);
        resolver
    }

    #[test]
    fn closure_variable_resolves_to_enclosing_scope() {
        let resolver = resolve("fun outer() { var a = 1; fun inner() { return a; } return inner; }");
        assert!(resolver.errors().is_empty());
    }

    #[test]
    fn self_reference_in_initializer_is_an_error() {
        let resolver = resolve("var a = 1; { var a = a; }");
        assert_eq!(resolver.errors().len(), 1);
        assert!(resolver.errors()[0].message.contains("own initializer"));
    }

    #[test]
    fn duplicate_local_declaration_is_an_error() {
        let resolver = resolve("{ var a = 1; var a = 2; }");
        assert_eq!(resolver.errors().len(), 1);
        assert!(resolver.errors()[0].message.contains("Already a variable"));
    }

    #[test]
    fn return_at_top_level_is_an_error() {
        let resolver = resolve("return 1;");
        assert_eq!(resolver.errors().len(), 1);
        assert!(resolver.errors()[0].message.contains("top-level"));
    }

    #[test]
    fn return_value_from_initializer_is_an_error() {
        let resolver = resolve("class Foo { init() { return 1; } }");
        assert_eq!(resolver.errors().len(), 1);
        assert!(resolver.errors()[0].message.contains("initializer"));
    }

    #[test]
    fn class_inheriting_from_itself_is_an_error() {
        let resolver = resolve("class Foo < Foo {}");
        assert_eq!(resolver.errors().len(), 1);
        assert!(resolver.errors()[0].message.contains("inherit from itself"));
    }

    #[test]
    fn this_outside_class_is_an_error() {
        let resolver = resolve("fun f() { return this; }");
        assert_eq!(resolver.errors().len(), 1);
        assert!(resolver.errors()[0].message.contains("'this' outside"));
    }

    #[test]
    fn super_without_superclass_is_an_error() {
        let resolver = resolve("class Foo { bar() { return super.bar(); } }");
        assert_eq!(resolver.errors().len(), 1);
        assert!(resolver.errors()[0].message.contains("no superclass"));
    }

    #[test]
    fn resolving_the_same_ast_twice_produces_an_equal_locals_map() {
        let source = "var a = 1; fun f() { return a; }";

        let mut scanner = Scanner::new();
        let tokens = scanner.scan_tokens(source).to_vec();
        let mut parser = Parser::new(tokens);
        let stmts = parser.parse();

        let mut first = Resolver::new();
        first.resolve(&stmts);
        let first_locals = first.into_locals();

        let mut second = Resolver::new();
        second.resolve(&stmts);
        let second_locals = second.into_locals();

        assert_eq!(first_locals, second_locals);
    }
}
