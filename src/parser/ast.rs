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

use crate::scanner::Token;

/// Identifies one `Expr` node for the resolver's/interpreter's side table.
/// Assigned by a monotonic counter owned by the `Parser` as each `Expr` is
/// built, since the AST here is an owned tree rather than an object graph
/// with stable addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Block(Vec<Stmt>),
    Class(
        Token,               // class name
        Option<Box<Expr>>,   // superclass, always an Expr::Variable if present
        Vec<Stmt>,           // methods, always Stmt::Fun
    ),
    Expression(Expr),
    Fun(
        Token,      // fun name
        Vec<Token>, // fun params
        Vec<Stmt>,  // fun body
    ),
    If(
        Expr,              // condition
        Box<Stmt>,         // statement
        Option<Box<Stmt>>, // optional else statement
    ),
    Print(Expr),
    Return(Token, Option<Expr>),
    Var(Token, Option<Expr>),
    While(Expr, Box<Stmt>),
}

#[derive(Debug, Clone)]
pub enum Expr {
    Assign(NodeId, Token, Box<Expr>),
    Binary(NodeId, Box<Expr>, Token, Box<Expr>),
    Call(NodeId, Box<Expr>, Token, Vec<Expr>),
    Get(NodeId, Box<Expr>, Token),
    Grouping(NodeId, Box<Expr>),
    Literal(NodeId, ExprLiteral),
    Logical(NodeId, Box<Expr>, Token, Box<Expr>),
    Set(NodeId, Box<Expr>, Token, Box<Expr>),
    Super(NodeId, Token, Token), // keyword, method name
    This(NodeId, Token),
    Unary(NodeId, Token, Box<Expr>),
    Variable(NodeId, Token),
}

impl Expr {
    pub fn id(&self) -> NodeId {
        match self {
            Expr::Assign(id, ..)
            | Expr::Binary(id, ..)
            | Expr::Call(id, ..)
            | Expr::Get(id, ..)
            | Expr::Grouping(id, ..)
            | Expr::Literal(id, ..)
            | Expr::Logical(id, ..)
            | Expr::Set(id, ..)
            | Expr::Super(id, ..)
            | Expr::This(id, ..)
            | Expr::Unary(id, ..)
            | Expr::Variable(id, ..) => *id,
        }
    }
}

#[derive(Debug, Clone)]
pub enum ExprLiteral {
    Bool(bool),
    Number(f64),
    String(String),
    Nil,
}
