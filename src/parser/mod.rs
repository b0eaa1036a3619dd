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

pub mod ast;
pub mod printer;

use log::trace;

use crate::errors::ParseError;
use crate::scanner::{Token, TokenLiteral, TokenType};
use ast::{Expr, ExprLiteral, NodeId, Stmt};

const MAX_ARGS: usize = 255;

type Result<T> = std::result::Result<T, ParseError>;

pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    next_id: u32,
    errors: Vec<ParseError>,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            current: 0,
            next_id: 0,
            errors: vec![],
        }
    }

    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    fn fresh_id(&mut self) -> NodeId {
        let id = NodeId::new(self.next_id);
        self.next_id += 1;
        id
    }

    /// Parses the whole token stream into a list of statements, recovering
    /// from a syntax error by synchronizing to the next statement boundary
    /// rather than aborting. Failed statements are dropped from the result;
    /// their errors are available via `errors()`.
    pub fn parse(&mut self) -> Vec<Stmt> {
        let mut statements = Vec::new();
        while !self.is_at_end() {
            match self.declaration() {
                Ok(stmt) => statements.push(stmt),
                Err(e) => {
                    self.errors.push(e);
                    self.synchronize();
                }
            }
        }
        statements
    }

    fn declaration(&mut self) -> Result<Stmt> {
        if self.is_any_tokens(&[TokenType::Class]) {
            self.class_declaration()
        } else if self.is_any_tokens(&[TokenType::Fun]) {
            self.function("function")
        } else if self.is_any_tokens(&[TokenType::Var]) {
            self.var_declaration()
        } else {
            self.statement()
        }
    }

    fn class_declaration(&mut self) -> Result<Stmt> {
        let name = self.consume(TokenType::Identifier, "Expect class name.")?.clone();

        let superclass = if self.is_any_tokens(&[TokenType::Less]) {
            let super_name = self
                .consume(TokenType::Identifier, "Expect superclass name.")?
                .clone();
            Some(Box::new(Expr::Variable(self.fresh_id(), super_name)))
        } else {
            None
        };

        self.consume(TokenType::LeftBrace, "Expect '{' before class body.")?;

        let mut methods = vec![];
        while !self.check(TokenType::RightBrace) && !self.is_at_end() {
            methods.push(self.function("method")?);
        }

        self.consume(TokenType::RightBrace, "Expect '}' after class body.")?;

        Ok(Stmt::Class(name, superclass, methods))
    }

    fn var_declaration(&mut self) -> Result<Stmt> {
        let name = self.consume(TokenType::Identifier, "Expect variable name.")?.clone();

        let initializer = if self.is_any_tokens(&[TokenType::Equal]) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(TokenType::Semicolon, "Expect ';' after variable declaration.")?;

        Ok(Stmt::Var(name, initializer))
    }

    fn function(&mut self, kind: &str) -> Result<Stmt> {
        let name = self
            .consume(TokenType::Identifier, &format!("Expect {kind} name."))?
            .clone();

        self.consume(TokenType::LeftParen, &format!("Expect '(' after {kind} name."))?;

        let mut params = vec![];
        if !self.check(TokenType::RightParen) {
            loop {
                if params.len() >= MAX_ARGS {
                    self.errors.push(ParseError::new(
                        self.peek().clone(),
                        "Can't have more than 255 parameters.",
                    ));
                }

                params.push(
                    self.consume(TokenType::Identifier, "Expect parameter name.")?
                        .clone(),
                );

                if !self.is_any_tokens(&[TokenType::Comma]) {
                    break;
                }
            }
        }

        self.consume(TokenType::RightParen, &format!("Expect ')' after {kind} parameters."))?;
        self.consume(TokenType::LeftBrace, &format!("Expect '{{' before {kind} body."))?;

        let body = self.block_stmt()?;

        Ok(Stmt::Fun(name, params, body))
    }

    fn statement(&mut self) -> Result<Stmt> {
        if self.is_any_tokens(&[TokenType::If]) {
            self.if_stmt()
        } else if self.is_any_tokens(&[TokenType::LeftBrace]) {
            Ok(Stmt::Block(self.block_stmt()?))
        } else if self.is_any_tokens(&[TokenType::While]) {
            self.while_stmt()
        } else if self.is_any_tokens(&[TokenType::For]) {
            self.for_stmt()
        } else if self.is_any_tokens(&[TokenType::Print]) {
            self.print_stmt()
        } else if self.is_any_tokens(&[TokenType::Return]) {
            self.return_stmt()
        } else {
            self.expression_stmt()
        }
    }

    fn block_stmt(&mut self) -> Result<Vec<Stmt>> {
        let mut stmts = vec![];

        while !self.check(TokenType::RightBrace) && !self.is_at_end() {
            stmts.push(self.declaration()?);
        }

        self.consume(TokenType::RightBrace, "Expect '}' after block.")?;
        Ok(stmts)
    }

    fn if_stmt(&mut self) -> Result<Stmt> {
        self.consume(TokenType::LeftParen, "Expect '(' after if.")?;
        let condition = self.expression()?;
        self.consume(TokenType::RightParen, "Expect ')' after if condition.")?;

        let then_branch = self.statement()?;
        let else_branch = if self.is_any_tokens(&[TokenType::Else]) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };

        Ok(Stmt::If(condition, Box::new(then_branch), else_branch))
    }

    fn while_stmt(&mut self) -> Result<Stmt> {
        self.consume(TokenType::LeftParen, "Expect '(' after while.")?;
        let condition = self.expression()?;
        self.consume(TokenType::RightParen, "Expect ')' after while condition.")?;
        let body = self.statement()?;

        Ok(Stmt::While(condition, Box::new(body)))
    }

    // For loops are de-sugared into a while loop with an optional initializer.
    fn for_stmt(&mut self) -> Result<Stmt> {
        self.consume(TokenType::LeftParen, "Expect '(' after for.")?;

        let initializer = if self.is_any_tokens(&[TokenType::Semicolon]) {
            None
        } else if self.is_any_tokens(&[TokenType::Var]) {
            Some(self.var_declaration()?)
        } else {
            Some(self.expression_stmt()?)
        };

        let condition = if self.check(TokenType::Semicolon) {
            None
        } else {
            Some(self.expression()?)
        };
        self.consume(TokenType::Semicolon, "Expect ';' after loop condition.")?;

        let increment = if self.check(TokenType::RightParen) {
            None
        } else {
            Some(self.expression()?)
        };
        self.consume(TokenType::RightParen, "Expect ')' after for clauses.")?;

        let mut body = self.statement()?;

        if let Some(expr) = increment {
            body = Stmt::Block(vec![body, Stmt::Expression(expr)]);
        }

        body = match condition {
            None => Stmt::While(Expr::Literal(self.fresh_id(), ExprLiteral::Bool(true)), Box::new(body)),
            Some(expr) => Stmt::While(expr, Box::new(body)),
        };

        if let Some(init) = initializer {
            body = Stmt::Block(vec![init, body]);
        }

        Ok(body)
    }

    fn print_stmt(&mut self) -> Result<Stmt> {
        let value = self.expression()?;
        self.consume(TokenType::Semicolon, "Expect ';' after value.")?;
        Ok(Stmt::Print(value))
    }

    fn return_stmt(&mut self) -> Result<Stmt> {
        let keyword = self.previous().clone();
        let value = if !self.check(TokenType::Semicolon) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(TokenType::Semicolon, "Expect ';' after return value.")?;
        Ok(Stmt::Return(keyword, value))
    }

    fn expression_stmt(&mut self) -> Result<Stmt> {
        let expr = self.expression()?;
        self.consume(TokenType::Semicolon, "Expect ';' after expression.")?;
        Ok(Stmt::Expression(expr))
    }

    // Expression functions, in ascending precedence:
    // assignment > or > and > equality > comparison > term > factor > unary > call > primary

    pub fn expression(&mut self) -> Result<Expr> {
        self.assignment()
    }

    fn assignment(&mut self) -> Result<Expr> {
        let expr = self.or()?;

        if self.is_any_tokens(&[TokenType::Equal]) {
            let equals = self.previous().clone();
            let value = self.assignment()?;

            return match expr {
                Expr::Variable(_, name) => Ok(Expr::Assign(self.fresh_id(), name, Box::new(value))),
                Expr::Get(_, object, name) => Ok(Expr::Set(self.fresh_id(), object, name, Box::new(value))),
                _ => {
                    self.errors.push(ParseError::new(equals, "Invalid assignment target."));
                    Ok(expr)
                }
            };
        }

        Ok(expr)
    }

    fn or(&mut self) -> Result<Expr> {
        let mut expr = self.and()?;

        while self.is_any_tokens(&[TokenType::Or]) {
            let operator = self.previous().clone();
            let right = self.and()?;
            expr = Expr::Logical(self.fresh_id(), Box::new(expr), operator, Box::new(right));
        }

        Ok(expr)
    }

    fn and(&mut self) -> Result<Expr> {
        let mut expr = self.equality()?;

        while self.is_any_tokens(&[TokenType::And]) {
            let operator = self.previous().clone();
            let right = self.equality()?;
            expr = Expr::Logical(self.fresh_id(), Box::new(expr), operator, Box::new(right));
        }

        Ok(expr)
    }

    fn equality(&mut self) -> Result<Expr> {
        let mut expr = self.comparison()?;

        while self.is_any_tokens(&[TokenType::EqualEqual, TokenType::BangEqual]) {
            let operator = self.previous().clone();
            let rhs = self.comparison()?;
            expr = Expr::Binary(self.fresh_id(), Box::new(expr), operator, Box::new(rhs));
        }

        Ok(expr)
    }

    fn comparison(&mut self) -> Result<Expr> {
        let mut expr = self.term()?;

        while self.is_any_tokens(&[
            TokenType::Greater,
            TokenType::GreaterEqual,
            TokenType::Less,
            TokenType::LessEqual,
        ]) {
            let operator = self.previous().clone();
            let rhs = self.term()?;
            expr = Expr::Binary(self.fresh_id(), Box::new(expr), operator, Box::new(rhs));
        }

        Ok(expr)
    }

    fn term(&mut self) -> Result<Expr> {
        let mut expr = self.factor()?;

        while self.is_any_tokens(&[TokenType::Plus, TokenType::Minus]) {
            let operator = self.previous().clone();
            let rhs = self.factor()?;
            expr = Expr::Binary(self.fresh_id(), Box::new(expr), operator, Box::new(rhs));
        }

        Ok(expr)
    }

    fn factor(&mut self) -> Result<Expr> {
        let mut expr = self.unary()?;

        while self.is_any_tokens(&[TokenType::Star, TokenType::Slash]) {
            let operator = self.previous().clone();
            let rhs = self.unary()?;
            expr = Expr::Binary(self.fresh_id(), Box::new(expr), operator, Box::new(rhs));
        }

        Ok(expr)
    }

    fn unary(&mut self) -> Result<Expr> {
        if self.is_any_tokens(&[TokenType::Minus, TokenType::Bang]) {
            let operator = self.previous().clone();
            let rhs = self.unary()?;
            return Ok(Expr::Unary(self.fresh_id(), operator, Box::new(rhs)));
        }

        self.call()
    }

    fn call(&mut self) -> Result<Expr> {
        let mut expr = self.primary()?;

        loop {
            if self.is_any_tokens(&[TokenType::LeftParen]) {
                expr = self.finish_call(expr)?;
            } else if self.is_any_tokens(&[TokenType::Dot]) {
                let name = self
                    .consume(TokenType::Identifier, "Expect property name after '.'.")?
                    .clone();
                expr = Expr::Get(self.fresh_id(), Box::new(expr), name);
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> Result<Expr> {
        let mut arguments = vec![];

        if !self.check(TokenType::RightParen) {
            loop {
                if arguments.len() >= MAX_ARGS {
                    self.errors
                        .push(ParseError::new(self.peek().clone(), "Can't have more than 255 arguments."));
                }
                arguments.push(self.expression()?);

                if !self.is_any_tokens(&[TokenType::Comma]) {
                    break;
                }
            }
        }

        let paren = self.consume(TokenType::RightParen, "Expect ')' after arguments.")?;
        Ok(Expr::Call(self.fresh_id(), Box::new(callee), paren.clone(), arguments))
    }

    fn primary(&mut self) -> Result<Expr> {
        if self.is_any_tokens(&[TokenType::False]) {
            return Ok(Expr::Literal(self.fresh_id(), ExprLiteral::Bool(false)));
        }
        if self.is_any_tokens(&[TokenType::True]) {
            return Ok(Expr::Literal(self.fresh_id(), ExprLiteral::Bool(true)));
        }
        if self.is_any_tokens(&[TokenType::Nil]) {
            return Ok(Expr::Literal(self.fresh_id(), ExprLiteral::Nil));
        }

        if self.is_any_tokens(&[TokenType::Number, TokenType::String]) {
            return match self.previous().token_literal() {
                TokenLiteral::Number(value) => Ok(Expr::Literal(self.fresh_id(), ExprLiteral::Number(*value))),
                TokenLiteral::Str(value) => Ok(Expr::Literal(self.fresh_id(), ExprLiteral::String(value.clone()))),
                TokenLiteral::None => unreachable!("scanner always attaches a literal to Number/String tokens"),
            };
        }

        if self.is_any_tokens(&[TokenType::Super]) {
            let keyword = self.previous().clone();
            self.consume(TokenType::Dot, "Expect '.' after 'super'.")?;
            let method = self
                .consume(TokenType::Identifier, "Expect superclass method name.")?
                .clone();
            return Ok(Expr::Super(self.fresh_id(), keyword, method));
        }

        if self.is_any_tokens(&[TokenType::This]) {
            return Ok(Expr::This(self.fresh_id(), self.previous().clone()));
        }

        if self.is_any_tokens(&[TokenType::Identifier]) {
            return Ok(Expr::Variable(self.fresh_id(), self.previous().clone()));
        }

        if self.is_any_tokens(&[TokenType::LeftParen]) {
            let expr = self.expression()?;
            self.consume(TokenType::RightParen, "Expect ')' after expression.")?;
            return Ok(Expr::Grouping(self.fresh_id(), Box::new(expr)));
        }

        Err(ParseError::new(self.peek().clone(), "Expect expression."))
    }

    // Helper functions

    fn is_any_tokens(&mut self, tokens: &[TokenType]) -> bool {
        for token in tokens {
            if self.check(*token) {
                self.advance();
                return true;
            }
        }
        false
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        let token = self.previous();
        trace!("consumed {:?} {:?} at line {}", token.token_type(), token.lexeme(), token.line());
        token
    }

    fn consume(&mut self, token_type: TokenType, msg: &str) -> Result<&Token> {
        if self.check(token_type) {
            return Ok(self.advance());
        }

        Err(ParseError::new(self.peek().clone(), msg.to_string()))
    }

    fn is_at_end(&self) -> bool {
        self.check(TokenType::Eof)
    }

    fn check(&self, token_type: TokenType) -> bool {
        self.peek().token_type() == token_type
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.current).unwrap()
    }

    fn previous(&self) -> &Token {
        self.tokens.get(self.current - 1).unwrap()
    }

    // Skips past a syntactically invalid statement and finds the beginning
    // of the next one.
    fn synchronize(&mut self) {
        self.advance();
        while !self.is_at_end() {
            if self.previous().token_type() == TokenType::Semicolon {
                return;
            }
            match self.peek().token_type() {
                TokenType::Class
                | TokenType::Fun
                | TokenType::Var
                | TokenType::For
                | TokenType::If
                | TokenType::While
                | TokenType::Print
                | TokenType::Return => return,
                _ => {}
            }
            self.advance();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::{Scanner, TokenType};

    fn get_parser(source: &str) -> Parser {
        let mut scanner = Scanner::new();
        let tokens = scanner.scan_tokens(source).to_vec();
        assert!(scanner.errors().is_empty());
        Parser::new(tokens)
    }

    #[test]
    fn basic_seeking() {
        let mut p = get_parser("10 == 20;");

        assert!(p.check(TokenType::Number));

        assert_eq!(p.advance().token_type(), TokenType::Number);
        assert_eq!(p.advance().token_type(), TokenType::EqualEqual);
        assert_eq!(p.advance().token_type(), TokenType::Number);
        assert_eq!(p.advance().token_type(), TokenType::Semicolon);

        assert_eq!(p.peek().token_type(), TokenType::Eof);
    }

    #[test]
    fn seek_past_end() {
        let mut p = get_parser("var abc = 45; if (abc >= 20) { return false; }");
        while !p.is_at_end() {
            p.advance();
        }

        p.advance();
        assert_eq!(p.peek().token_type(), TokenType::Eof);
        p.advance();
        assert_eq!(p.peek().token_type(), TokenType::Eof);
    }

    #[test]
    fn basic_matching_not_equal() {
        let mut p = get_parser("10 == 20;");
        assert!(!p.is_any_tokens(&[TokenType::And, TokenType::Equal, TokenType::BangEqual]));
    }

    #[test]
    fn basic_matching_equal() {
        let mut p = get_parser("10 == 20;");
        assert!(p.check(TokenType::Number));
        p.advance();
        assert!(p.is_any_tokens(&[TokenType::EqualEqual, TokenType::BangEqual]));
    }

    #[test]
    fn parses_class_with_superclass_and_methods() {
        let mut p = get_parser("class Foo < Bar { init(a) { this.a = a; } }");
        let stmts = p.parse();
        assert!(p.errors().is_empty());
        assert_eq!(stmts.len(), 1);
        match &stmts[0] {
            Stmt::Class(name, superclass, methods) => {
                assert_eq!(name.lexeme(), "Foo");
                assert!(superclass.is_some());
                assert_eq!(methods.len(), 1);
            }
            _ => panic!("expected a class statement"),
        }
    }

    #[test]
    fn for_loop_desugars_to_while_in_a_block() {
        let mut p = get_parser("for (var i = 0; i < 3; i = i + 1) print i;");
        let stmts = p.parse();
        assert!(p.errors().is_empty());
        assert_eq!(stmts.len(), 1);
        assert!(matches!(stmts[0], Stmt::Block(_)));
    }

    #[test]
    fn invalid_assignment_target_is_recorded_but_parsing_continues() {
        let mut p = get_parser("a + b = 3; print 1;");
        let stmts = p.parse();
        assert_eq!(p.errors().len(), 1);
        assert_eq!(stmts.len(), 2);
    }

    #[test]
    fn syntax_error_synchronizes_to_next_statement() {
        let mut p = get_parser("var = 1; var ok = 2;");
        let stmts = p.parse();
        assert_eq!(p.errors().len(), 1);
        assert_eq!(stmts.len(), 1);
    }
}
