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

//! A Lisp-style printer for expressions, used only by tests to check that
//! the parser builds the tree its grammar's precedence implies (e.g.
//! `1 + 2 * 3` prints as `(+ 1 (* 2 3))`).

use super::ast::{Expr, ExprLiteral};

pub fn print(expr: &Expr) -> String {
    match expr {
        Expr::Binary(_, left, op, right) => parenthesize(op.lexeme(), &[left, right]),
        Expr::Grouping(_, expr) => parenthesize("group", &[expr]),
        Expr::Literal(_, lit) => literal(lit),
        Expr::Unary(_, op, right) => parenthesize(op.lexeme(), &[right]),
        Expr::Logical(_, left, op, right) => parenthesize(op.lexeme(), &[left, right]),
        Expr::Variable(_, name) => name.lexeme().to_string(),
        Expr::Assign(_, name, value) => parenthesize(&format!("= {}", name.lexeme()), &[value]),
        Expr::Call(_, callee, _, args) => {
            let mut parts = vec![callee.as_ref()];
            parts.extend(args.iter());
            parenthesize("call", &parts)
        }
        Expr::Get(_, object, name) => parenthesize(&format!(". {}", name.lexeme()), &[object]),
        Expr::Set(_, object, name, value) => {
            parenthesize(&format!("set {}", name.lexeme()), &[object, value])
        }
        Expr::This(..) => "this".to_string(),
        Expr::Super(_, _, method) => format!("(super {})", method.lexeme()),
    }
}

fn literal(lit: &ExprLiteral) -> String {
    match lit {
        ExprLiteral::Nil => "nil".to_string(),
        ExprLiteral::Bool(b) => b.to_string(),
        ExprLiteral::Number(n) => n.to_string(),
        ExprLiteral::String(s) => s.clone(),
    }
}

fn parenthesize(name: &str, exprs: &[&Expr]) -> String {
    let mut out = String::from("(");
    out.push_str(name);
    for expr in exprs {
        out.push(' ');
        out.push_str(&print(expr));
    }
    out.push(')');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;
    use crate::scanner::Scanner;

    fn parse_expr(source: &str) -> Expr {
        let mut scanner = Scanner::new();
        let tokens = scanner.scan_tokens(source).to_vec();
        let mut parser = Parser::new(tokens);
        parser.expression().unwrap()
    }

    #[test]
    fn precedence_round_trips_through_printer() {
        let expr = parse_expr("1 + 2 * 3");
        assert_eq!(print(&expr), "(+ 1 (* 2 3))");
    }

    #[test]
    fn grouping_prints_explicitly() {
        let expr = parse_expr("(1 + 2) * 3");
        assert_eq!(print(&expr), "(* (group (+ 1 2)) 3)");
    }
}
