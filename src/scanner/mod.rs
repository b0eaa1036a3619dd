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

mod input;
mod tokens;

use std::collections::HashMap;
use std::fmt::{self, Debug, Write};
use std::str::FromStr;

use log::trace;

use self::input::{Input, InputIter, PeekableIterator};
use crate::errors::ScanError;

pub use tokens::{Token, TokenLiteral, TokenType};

/// Turns source text into a flat token stream, accumulating every lexical
/// error it encounters instead of stopping at the first one.
pub struct Scanner {
    tokens: Vec<Token>,
    errors: Vec<ScanError>,
    keywords: HashMap<String, TokenType>,
}

impl Debug for Scanner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug_out: String = String::new();
        debug_out.write_str("Scanner: \n").unwrap();

        for sc in &self.tokens {
            debug_out.write_fmt(format_args!("\t{sc}\n")).unwrap();
        }

        write!(f, "{debug_out}")
    }
}

impl Default for Scanner {
    fn default() -> Self {
        Self::new()
    }
}

impl Scanner {
    pub fn new() -> Scanner {
        let mut keywords = HashMap::new();
        keywords.insert("and".into(), TokenType::And);
        keywords.insert("class".into(), TokenType::Class);
        keywords.insert("else".into(), TokenType::Else);
        keywords.insert("false".into(), TokenType::False);
        keywords.insert("fun".into(), TokenType::Fun);
        keywords.insert("for".into(), TokenType::For);
        keywords.insert("if".into(), TokenType::If);
        keywords.insert("nil".into(), TokenType::Nil);
        keywords.insert("or".into(), TokenType::Or);
        keywords.insert("print".into(), TokenType::Print);
        keywords.insert("return".into(), TokenType::Return);
        keywords.insert("super".into(), TokenType::Super);
        keywords.insert("this".into(), TokenType::This);
        keywords.insert("true".into(), TokenType::True);
        keywords.insert("var".into(), TokenType::Var);
        keywords.insert("while".into(), TokenType::While);

        Self {
            tokens: vec![],
            errors: vec![],
            keywords,
        }
    }

    pub fn errors(&self) -> &[ScanError] {
        &self.errors
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn scan_tokens(&mut self, source: &str) -> &[Token] {
        let mut input_iter = Input::new(source).into_iter();

        while let Some(item) = input_iter.next() {
            let mut lexeme = String::from_str(item).expect("grapheme into string");
            let start_line = input_iter.line();

            let token = match item {
                // Single character tokens
                "(" => Some(TokenType::LeftParen),
                ")" => Some(TokenType::RightParen),
                "{" => Some(TokenType::LeftBrace),
                "}" => Some(TokenType::RightBrace),
                "," => Some(TokenType::Comma),
                "." => Some(TokenType::Dot),
                "-" => Some(TokenType::Minus),
                "+" => Some(TokenType::Plus),
                ";" => Some(TokenType::Semicolon),
                "/" => {
                    if match_next_char((&mut input_iter, &mut lexeme), "/") {
                        scan_forward_until((&mut input_iter, &mut lexeme), "\n");
                        None
                    } else {
                        Some(TokenType::Slash)
                    }
                }
                "*" => Some(TokenType::Star),

                // One or two character tokens
                "!" => {
                    if match_next_char((&mut input_iter, &mut lexeme), "=") {
                        Some(TokenType::BangEqual)
                    } else {
                        Some(TokenType::Bang)
                    }
                }
                "=" => {
                    if match_next_char((&mut input_iter, &mut lexeme), "=") {
                        Some(TokenType::EqualEqual)
                    } else {
                        Some(TokenType::Equal)
                    }
                }
                ">" => {
                    if match_next_char((&mut input_iter, &mut lexeme), "=") {
                        Some(TokenType::GreaterEqual)
                    } else {
                        Some(TokenType::Greater)
                    }
                }
                "<" => {
                    if match_next_char((&mut input_iter, &mut lexeme), "=") {
                        Some(TokenType::LessEqual)
                    } else {
                        Some(TokenType::Less)
                    }
                }

                // Whitespace
                " " | "\n" | "\t" | "\r" => None,

                // Literals
                // Identifiers and reserved keywords
                ch if is_lowercase(ch) || is_uppercase(ch) || ch == "_" => {
                    loop {
                        if is_alpha_numeric(input_iter.peek()) {
                            match input_iter.next() {
                                Some(x) => lexeme.push_str(x),
                                None => break,
                            }
                        } else {
                            break;
                        }
                    }

                    match self.keywords.get(&lexeme) {
                        Some(token) => Some(*token),
                        None => Some(TokenType::Identifier),
                    }
                }
                // Strings
                "\"" => match string((&mut input_iter, &mut lexeme), start_line) {
                    Ok(()) => Some(TokenType::String),
                    Err(e) => {
                        self.errors.push(e);
                        None
                    }
                },
                // Numbers
                ch if is_digit(ch) => {
                    number((&mut input_iter, &mut lexeme));
                    Some(TokenType::Number)
                }
                x => {
                    self.errors
                        .push(ScanError::new(start_line, format!("Unexpected character '{x}'.")));
                    None
                }
            };

            if let Some(token_type) = token {
                trace!("scanned {token_type:?} {lexeme:?} at line {start_line}");
                self.tokens.push(Token::new(token_type, lexeme, start_line));
            }
        }

        // Add an EOF token at end of input
        let eof_line = input_iter.line();
        self.tokens.push(Token::new(TokenType::Eof, String::new(), eof_line));

        &self.tokens
    }
}

fn is_digit(ch: &str) -> bool {
    matches!(
        ch,
        "0" | "1" | "2" | "3" | "4" | "5" | "6" | "7" | "8" | "9"
    )
}

fn is_lowercase(ch: &str) -> bool {
    matches!(
        ch,
        "a" | "b"
            | "c"
            | "d"
            | "e"
            | "f"
            | "g"
            | "h"
            | "i"
            | "j"
            | "k"
            | "l"
            | "m"
            | "n"
            | "o"
            | "p"
            | "q"
            | "r"
            | "s"
            | "t"
            | "u"
            | "v"
            | "w"
            | "x"
            | "y"
            | "z"
    )
}

fn is_uppercase(ch: &str) -> bool {
    matches!(
        ch,
        "A" | "B"
            | "C"
            | "D"
            | "E"
            | "F"
            | "G"
            | "H"
            | "I"
            | "J"
            | "K"
            | "L"
            | "M"
            | "N"
            | "O"
            | "P"
            | "Q"
            | "R"
            | "S"
            | "T"
            | "U"
            | "V"
            | "W"
            | "X"
            | "Y"
            | "Z"
    )
}

// a-z, A-Z, 0-9, _
fn is_alpha_numeric(ch: Option<&str>) -> bool {
    let ch = match ch {
        None => return false,
        Some(char) => char,
    };

    match ch {
        _ if is_lowercase(ch) => true,
        _ if is_uppercase(ch) => true,
        _ if is_digit(ch) => true,
        "_" => true,
        _ => false,
    }
}

fn scan_forward_until((iter, lexeme): (&mut InputIter, &mut String), ch: &str) {
    for x in iter {
        lexeme.push_str(x);
        if x == ch {
            break;
        }
    }
}

fn match_next_char((iter, lexeme): (&mut InputIter, &mut String), ch: &str) -> bool {
    if iter.peek() != Some(ch) {
        false
    } else {
        let grapheme = iter.next().unwrap();
        lexeme.push_str(grapheme);
        true
    }
}

fn string((iter, lexeme): (&mut InputIter, &mut String), start_line: usize) -> Result<(), ScanError> {
    scan_forward_until((iter, lexeme), "\"");

    // Got to end of file without a terminating string: report at the opening
    // line, not wherever scanning gave up.
    if !lexeme.ends_with('"') {
        return Err(ScanError::new(start_line, "Unterminated string."));
    }

    Ok(())
}

/// Consumes a run of digits, followed by an optional `.digits` fraction.
/// A `.` not followed by a digit is left unconsumed: `123.` scans as the
/// number `123` plus a separate `Dot` token, matching Lox's grammar (a
/// trailing dot is a method-call dot, not part of the literal).
fn number((iter, lexeme): (&mut InputIter, &mut String)) {
    while let Some(ch) = iter.peek() {
        if !is_digit(ch) {
            break;
        }
        lexeme.push_str(ch);
        iter.next();
    }

    if iter.peek() == Some(".") && is_digit(iter.peek_next().unwrap_or("")) {
        lexeme.push('.');
        iter.next();

        while let Some(ch) = iter.peek() {
            if !is_digit(ch) {
                break;
            }
            lexeme.push_str(ch);
            iter.next();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_and_token() {
        let input = "var andy = 20; if (andy or 0) { print \"fail\"; }";
        let mut scanner = Scanner::new();
        scanner.scan_tokens(input);
        assert!(scanner.errors().is_empty());

        for token in scanner.tokens() {
            if token.token_type() == TokenType::And {
                panic!("Unexpected \"AND\" token in program.");
            }
        }
    }

    #[test]
    fn test_scanner() {
        let input = r#"
            // this is a comment
            var andy = 10;
            var jonny = 3;
            if (andy and jonny) { print "Hello World" + (andy+jonny) };
            "#;

        let mut scanner = Scanner::new();
        let tokens = scanner.scan_tokens(input);
        assert!(scanner.errors().is_empty());
        assert_eq!(tokens.last().unwrap().token_type(), TokenType::Eof);
    }

    #[test]
    fn trailing_dot_is_not_part_of_number() {
        let mut scanner = Scanner::new();
        let tokens = scanner.scan_tokens("123.");
        assert!(scanner.errors().is_empty());
        assert_eq!(tokens[0].token_type(), TokenType::Number);
        assert_eq!(tokens[0].lexeme(), "123");
        assert_eq!(tokens[1].token_type(), TokenType::Dot);
    }

    #[test]
    fn unterminated_string_is_recorded_not_fatal() {
        let mut scanner = Scanner::new();
        scanner.scan_tokens("\"abc");
        assert_eq!(scanner.errors().len(), 1);
        assert!(scanner.errors()[0].message.contains("Unterminated string"));
    }

    #[test]
    fn unterminated_multiline_string_reports_the_opening_line() {
        let mut scanner = Scanner::new();
        scanner.scan_tokens("\"abc\ndef");
        assert_eq!(scanner.errors().len(), 1);
        assert_eq!(scanner.errors()[0].line, 1);
    }

    #[test]
    fn scan_errors_accumulate_past_first_bad_character() {
        let mut scanner = Scanner::new();
        scanner.scan_tokens("@ # $");
        assert_eq!(scanner.errors().len(), 3);
    }
}
