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

use thiserror::Error;

use crate::scanner::Token;

pub type Result<T> = std::result::Result<T, RloxError>;

/// A single lexical error with its source location, accumulated by the
/// scanner rather than aborting the scan.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("[line {line}] Error: {message}")]
pub struct ScanError {
    pub line: usize,
    pub message: String,
}

impl ScanError {
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

/// A single syntax error, anchored to the token where the parser gave up.
/// The parser always has a token in hand (the EOF token included), so
/// there's no end-of-file case with no token to point at.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("{message}")]
pub struct ParseError {
    pub token: Token,
    pub message: String,
}

impl ParseError {
    pub fn new(token: Token, message: impl Into<String>) -> Self {
        Self {
            token,
            message: message.into(),
        }
    }
}

/// A single static-analysis error raised by the resolver.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("{message}")]
pub struct ResolveError {
    pub token: Token,
    pub message: String,
}

impl ResolveError {
    pub fn new(token: Token, message: impl Into<String>) -> Self {
        Self {
            token,
            message: message.into(),
        }
    }
}

/// A runtime fault raised while interpreting an already-resolved program.
/// Unlike the scan/parse/resolve tiers this is first-wins: the interpreter
/// stops at the first one.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("{message}")]
pub struct RuntimeError {
    pub token: Token,
    pub message: String,
}

impl RuntimeError {
    pub fn new(token: Token, message: impl Into<String>) -> Self {
        Self {
            token,
            message: message.into(),
        }
    }
}

/// Top-level error type, used only for plumbing CLI/usage failures that
/// fall outside the scan/parse/resolve/runtime pipeline. The pipeline
/// stages themselves report through accumulated `Vec<_>`s (see
/// `Scanner::errors`, `Parser::errors`, `Resolver::errors`) or a single
/// `RuntimeError`, not through this type.
#[derive(Debug, Error)]
pub enum RloxError {
    #[error("{0}")]
    Cmdline(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
