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

use std::env::args;
use std::fs::File;
use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use loxygen::errors::{ParseError, RloxError, ScanError};
use loxygen::interpreter::Interpreter;
use loxygen::parser::Parser;
use loxygen::resolver::Resolver;
use loxygen::scanner::{Scanner, Token};

const EXIT_USAGE: u8 = 64;
const EXIT_STATIC_ERROR: u8 = 65;
const EXIT_RUNTIME_ERROR: u8 = 70;
const EXIT_IO_ERROR: u8 = 74;

fn main() -> ExitCode {
    env_logger::init();

    let cmdline: Vec<String> = args().collect();

    match cmdline.len() {
        len if len > 2 => {
            println!("Usage: loxygen [script]");
            ExitCode::from(EXIT_USAGE)
        }
        len if len == 2 => match run_file(&cmdline[1]) {
            Ok(code) => ExitCode::from(code),
            Err(e) => {
                eprintln!("{e}");
                ExitCode::from(EXIT_IO_ERROR)
            }
        },
        _ => {
            run_prompt();
            ExitCode::SUCCESS
        }
    }
}

fn run_file(filename: &str) -> Result<u8, RloxError> {
    let file_handle = File::open(filename)?;
    let source = io::read_to_string(file_handle)?;

    let mut interpreter = Interpreter::new();
    Ok(run(&mut interpreter, &source))
}

/// Reads one line at a time from standard input, running each as a complete
/// program against a single interpreter so global state (and the REPL's
/// view of previously declared variables and functions) persists across
/// lines. Exits on EOF or a blank line; a bad line reports its errors but
/// never ends the session.
fn run_prompt() {
    let stdin = io::stdin();
    let mut interpreter = Interpreter::new();

    loop {
        print!("> ");
        io::stdout().flush().expect("stdout should accept a flush");

        let mut line = String::new();
        let bytes_read = stdin.lock().read_line(&mut line).expect("stdin should be readable");

        if bytes_read == 0 || line.trim().is_empty() {
            break;
        }

        run(&mut interpreter, &line);
    }
}

/// Scans, parses, resolves, and interprets one program, reporting any
/// diagnostics to standard error. Returns the exit code the spec assigns to
/// whatever happened: 0 on success, 65 for accumulated static errors, 70 for
/// a runtime error.
fn run(interpreter: &mut Interpreter, source: &str) -> u8 {
    let mut scanner = Scanner::new();
    let tokens = scanner.scan_tokens(source).to_vec();

    if !scanner.errors().is_empty() {
        for error in scanner.errors() {
            eprintln!("{}", report_scan_error(error));
        }
        return EXIT_STATIC_ERROR;
    }

    let mut parser = Parser::new(tokens);
    let program = parser.parse();

    if !parser.errors().is_empty() {
        for error in parser.errors() {
            eprintln!("{}", report_parse_error(error));
        }
        return EXIT_STATIC_ERROR;
    }

    let mut resolver = Resolver::new();
    resolver.resolve(&program);

    if !resolver.errors().is_empty() {
        for error in resolver.errors() {
            eprintln!("[line {}] Error at {}: {}", error.token.line(), loc(&error.token), error.message);
        }
        return EXIT_STATIC_ERROR;
    }

    let locals = resolver.into_locals();

    match interpreter.interpret(&program, locals) {
        Ok(()) => 0,
        Err(error) => {
            eprintln!("[line {}] {}", error.token.line(), error.message);
            EXIT_RUNTIME_ERROR
        }
    }
}

fn loc(token: &Token) -> String {
    if token.is_eof() {
        "end".to_string()
    } else {
        format!("'{}'", token.lexeme())
    }
}

fn report_scan_error(error: &ScanError) -> String {
    format!("[line {}] Error: {}", error.line, error.message)
}

fn report_parse_error(error: &ParseError) -> String {
    format!(
        "[line {}] Error at {}: {}",
        error.token.line(),
        loc(&error.token),
        error.message
    )
}
