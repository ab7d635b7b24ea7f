//! Orchestration of the full pipeline: scan → parse → resolve → run.
//!
//! [`Lox`] owns the interpreter, the diagnostic sink, and the two error
//! flags a front end reads after a run to pick its exit code:
//! [`Lox::had_error`] for static errors (lexical, syntactic, or semantic)
//! and [`Lox::had_runtime_error`] for runtime failures.
//!
//! Static phases are all-or-nothing: every diagnostic the scanner, parser,
//! and resolver can surface is reported, and any of them suppresses
//! execution entirely.  A runtime error aborts the run after the statement
//! that raised it.

use std::io::{self, Write};

use log::{debug, info};

use crate::error::LoxError;
use crate::interpreter::Interpreter;
use crate::parser::{Parser, Stmt};
use crate::resolver::Resolver;
use crate::scanner::Scanner;
use crate::token::Token;

pub struct Lox {
    interpreter: Interpreter<'static>,
    err_out: Box<dyn Write>,
    had_error: bool,
    had_runtime_error: bool,
}

impl Lox {
    /// A runner for script execution, printing to stdout/stderr.
    pub fn new() -> Self {
        Self::with_writers(Box::new(io::stdout()), Box::new(io::stderr()), false)
    }

    /// A runner for the interactive prompt: bare expression statements print
    /// their value, and error flags reset between lines.
    pub fn repl() -> Self {
        Self::with_writers(Box::new(io::stdout()), Box::new(io::stderr()), true)
    }

    /// A runner with injected output and diagnostic sinks (used by tests).
    pub fn with_writers(out: Box<dyn Write>, err_out: Box<dyn Write>, interactive: bool) -> Self {
        Lox {
            interpreter: Interpreter::new(out, interactive),
            err_out,
            had_error: false,
            had_runtime_error: false,
        }
    }

    /// Run a whole program.
    ///
    /// The source is `'static` because values the program creates — above
    /// all closures — keep borrowing its tokens and AST for as long as the
    /// interpreter lives.  Script files are leaked once per process by the
    /// front end; REPL lines are promoted by [`Lox::run_line`].
    pub fn run(&mut self, source: &'static str) {
        info!("Running {} bytes of source", source.len());

        // ── lex ──────────────────────────────────────────────────────────
        let mut tokens: Vec<Token<'static>> = Vec::new();
        for item in Scanner::new(source.as_bytes()) {
            match item {
                Ok(token) => tokens.push(token),
                Err(error) => self.report(&error),
            }
        }

        // ── parse ────────────────────────────────────────────────────────
        let (statements, errors) = Parser::new(Vec::leak(tokens)).parse();
        for error in &errors {
            self.report(error);
        }

        if self.had_error {
            debug!("Static errors reported; skipping resolution and execution");
            return;
        }

        // ── resolve ──────────────────────────────────────────────────────
        let statements: &'static [Stmt<'static>] = Vec::leak(statements);
        for error in Resolver::new(&mut self.interpreter).resolve(statements) {
            self.report(&error);
        }

        if self.had_error {
            debug!("Resolution errors reported; skipping execution");
            return;
        }

        // ── run ──────────────────────────────────────────────────────────
        if let Err(error) = self.interpreter.interpret(statements) {
            self.report_runtime(&error);
        }
    }

    /// Run one interactive line.  Flags reset so an error on a previous line
    /// does not poison this one; the line itself is promoted to process
    /// lifetime because closures it defines may be called much later.
    pub fn run_line(&mut self, line: String) {
        self.had_error = false;
        self.had_runtime_error = false;

        self.run(Box::leak(line.into_boxed_str()));
    }

    /// Was a static (lexical/syntactic/semantic) error reported?
    pub fn had_error(&self) -> bool {
        self.had_error
    }

    /// Was a runtime error reported?
    pub fn had_runtime_error(&self) -> bool {
        self.had_runtime_error
    }

    fn report(&mut self, error: &LoxError) {
        let _ = writeln!(self.err_out, "{error}");
        self.had_error = true;
    }

    fn report_runtime(&mut self, error: &LoxError) {
        let _ = writeln!(self.err_out, "{error}");
        self.had_runtime_error = true;
    }
}

impl Default for Lox {
    fn default() -> Self {
        Lox::new()
    }
}
