//! Static resolver pass.
//!
//! This resolver does three things in one AST walk:
//! 1. Build lexical scopes (stack of `HashMap<&str, bool>` tracking
//!    declared/defined).
//! 2. Report static errors (redeclaration, forward-read in initializer,
//!    invalid `return`, misplaced `this`).
//! 3. Tell the interpreter, for *each* variable occurrence, whether it's a
//!    local (and at what depth) or a global — so the interpreter never falls
//!    back to dynamic lookup that would see a later shadowing local.
//!
//! Errors accumulate; the pass never aborts.  The runner suppresses
//! execution entirely when any were reported.

use crate::error::LoxError;
use crate::interpreter::Interpreter;
use crate::parser::{Expr, ExprId, Stmt};
use crate::token::Token;
use log::{debug, info};
use std::collections::HashMap;

/// What kind of function body are we inside?  Validates `return`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum FunctionType {
    None,
    Function,
    Method,
    Initializer,
}

/// Are we inside a class body?  Validates `this`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum ClassType {
    None,
    Class,
}

/// Resolver: tracks scopes, enforces static rules, and *records* binding
/// distances (locals vs. globals) by calling back into the interpreter.
pub struct Resolver<'a, 'interp> {
    interpreter: &'interp mut Interpreter<'a>,
    scopes: Vec<HashMap<&'a str, bool>>, // false=declared, true=defined
    current_function: FunctionType,
    current_class: ClassType,
    errors: Vec<LoxError>,
}

impl<'a, 'interp> Resolver<'a, 'interp> {
    /// Create a new resolver bound to the given interpreter.
    pub fn new(interpreter: &'interp mut Interpreter<'a>) -> Self {
        info!("Resolver instantiated");

        Resolver {
            interpreter,
            scopes: Vec::new(),
            current_function: FunctionType::None,
            current_class: ClassType::None,
            errors: Vec::new(),
        }
    }

    /// Walk all top-level statements and return every static error found.
    pub fn resolve(mut self, statements: &'a [Stmt<'a>]) -> Vec<LoxError> {
        info!(
            "Beginning resolve pass over {} statement(s)",
            statements.len()
        );

        for statement in statements {
            self.resolve_stmt(statement);
        }

        self.errors
    }

    fn error(&mut self, token: &Token<'_>, message: &str) {
        debug!("Resolve error on line {}: {}", token.line, message);
        self.errors.push(LoxError::resolve(token.line, message));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statement resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_stmt(&mut self, statement: &'a Stmt<'a>) {
        match statement {
            Stmt::Block(statements) => {
                self.begin_scope();
                for s in statements {
                    self.resolve_stmt(s);
                }
                self.end_scope();
            }

            Stmt::Var { name, initializer } => {
                // declare → resolve initializer → define, so the initializer
                // cannot read the name it is initializing
                self.declare(name);
                if let Some(expr) = initializer {
                    self.resolve_expr(expr);
                }
                self.define(name);
            }

            Stmt::Function { name, params, body } => {
                // the name is visible *inside* its own body (recursion)
                self.declare(name);
                self.define(name);
                self.resolve_function(params, body, FunctionType::Function);
            }

            Stmt::Expression(expr) | Stmt::Print(expr) => {
                self.resolve_expr(expr);
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition);
                self.resolve_stmt(then_branch);
                if let Some(else_branch) = else_branch.as_deref() {
                    self.resolve_stmt(else_branch);
                }
            }

            Stmt::While { condition, body } => {
                self.resolve_expr(condition);
                self.resolve_stmt(body);
            }

            Stmt::Return { keyword, value } => {
                if self.current_function == FunctionType::None {
                    self.error(keyword, "'return' used outside of function");
                }

                if let Some(expr) = value {
                    if self.current_function == FunctionType::Initializer {
                        self.error(keyword, "Cannot return a value from an initializer");
                    }
                    self.resolve_expr(expr);
                }
            }

            Stmt::Class { name, methods } => {
                let enclosing_class = self.current_class;
                self.current_class = ClassType::Class;

                self.declare(name);
                self.define(name);

                // `this` lives in a scope wrapped around every method body.
                self.begin_scope();
                if let Some(scope) = self.scopes.last_mut() {
                    scope.insert("this", true);
                }

                for method in methods {
                    if let Stmt::Function {
                        name: method_name,
                        params,
                        body,
                    } = method
                    {
                        let declaration = if method_name.lexeme == "init" {
                            FunctionType::Initializer
                        } else {
                            FunctionType::Method
                        };
                        self.resolve_function(params, body, declaration);
                    }
                }

                self.end_scope();

                self.current_class = enclosing_class;
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expression resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_expr(&mut self, expr: &'a Expr<'a>) {
        match expr {
            Expr::Literal(_) => {}

            Expr::Grouping(inner) => {
                self.resolve_expr(inner);
            }

            Expr::Unary { right, .. } => {
                self.resolve_expr(right);
            }

            Expr::Binary { left, right, .. }
            | Expr::Logical { left, right, .. }
            | Expr::Comma { left, right } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }

            Expr::Ternary {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition);
                self.resolve_expr(then_branch);
                self.resolve_expr(else_branch);
            }

            Expr::Variable { id, name } => {
                let shadows_own_initializer = self
                    .scopes
                    .last()
                    .is_some_and(|scope| scope.get(name.lexeme) == Some(&false));

                if shadows_own_initializer {
                    self.error(name, "Cannot read local variable in its own initializer");
                }

                self.resolve_local(*id, name);
            }

            Expr::Assign { id, name, value } => {
                // First resolve RHS, then bind LHS
                self.resolve_expr(value);
                self.resolve_local(*id, name);
            }

            Expr::Call {
                callee, arguments, ..
            } => {
                self.resolve_expr(callee);
                for argument in arguments {
                    self.resolve_expr(argument);
                }
            }

            Expr::Get { object, .. } => self.resolve_expr(object),

            Expr::Set { object, value, .. } => {
                self.resolve_expr(value);
                self.resolve_expr(object);
            }

            Expr::This { id, keyword } => {
                if self.current_class == ClassType::None {
                    self.error(keyword, "Cannot use 'this' outside of a class");
                }

                self.resolve_local(*id, keyword);
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Function helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Enter a fresh scope for a function's parameters + body.
    fn resolve_function(
        &mut self,
        params: &'a [&'a Token<'a>],
        body: &'a [Stmt<'a>],
        kind: FunctionType,
    ) {
        let enclosing = self.current_function;
        self.current_function = kind;

        self.begin_scope();
        for param in params {
            self.declare(param);
            self.define(param);
        }
        for statement in body {
            self.resolve_stmt(statement);
        }
        self.end_scope();

        self.current_function = enclosing;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Scope management
    // ─────────────────────────────────────────────────────────────────────────

    #[inline]
    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    #[inline]
    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, name: &'a Token<'a>) {
        if self.scopes.is_empty() {
            return; // globals may redeclare freely
        }

        let already_declared = self
            .scopes
            .last()
            .is_some_and(|scope| scope.contains_key(name.lexeme));

        if already_declared {
            self.error(name, "Variable already declared in this scope");
        }

        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.lexeme, false);
        }
    }

    fn define(&mut self, name: &'a Token<'a>) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.lexeme, true);
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Binding-distance helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Record this occurrence as a local at the depth of the innermost scope
    /// that declares it, or leave it to global lookup when no scope does.
    fn resolve_local(&mut self, id: ExprId, name: &Token<'a>) {
        for (depth, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains_key(name.lexeme) {
                debug!("Resolved '{}' at depth {}", name.lexeme, depth);
                self.interpreter.resolve_local(id, depth);
                return;
            }
        }

        debug!("Resolved '{}' as global", name.lexeme);
    }
}
