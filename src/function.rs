//! Callable runtime objects: user functions (closures) and natives.

use std::fmt;

use crate::class::InstanceRef;
use crate::environment::{EnvRef, Environment};
use crate::error::{LoxError, Result};
use crate::interpreter::{Flow, Interpreter};
use crate::parser::Stmt;
use crate::token::Token;
use crate::value::Value;

/// The contract every callable value satisfies: user functions, classes
/// (instantiation is a call), and natives.  `paren` is the call-site `)`
/// token, kept for error reporting.
pub trait Callable<'a> {
    fn arity(&self) -> usize;

    fn call(
        &self,
        interpreter: &mut Interpreter<'a>,
        arguments: Vec<Value<'a>>,
        paren: &'a Token<'a>,
    ) -> Result<Value<'a>>;
}

/// Signature for built-in functions.  Higher-ranked so a native never ties
/// its result to a particular AST lifetime.
pub type NativeFn = for<'e> fn(&[Value<'e>]) -> std::result::Result<Value<'e>, String>;

/// A built-in function exposed to programs under a fixed name.
pub struct NativeFunction {
    pub name: &'static str,
    pub arity: usize,
    pub func: NativeFn,
}

impl<'a> Callable<'a> for NativeFunction {
    fn arity(&self) -> usize {
        self.arity
    }

    fn call(
        &self,
        _interpreter: &mut Interpreter<'a>,
        arguments: Vec<Value<'a>>,
        paren: &'a Token<'a>,
    ) -> Result<Value<'a>> {
        (self.func)(&arguments).map_err(|message| LoxError::runtime(paren, message))
    }
}

/// A user function value: the borrowed declaration plus the environment live
/// at its definition.  Immutable once built; `bind` produces a fresh one.
pub struct LoxFunction<'a> {
    name: &'a Token<'a>,
    params: &'a [&'a Token<'a>],
    body: &'a [Stmt<'a>],
    closure: EnvRef<'a>,
    is_initializer: bool,
}

impl<'a> LoxFunction<'a> {
    pub fn new(
        name: &'a Token<'a>,
        params: &'a [&'a Token<'a>],
        body: &'a [Stmt<'a>],
        closure: EnvRef<'a>,
        is_initializer: bool,
    ) -> Self {
        LoxFunction {
            name,
            params,
            body,
            closure,
            is_initializer,
        }
    }

    pub fn name(&self) -> &'a str {
        self.name.lexeme
    }

    /// Rewrap this method with a one-slot environment holding the receiver.
    /// Produced afresh on every property access, so the binding refers to the
    /// instance, never to a snapshot of its fields.
    pub fn bind(&self, instance: InstanceRef<'a>) -> LoxFunction<'a> {
        let environment = Environment::with_enclosing(&self.closure);
        environment
            .borrow_mut()
            .define("this", Value::Instance(instance));

        LoxFunction {
            name: self.name,
            params: self.params,
            body: self.body,
            closure: environment,
            is_initializer: self.is_initializer,
        }
    }
}

impl<'a> Callable<'a> for LoxFunction<'a> {
    fn arity(&self) -> usize {
        self.params.len()
    }

    fn call(
        &self,
        interpreter: &mut Interpreter<'a>,
        arguments: Vec<Value<'a>>,
        _paren: &'a Token<'a>,
    ) -> Result<Value<'a>> {
        let environment = Environment::with_enclosing(&self.closure);

        {
            let mut scope = environment.borrow_mut();
            for (param, argument) in self.params.iter().zip(arguments) {
                scope.define(param.lexeme, argument);
            }
        }

        let flow = interpreter.execute_block(self.body, environment)?;

        // An initializer always yields its receiver, even on a bare
        // `return;` (the resolver rejects `return <value>` there).
        if self.is_initializer {
            return self
                .closure
                .borrow()
                .get_local("this")
                .ok_or_else(|| LoxError::runtime(self.name, "Initializer has no instance."));
        }

        match flow {
            Flow::Return(value) => Ok(value),
            Flow::Normal => Ok(Value::Nil),
        }
    }
}

impl fmt::Debug for LoxFunction<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The closure is omitted: environments reach back to values that can
        // contain this very function.
        f.debug_struct("LoxFunction")
            .field("name", &self.name.lexeme)
            .field("arity", &self.params.len())
            .finish()
    }
}
