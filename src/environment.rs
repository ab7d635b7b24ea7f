//! Lexical scope chain shared between blocks, calls, and closures.
//!
//! Environments form a singly-linked parent chain, innermost to global, with
//! shared ownership: a closure keeps its defining environment alive after the
//! declaring block exits, so links are `Rc<RefCell<_>>` rather than a
//! single-owner tree.
//!
//! A name moves through three states: absent, declared-but-uninitialized
//! (`var x;`), and initialized.  The middle state is a `None` slot and drives
//! its own error message, distinct from an undefined name.

use crate::error::{LoxError, Result};
use crate::token::Token;
use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

pub type EnvRef<'a> = Rc<RefCell<Environment<'a>>>;

pub struct Environment<'a> {
    enclosing: Option<EnvRef<'a>>,

    // `None` marks a binding declared without an initializer.
    values: HashMap<&'a str, Option<Value<'a>>>,
}

impl<'a> Environment<'a> {
    /// The global scope, with no enclosing environment.
    pub fn new_global() -> EnvRef<'a> {
        Rc::new(RefCell::new(Environment {
            enclosing: None,
            values: HashMap::new(),
        }))
    }

    /// A fresh scope nested inside `enclosing`.
    pub fn with_enclosing(enclosing: &EnvRef<'a>) -> EnvRef<'a> {
        Rc::new(RefCell::new(Environment {
            enclosing: Some(Rc::clone(enclosing)),
            values: HashMap::new(),
        }))
    }

    /// Bind `name` to `value`, creating or overwriting the slot.
    pub fn define(&mut self, name: &'a str, value: Value<'a>) {
        self.values.insert(name, Some(value));
    }

    /// Declare `name` without initializing it (`var x;`).
    pub fn declare(&mut self, name: &'a str) {
        self.values.insert(name, None);
    }

    /// Look `name` up through the chain.
    pub fn get(&self, name: &Token<'_>) -> Result<Value<'a>> {
        match self.values.get(name.lexeme) {
            Some(Some(value)) => Ok(value.clone()),
            Some(None) => Err(uninitialized(name)),
            None => match &self.enclosing {
                Some(enclosing) => enclosing.borrow().get(name),
                None => Err(undefined(name)),
            },
        }
    }

    /// Assign to an existing binding somewhere in the chain.  Assigning to a
    /// declared-but-uninitialized name initializes it.
    pub fn assign(&mut self, name: &Token<'_>, value: Value<'a>) -> Result<()> {
        if let Some(slot) = self.values.get_mut(name.lexeme) {
            *slot = Some(value);
            return Ok(());
        }

        match &self.enclosing {
            Some(enclosing) => enclosing.borrow_mut().assign(name, value),
            None => Err(undefined(name)),
        }
    }

    /// Look `name` up exactly `distance` hops out — used for references the
    /// resolver bound to a local slot.
    pub fn get_at(&self, distance: usize, name: &Token<'_>) -> Result<Value<'a>> {
        if distance == 0 {
            return match self.values.get(name.lexeme) {
                Some(Some(value)) => Ok(value.clone()),
                Some(None) => Err(uninitialized(name)),
                None => Err(undefined(name)),
            };
        }

        match &self.enclosing {
            Some(enclosing) => enclosing.borrow().get_at(distance - 1, name),
            None => Err(undefined(name)),
        }
    }

    /// Assign exactly `distance` hops out.
    pub fn assign_at(&mut self, distance: usize, name: &Token<'_>, value: Value<'a>) -> Result<()> {
        if distance == 0 {
            return match self.values.get_mut(name.lexeme) {
                Some(slot) => {
                    *slot = Some(value);
                    Ok(())
                }
                None => Err(undefined(name)),
            };
        }

        match &self.enclosing {
            Some(enclosing) => enclosing.borrow_mut().assign_at(distance - 1, name, value),
            None => Err(undefined(name)),
        }
    }

    /// Read an initialized binding in *this* scope only, bypassing the chain.
    /// Used for the receiver slot a bound method's wrapper environment holds.
    pub fn get_local(&self, name: &str) -> Option<Value<'a>> {
        self.values.get(name).cloned().flatten()
    }
}

fn undefined(name: &Token<'_>) -> LoxError {
    LoxError::runtime(name, format!("Undefined variable '{}'.", name.lexeme))
}

fn uninitialized(name: &Token<'_>) -> LoxError {
    LoxError::runtime(
        name,
        format!("Variable '{}' has not been initialized.", name.lexeme),
    )
}
