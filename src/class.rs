//! Class and instance runtime objects.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::{LoxError, Result};
use crate::function::{Callable, LoxFunction};
use crate::interpreter::Interpreter;
use crate::token::Token;
use crate::value::Value;

/// A class value: its name plus the method table every instance shares.
/// Classes are themselves callable — calling one allocates an instance.
pub struct LoxClass<'a> {
    name: &'a str,
    methods: HashMap<&'a str, Rc<LoxFunction<'a>>>,
}

impl<'a> LoxClass<'a> {
    pub fn new(name: &'a str, methods: HashMap<&'a str, Rc<LoxFunction<'a>>>) -> Self {
        LoxClass { name, methods }
    }

    pub fn name(&self) -> &'a str {
        self.name
    }

    pub fn find_method(&self, name: &str) -> Option<Rc<LoxFunction<'a>>> {
        self.methods.get(name).cloned()
    }
}

// Instantiation: the `Rc` receiver is what the new instance shares.
impl<'a> Callable<'a> for Rc<LoxClass<'a>> {
    fn arity(&self) -> usize {
        self.find_method("init")
            .map_or(0, |initializer| initializer.arity())
    }

    fn call(
        &self,
        interpreter: &mut Interpreter<'a>,
        arguments: Vec<Value<'a>>,
        paren: &'a Token<'a>,
    ) -> Result<Value<'a>> {
        let instance = LoxInstance::new(Rc::clone(self));

        if let Some(initializer) = self.find_method("init") {
            // The initializer's own result is discarded; instantiation
            // always yields the instance.
            initializer
                .bind(Rc::clone(&instance))
                .call(interpreter, arguments, paren)?;
        }

        Ok(Value::Instance(instance))
    }
}

pub type InstanceRef<'a> = Rc<RefCell<LoxInstance<'a>>>;

/// An object: its class (shared across instances) plus its own mutable
/// field map.
pub struct LoxInstance<'a> {
    class: Rc<LoxClass<'a>>,
    fields: HashMap<&'a str, Value<'a>>,
}

impl<'a> LoxInstance<'a> {
    pub fn new(class: Rc<LoxClass<'a>>) -> InstanceRef<'a> {
        Rc::new(RefCell::new(LoxInstance {
            class,
            fields: HashMap::new(),
        }))
    }

    pub fn class_name(&self) -> &'a str {
        self.class.name()
    }

    /// Property lookup: own fields win over methods; a method found on the
    /// class is rebound to this receiver on every access.
    pub fn get(instance: &InstanceRef<'a>, name: &'a Token<'a>) -> Result<Value<'a>> {
        if let Some(field) = instance.borrow().fields.get(name.lexeme) {
            return Ok(field.clone());
        }

        if let Some(method) = instance.borrow().class.find_method(name.lexeme) {
            let bound = method.bind(Rc::clone(instance));
            return Ok(Value::Function(Rc::new(bound)));
        }

        Err(LoxError::runtime(
            name,
            format!("Undefined property '{}'.", name.lexeme),
        ))
    }

    /// Field write: creates or overwrites, with no validation against the
    /// method table.
    pub fn set(&mut self, name: &'a str, value: Value<'a>) {
        self.fields.insert(name, value);
    }
}
