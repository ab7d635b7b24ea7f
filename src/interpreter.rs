//! Tree-walking evaluator: statement executor plus expression evaluator.
//!
//! Non-local `return` is modeled as an explicit [`Flow`] result variant
//! threaded through every statement executor and consumed at the call
//! boundary in [`crate::function::LoxFunction::call`] — it is control
//! transfer, never an error.
//!
//! Runtime errors carry the offending token, abort the current run, and are
//! reported once by the runner.

use std::collections::HashMap;
use std::io::{self, Write};
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use log::{debug, info};

use crate::class::{LoxClass, LoxInstance};
use crate::environment::{EnvRef, Environment};
use crate::error::{LoxError, Result};
use crate::function::{Callable, LoxFunction, NativeFunction};
use crate::parser::{Expr, ExprId, LiteralValue, Stmt};
use crate::token::{Token, TokenType};
use crate::value::Value;

/// Outcome of executing one statement: either run the next one, or unwind
/// with a value to the nearest enclosing call.
pub enum Flow<'a> {
    Normal,
    Return(Value<'a>),
}

pub struct Interpreter<'a> {
    globals: EnvRef<'a>,
    environment: EnvRef<'a>,

    /// Resolution side-table: node identity → lexical hop count.
    /// Absent entry ⇒ the reference resolves via the globals at run time.
    locals: HashMap<ExprId, usize>,

    out: Box<dyn Write>,

    /// In the interactive loop, bare top-level expressions print their value.
    interactive: bool,
}

impl<'a> Interpreter<'a> {
    /// Creates a new interpreter writing program output to `out`, and defines
    /// the native functions in the global scope.
    pub fn new(out: Box<dyn Write>, interactive: bool) -> Self {
        info!("Initializing interpreter");

        let globals = Environment::new_global();

        globals.borrow_mut().define(
            "clock",
            Value::Native(Rc::new(NativeFunction {
                name: "clock",
                arity: 0,
                func: clock,
            })),
        );

        let environment = Rc::clone(&globals);

        Self {
            globals,
            environment,
            locals: HashMap::new(),
            out,
            interactive,
        }
    }

    /// Record a resolved reference.  Called by the resolver.
    pub fn resolve_local(&mut self, id: ExprId, depth: usize) {
        self.locals.insert(id, depth);
    }

    /// Executes a list of top-level statements in order.  The first runtime
    /// error stops the run; later statements are not attempted.
    pub fn interpret(&mut self, statements: &'a [Stmt<'a>]) -> Result<()> {
        debug!("Interpreting {} statements", statements.len());

        for statement in statements {
            if self.interactive {
                if let Stmt::Expression(expr) = statement {
                    let value = self.evaluate(expr)?;
                    writeln!(self.out, "{value}")?;
                    continue;
                }
            }

            if let Flow::Return(_) = self.execute(statement)? {
                // The resolver rejects top-level `return`; nothing to unwind
                // into here.
                break;
            }
        }

        Ok(())
    }

    /// Executes a single statement.
    pub fn execute(&mut self, statement: &'a Stmt<'a>) -> Result<Flow<'a>> {
        match statement {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
                Ok(Flow::Normal)
            }

            Stmt::Print(expr) => {
                let value = self.evaluate(expr)?;
                writeln!(self.out, "{value}")?;
                Ok(Flow::Normal)
            }

            Stmt::Var { name, initializer } => {
                match initializer {
                    Some(expr) => {
                        let value = self.evaluate(expr)?;
                        debug!("Variable '{}' defined with {}", name.lexeme, value);
                        self.environment.borrow_mut().define(name.lexeme, value);
                    }
                    None => {
                        // Declared-but-uninitialized: reads fail until the
                        // first assignment.
                        self.environment.borrow_mut().declare(name.lexeme);
                    }
                }
                Ok(Flow::Normal)
            }

            Stmt::Block(statements) => {
                let environment = Environment::with_enclosing(&self.environment);
                self.execute_block(statements, environment)
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if is_truthy(&self.evaluate(condition)?) {
                    self.execute(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)
                } else {
                    Ok(Flow::Normal)
                }
            }

            Stmt::While { condition, body } => {
                while is_truthy(&self.evaluate(condition)?) {
                    if let returning @ Flow::Return(_) = self.execute(body)? {
                        return Ok(returning);
                    }
                }
                Ok(Flow::Normal)
            }

            Stmt::Function { name, params, body } => {
                debug!("Defining function '{}'", name.lexeme);
                // The closure is the environment live at the declaration.
                let function =
                    LoxFunction::new(name, params, body, Rc::clone(&self.environment), false);
                self.environment
                    .borrow_mut()
                    .define(name.lexeme, Value::Function(Rc::new(function)));
                Ok(Flow::Normal)
            }

            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                Ok(Flow::Return(value))
            }

            Stmt::Class { name, methods } => {
                debug!("Defining class '{}'", name.lexeme);

                // Pre-declare the name, then assign the finished class over
                // the placeholder once every method is built.
                self.environment.borrow_mut().define(name.lexeme, Value::Nil);

                let mut method_table: HashMap<&'a str, Rc<LoxFunction<'a>>> = HashMap::new();
                for method in methods.iter() {
                    if let Stmt::Function {
                        name: method_name,
                        params,
                        body,
                    } = method
                    {
                        let is_initializer = method_name.lexeme == "init";
                        let function = LoxFunction::new(
                            method_name,
                            params,
                            body,
                            Rc::clone(&self.environment),
                            is_initializer,
                        );
                        method_table.insert(method_name.lexeme, Rc::new(function));
                    }
                }

                let class = Value::Class(Rc::new(LoxClass::new(name.lexeme, method_table)));
                self.environment.borrow_mut().assign(name, class)?;
                Ok(Flow::Normal)
            }
        }
    }

    /// Runs `statements` inside `environment`, restoring the previous scope
    /// on every exit path — normal completion, `return`, or error.
    pub fn execute_block(
        &mut self,
        statements: &'a [Stmt<'a>],
        environment: EnvRef<'a>,
    ) -> Result<Flow<'a>> {
        let previous = std::mem::replace(&mut self.environment, environment);

        let mut flow = Flow::Normal;
        for statement in statements {
            match self.execute(statement) {
                Ok(Flow::Normal) => {}
                Ok(returning) => {
                    flow = returning;
                    break;
                }
                Err(error) => {
                    self.environment = previous;
                    return Err(error);
                }
            }
        }

        self.environment = previous;
        Ok(flow)
    }

    /// Evaluates an expression and returns a Value.
    pub fn evaluate(&mut self, expr: &'a Expr<'a>) -> Result<Value<'a>> {
        match expr {
            Expr::Literal(literal) => Ok(match literal {
                LiteralValue::Number(n) => Value::Number(*n),
                LiteralValue::Str(s) => Value::String(s.clone()),
                LiteralValue::True => Value::Bool(true),
                LiteralValue::False => Value::Bool(false),
                LiteralValue::Nil => Value::Nil,
            }),

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Unary { operator, right } => self.evaluate_unary(operator, right),

            Expr::Binary {
                left,
                operator,
                right,
            } => self.evaluate_binary(left, operator, right),

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left_value = self.evaluate(left)?;

                // The deciding operand is returned as-is; the right side is
                // never evaluated in that case.
                let short_circuits = match operator.token_type {
                    TokenType::OR => is_truthy(&left_value),
                    _ => !is_truthy(&left_value),
                };

                if short_circuits {
                    Ok(left_value)
                } else {
                    self.evaluate(right)
                }
            }

            Expr::Ternary {
                condition,
                then_branch,
                else_branch,
            } => {
                if is_truthy(&self.evaluate(condition)?) {
                    self.evaluate(then_branch)
                } else {
                    self.evaluate(else_branch)
                }
            }

            Expr::Comma { left, right } => {
                self.evaluate(left)?;
                self.evaluate(right)
            }

            Expr::Variable { id, name } => self.look_up_variable(*id, name),

            Expr::Assign { id, name, value } => {
                let value = self.evaluate(value)?;

                match self.locals.get(id) {
                    Some(&distance) => {
                        self.environment
                            .borrow_mut()
                            .assign_at(distance, name, value.clone())?;
                    }
                    None => {
                        self.globals.borrow_mut().assign(name, value.clone())?;
                    }
                }

                Ok(value)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee_value = self.evaluate(callee)?;

                let mut argument_values = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    argument_values.push(self.evaluate(argument)?);
                }

                self.call_value(&callee_value, argument_values, paren)
            }

            Expr::Get { object, name } => match self.evaluate(object)? {
                Value::Instance(instance) => LoxInstance::get(&instance, name),
                _ => Err(LoxError::runtime(name, "Only instances have properties.")),
            },

            Expr::Set {
                object,
                name,
                value,
            } => match self.evaluate(object)? {
                Value::Instance(instance) => {
                    let value = self.evaluate(value)?;
                    instance.borrow_mut().set(name.lexeme, value.clone());
                    Ok(value)
                }
                _ => Err(LoxError::runtime(name, "Only instances have fields.")),
            },

            Expr::This { id, keyword } => self.look_up_variable(*id, keyword),
        }
    }

    /// Reads a variable through the resolved slot, or the globals when the
    /// resolver recorded nothing for this occurrence.
    fn look_up_variable(&self, id: ExprId, name: &'a Token<'a>) -> Result<Value<'a>> {
        match self.locals.get(&id) {
            Some(&distance) => self.environment.borrow().get_at(distance, name),
            None => self.globals.borrow().get(name),
        }
    }

    /// Dispatches a call after checking that the callee is callable and the
    /// argument count matches its arity — both before any binding occurs.
    fn call_value(
        &mut self,
        callee: &Value<'a>,
        arguments: Vec<Value<'a>>,
        paren: &'a Token<'a>,
    ) -> Result<Value<'a>> {
        let callable: &dyn Callable<'a> = match callee {
            Value::Function(function) => function.as_ref(),
            Value::Class(class) => class,
            Value::Native(native) => native.as_ref(),
            _ => {
                return Err(LoxError::runtime(
                    paren,
                    "Can only call functions and classes.",
                ));
            }
        };

        if arguments.len() != callable.arity() {
            return Err(LoxError::runtime(
                paren,
                format!(
                    "Expected {} arguments but got {}.",
                    callable.arity(),
                    arguments.len()
                ),
            ));
        }

        callable.call(self, arguments, paren)
    }

    /// Evaluates a unary expression.
    fn evaluate_unary(&mut self, operator: &'a Token<'a>, right: &'a Expr<'a>) -> Result<Value<'a>> {
        let right_value = self.evaluate(right)?;

        match operator.token_type {
            TokenType::MINUS => match right_value {
                Value::Number(n) => Ok(Value::Number(-n)),
                _ => Err(LoxError::runtime(operator, "Operand must be a number.")),
            },

            TokenType::BANG => Ok(Value::Bool(!is_truthy(&right_value))),

            _ => Err(LoxError::runtime(operator, "Invalid unary operator.")),
        }
    }

    /// Evaluates a binary expression (both operands evaluated, left first).
    fn evaluate_binary(
        &mut self,
        left: &'a Expr<'a>,
        operator: &'a Token<'a>,
        right: &'a Expr<'a>,
    ) -> Result<Value<'a>> {
        let left_value = self.evaluate(left)?;
        let right_value = self.evaluate(right)?;

        match operator.token_type {
            TokenType::PLUS => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
                (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),
                // The mixed combinations render the number without a
                // trailing ".0", matching `print`.
                (Value::Number(a), Value::String(b)) => {
                    Ok(Value::String(format!("{}{}", Value::Number(a), b)))
                }
                (Value::String(a), Value::Number(b)) => {
                    Ok(Value::String(format!("{}{}", a, Value::Number(b))))
                }
                _ => Err(LoxError::runtime(
                    operator,
                    "Operands must be numbers or strings.",
                )),
            },

            TokenType::MINUS => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a - b)),
                _ => Err(LoxError::runtime(operator, "Operands must be numbers.")),
            },

            TokenType::STAR => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a * b)),
                _ => Err(LoxError::runtime(operator, "Operands must be numbers.")),
            },

            TokenType::SLASH => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => {
                    if b == 0.0 {
                        Err(LoxError::runtime(operator, "Division by zero."))
                    } else {
                        Ok(Value::Number(a / b))
                    }
                }
                _ => Err(LoxError::runtime(operator, "Operands must be numbers.")),
            },

            TokenType::EQUAL_EQUAL => Ok(Value::Bool(left_value == right_value)),

            TokenType::BANG_EQUAL => Ok(Value::Bool(left_value != right_value)),

            TokenType::GREATER => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a > b)),
                _ => Err(LoxError::runtime(operator, "Operands must be numbers.")),
            },

            TokenType::GREATER_EQUAL => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a >= b)),
                _ => Err(LoxError::runtime(operator, "Operands must be numbers.")),
            },

            TokenType::LESS => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a < b)),
                _ => Err(LoxError::runtime(operator, "Operands must be numbers.")),
            },

            TokenType::LESS_EQUAL => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a <= b)),
                _ => Err(LoxError::runtime(operator, "Operands must be numbers.")),
            },

            _ => Err(LoxError::runtime(operator, "Invalid binary operator.")),
        }
    }
}

/// nil and false are falsey; everything else (including 0 and "") is truthy.
fn is_truthy(value: &Value<'_>) -> bool {
    match value {
        Value::Nil => false,
        Value::Bool(b) => *b,
        _ => true,
    }
}

/// Wall-clock seconds since the Unix epoch; the single native function.
fn clock<'e>(_arguments: &[Value<'e>]) -> std::result::Result<Value<'e>, String> {
    let seconds = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| format!("Clock error: {e}"))?
        .as_secs_f64();

    Ok(Value::Number(seconds))
}

impl Default for Interpreter<'_> {
    fn default() -> Self {
        Interpreter::new(Box::new(io::stdout()), false)
    }
}
