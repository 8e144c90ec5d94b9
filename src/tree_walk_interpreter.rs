mod environment;

use std::{
    cell::RefCell,
    fmt::{Debug, Display},
    rc::Rc,
};

use crate::{
    ast::{Expression, InfixOperator, Literal, Program, Statement, UnaryOperator},
    tokenizer::Token,
};

pub use self::environment::{Environment, EnvironmentError};

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    String(String),
    Boolean(bool),
    Nil,
}

impl Value {
    /// Only `nil` and `false` are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Nil => false,
            Value::Boolean(b) => *b,
            _ => true,
        }
    }
}

impl From<&Literal> for Value {
    fn from(literal: &Literal) -> Self {
        match literal {
            Literal::Number(n) => Value::Number(*n),
            Literal::String(s) => Value::String(s.clone()),
            Literal::Boolean(b) => Value::Boolean(*b),
            Literal::Nil => Value::Nil,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::String(s) => write!(f, "'{}'", s),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Nil => write!(f, "nil"),
        }
    }
}

/// Integral values drop the fraction. Magnitudes from `1e16` up or below
/// `1e-4` switch to exponent form with a signed, two-digit exponent (`1e+23`).
fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "nan".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let magnitude = n.abs();
    if n == 0.0 || (1e-4..1e16).contains(&magnitude) {
        return n.to_string();
    }

    let scientific = format!("{:e}", n);
    match scientific.split_once('e') {
        Some((mantissa, exponent)) => match exponent.strip_prefix('-') {
            Some(digits) => format!("{mantissa}e-{digits:0>2}"),
            None => format!("{mantissa}e+{exponent:0>2}"),
        },
        None => scientific,
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RuntimeErrorKind {
    #[error("Operand must be a number.")]
    OperandMustBeNumber,
    #[error("Operands must be the numbers.")]
    OperandsMustBeNumbers,
    #[error("Operands must be two numbers or two strings")]
    InvalidAddition,
    #[error("Division by Zero is not allowed")]
    DivisionByZero,
    #[error("Undefined variable '{0}'.")]
    UndefinedVariable(String),
    #[error("Uninitialized variable '{0}'")]
    UninitializedVariable(String),
}

/// A fault while evaluating, tied to the token it happened at.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("[line {}] {kind}", .token.line)]
pub struct RuntimeError {
    pub token: Token,
    pub kind: RuntimeErrorKind,
}

impl RuntimeError {
    pub fn new(token: &Token, kind: RuntimeErrorKind) -> Self {
        Self {
            token: token.clone(),
            kind,
        }
    }

    pub fn message(&self) -> String {
        self.kind.to_string()
    }
}

impl From<EnvironmentError> for RuntimeError {
    fn from(error: EnvironmentError) -> Self {
        match error {
            EnvironmentError::Undefined(token) => {
                let kind = RuntimeErrorKind::UndefinedVariable(token.lexeme.clone());
                Self { token, kind }
            }
            EnvironmentError::Uninitialized(token) => {
                let kind = RuntimeErrorKind::UninitializedVariable(token.lexeme.clone());
                Self { token, kind }
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
    #[error("Failed to write program output: {0}")]
    Output(#[from] std::io::Error),
}

#[derive(Clone)]
pub struct Interpreter {
    environment: Environment,
    stdout: Rc<RefCell<dyn std::io::Write>>,
    echo: bool,
}

impl Debug for Interpreter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interpreter")
            .field("environment", &self.environment)
            .field("echo", &self.echo)
            .finish()
    }
}

impl Interpreter {
    pub fn new(stdout: Rc<RefCell<dyn std::io::Write>>) -> Self {
        Self {
            environment: Environment::new(),
            stdout,
            echo: false,
        }
    }

    /// When set, the value of every bare expression statement is written to
    /// the output as if it had been printed.
    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    /// Runs statements in order, stopping at the first error. Bindings made by
    /// earlier calls stay visible to later ones.
    pub fn interpret(&mut self, program: &Program) -> Result<(), ExecutionError> {
        for stmt in program.0.iter() {
            if let Err(error) = self.execute(stmt) {
                tracing::debug!(%error, statement = ?stmt, "execution stopped");
                return Err(error);
            }
        }

        Ok(())
    }

    fn execute(&mut self, stmt: &Statement) -> Result<(), ExecutionError> {
        match stmt {
            Statement::Expression(expression) => {
                let value = self.evaluate(expression)?;
                if self.echo {
                    writeln!(self.stdout.borrow_mut(), "{}", value)?;
                }
            }
            Statement::Print(expression) => {
                let value = self.evaluate(expression)?;
                writeln!(self.stdout.borrow_mut(), "{}", value)?;
            }
            Statement::VarDeclaration(name, initializer) => match initializer {
                Some(initializer) => {
                    let value = self.evaluate(initializer)?;
                    self.environment.define(&name.lexeme, value);
                }
                None => self.environment.declare(&name.lexeme),
            },
            Statement::Block(statements) => self.execute_in_scope(|_self| {
                for statement in statements.iter() {
                    _self.execute(statement)?;
                }
                Ok(())
            })?,
            Statement::If(condition, then_branch, else_branch) => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute(then_branch)?;
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)?;
                }
            }
        }

        Ok(())
    }

    /// Runs `f` inside a fresh innermost scope, which is dropped again whether
    /// or not `f` fails.
    fn execute_in_scope<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, ExecutionError>,
    ) -> Result<T, ExecutionError> {
        self.environment.push();
        let result = f(self);
        self.environment.pop();
        result
    }

    fn evaluate(&mut self, expression: &Expression) -> Result<Value, RuntimeError> {
        match expression {
            Expression::Literal(literal) => Ok(Value::from(literal)),
            Expression::Grouping(inner) => self.evaluate(inner),
            Expression::Variable(name) => Ok(self.environment.get(name)?),
            Expression::Assign { name, value } => {
                let value = self.evaluate(value)?;
                self.environment.assign(name, value.clone())?;
                Ok(value)
            }
            Expression::Unary {
                operator,
                token,
                right,
            } => {
                let right = self.evaluate(right)?;
                match operator {
                    UnaryOperator::Negate => match right {
                        Value::Number(n) => Ok(Value::Number(-n)),
                        _ => Err(RuntimeError::new(
                            token,
                            RuntimeErrorKind::OperandMustBeNumber,
                        )),
                    },
                    UnaryOperator::Not => Ok(Value::Boolean(!right.is_truthy())),
                }
            }
            Expression::Binary {
                left,
                operator,
                token,
                right,
            } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                binary(*operator, left, right).map_err(|kind| RuntimeError::new(token, kind))
            }
        }
    }
}

fn binary(operator: InfixOperator, left: Value, right: Value) -> Result<Value, RuntimeErrorKind> {
    use InfixOperator::*;

    let value = match (operator, left, right) {
        (Equal, a, b) => Value::Boolean(a == b),
        (NotEqual, a, b) => Value::Boolean(a != b),
        (Plus, Value::Number(a), Value::Number(b)) => Value::Number(a + b),
        (Plus, Value::String(a), Value::String(b)) => Value::String(a + &b),
        (Plus, _, _) => return Err(RuntimeErrorKind::InvalidAddition),
        (Divide, Value::Number(_), Value::Number(b)) if b == 0.0 => {
            return Err(RuntimeErrorKind::DivisionByZero)
        }
        (Divide, Value::Number(a), Value::Number(b)) => Value::Number(a / b),
        (Minus, Value::Number(a), Value::Number(b)) => Value::Number(a - b),
        (Multiply, Value::Number(a), Value::Number(b)) => Value::Number(a * b),
        (LessThan, Value::Number(a), Value::Number(b)) => Value::Boolean(a < b),
        (LessThanOrEqual, Value::Number(a), Value::Number(b)) => Value::Boolean(a <= b),
        (GreaterThan, Value::Number(a), Value::Number(b)) => Value::Boolean(a > b),
        (GreaterThanOrEqual, Value::Number(a), Value::Number(b)) => Value::Boolean(a >= b),
        (
            Minus | Multiply | Divide | LessThan | LessThanOrEqual | GreaterThan
            | GreaterThanOrEqual,
            _,
            _,
        ) => return Err(RuntimeErrorKind::OperandsMustBeNumbers),
    };

    Ok(value)
}
