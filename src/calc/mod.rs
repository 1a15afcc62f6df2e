//! Arithmetic evaluation over validated operands.

pub mod validate;

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;

pub use validate::{Operands, ValidationError, validate};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Add,
    Subtract,
    Multiply,
    Divide,
    Exponentiate,
    Sqrt,
    Modulo,
    Factorial,
    Log,
}

impl Operation {
    /// Every operation, in the order the router mounts them.
    pub const ALL: [Operation; 9] = [
        Operation::Add,
        Operation::Subtract,
        Operation::Multiply,
        Operation::Divide,
        Operation::Exponentiate,
        Operation::Sqrt,
        Operation::Modulo,
        Operation::Factorial,
        Operation::Log,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Add => "add",
            Operation::Subtract => "subtract",
            Operation::Multiply => "multiply",
            Operation::Divide => "divide",
            Operation::Exponentiate => "exponentiate",
            Operation::Sqrt => "sqrt",
            Operation::Modulo => "modulo",
            Operation::Factorial => "factorial",
            Operation::Log => "log",
        }
    }

    /// Unary operations never use `num2` in the computation.
    pub fn is_unary(&self) -> bool {
        matches!(self, Operation::Sqrt | Operation::Factorial)
    }

    /// `log` takes an optional base; every other non-unary operation needs `num2`.
    pub fn requires_num2(&self) -> bool {
        !self.is_unary() && *self != Operation::Log
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = UnknownOperation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operation::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| UnknownOperation(s.to_string()))
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown operation: {0}")]
pub struct UnknownOperation(pub String);

/// Domain failures. The display text is what the client sees.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CalcError {
    #[error("Invalid input for num2")]
    MissingOperand,

    #[error("Cannot divide by zero")]
    DivideByZero,

    #[error("Cannot perform modulo by zero")]
    ModuloByZero,

    #[error("Cannot calculate the square root of a negative number")]
    NegativeInput,

    #[error("Factorial requires a non-negative integer")]
    InvalidInput,

    #[error("Cannot calculate logarithm of a non-positive number")]
    NonPositiveInput,

    #[error("Logarithm base must be positive and not equal to 1")]
    InvalidBase,
}

/// Compute `op` over the operands. Pure and deterministic.
pub fn evaluate(op: Operation, num1: f64, num2: Option<f64>) -> Result<f64, CalcError> {
    let rhs = || num2.ok_or(CalcError::MissingOperand);

    match op {
        Operation::Add => Ok(num1 + rhs()?),
        Operation::Subtract => Ok(num1 - rhs()?),
        Operation::Multiply => Ok(num1 * rhs()?),
        Operation::Divide => {
            let divisor = rhs()?;
            if divisor == 0.0 {
                return Err(CalcError::DivideByZero);
            }
            Ok(num1 / divisor)
        }
        Operation::Exponentiate => Ok(num1.powf(rhs()?)),
        Operation::Sqrt => {
            if num1 < 0.0 {
                return Err(CalcError::NegativeInput);
            }
            Ok(num1.sqrt())
        }
        Operation::Modulo => {
            let divisor = rhs()?;
            if divisor == 0.0 {
                return Err(CalcError::ModuloByZero);
            }
            // Truncating remainder: the sign follows the dividend.
            Ok(num1 % divisor)
        }
        Operation::Factorial => factorial(num1),
        Operation::Log => log(num1, num2),
    }
}

fn factorial(n: f64) -> Result<f64, CalcError> {
    if n < 0.0 || !n.is_finite() || n.fract() != 0.0 {
        return Err(CalcError::InvalidInput);
    }

    let mut result = 1.0_f64;
    let mut i = 2.0_f64;
    while i <= n {
        result *= i;
        if result.is_infinite() {
            break;
        }
        i += 1.0;
    }
    Ok(result)
}

fn log(value: f64, base: Option<f64>) -> Result<f64, CalcError> {
    if value <= 0.0 {
        return Err(CalcError::NonPositiveInput);
    }

    match base {
        Some(base) => {
            if base <= 0.0 || base == 1.0 {
                return Err(CalcError::InvalidBase);
            }
            Ok(value.ln() / base.ln())
        }
        None => Ok(value.ln()),
    }
}
