//! Parsing of raw query values into operands.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Operands {
    pub num1: f64,
    pub num2: Option<f64>,
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    /// `num1` absent, empty, or not a number.
    #[error("Invalid input for num1")]
    MissingOrInvalid,

    /// `num2` supplied but not a number.
    #[error("Invalid input for num2")]
    InvalidNumber,
}

/// Parse `num1` (required) and `num2` (optional).
///
/// A literal `"0"` parses to `Some(0.0)` and stays distinct from an absent value.
pub fn validate(num1: Option<&str>, num2: Option<&str>) -> Result<Operands, ValidationError> {
    let num1 = num1
        .and_then(parse_number)
        .ok_or(ValidationError::MissingOrInvalid)?;

    let num2 = match num2 {
        Some(raw) => Some(parse_number(raw).ok_or(ValidationError::InvalidNumber)?),
        None => None,
    };

    Ok(Operands { num1, num2 })
}

fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|n| !n.is_nan())
}
