//! The arithmetic core of the service.
//!
//! A [`Calculation`] pairs an [`Operation`] with the inputs it was created
//! with. Inputs are kept as raw JSON so that a malformed payload (a string, an
//! object, a list holding a non-number) can still be constructed; it is only
//! rejected once the result is requested through [`Calculation::get_result`].
//!
//! ```
//! use engine::Calculation;
//!
//! let calc = Calculation::create("Exponentiation", vec![2.0, 3.0, 2.0]).unwrap();
//! assert_eq!(calc.get_result().unwrap(), 512.0);
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

const NOT_A_LIST: &str = "Inputs must be a list of numbers.";
const MULTIPLICATION_NOT_A_LIST: &str = "Multiplication inputs must be a list of numbers.";
const AT_LEAST_TWO: &str = "Inputs must be a list with at least two numbers.";
const DIVIDE_BY_ZERO: &str = "Cannot divide by zero.";
const EXPONENTIATION_EMPTY: &str = "Exponentiation requires at least two inputs.";
const ZERO_NEGATIVE_EXPONENT: &str = "Cannot raise 0 to a negative exponent.";
const MODULO_ARITY: &str = "Modulo requires at least two inputs.";
const MODULO_BY_ZERO: &str = "Cannot perform modulo by zero.";
const NOT_FINITE: &str = "Result is not a finite number.";

/// Errors raised while creating or evaluating a [`Calculation`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalculationError {
    #[error("Unsupported calculation type: {0}")]
    UnsupportedOperation(String),
    #[error("{0}")]
    Validation(String),
}

impl CalculationError {
    fn validation(message: &str) -> Self {
        Self::Validation(message.to_string())
    }
}

/// The closed set of supported operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Addition,
    Subtraction,
    Multiplication,
    Division,
    Exponentiation,
    Modulo,
}

impl Operation {
    pub const ALL: [Operation; 6] = [
        Self::Addition,
        Self::Subtraction,
        Self::Multiplication,
        Self::Division,
        Self::Exponentiation,
        Self::Modulo,
    ];

    /// Tag stored in the `type` column.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Addition => "addition",
            Self::Subtraction => "subtraction",
            Self::Multiplication => "multiplication",
            Self::Division => "division",
            Self::Exponentiation => "exponentiation",
            Self::Modulo => "modulo",
        }
    }
}

impl core::fmt::Display for Operation {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Operation {
    type Error = CalculationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lowered = value.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|op| op.as_str() == lowered)
            .ok_or_else(|| CalculationError::UnsupportedOperation(value.to_string()))
    }
}

/// An operation applied to an ordered list of inputs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Calculation {
    operation: Operation,
    inputs: Value,
}

impl Calculation {
    /// Build a calculation for a known operation. Inputs are not validated.
    pub fn new(operation: Operation, inputs: impl Into<Value>) -> Self {
        Self {
            operation,
            inputs: inputs.into(),
        }
    }

    /// Resolve `operation` case-insensitively and build the calculation.
    ///
    /// Only the operation name is checked here; arity and element types are
    /// validated by [`Calculation::get_result`].
    pub fn create(operation: &str, inputs: impl Into<Value>) -> Result<Self, CalculationError> {
        Ok(Self::new(Operation::try_from(operation)?, inputs))
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn inputs(&self) -> &Value {
        &self.inputs
    }

    /// Evaluate the calculation.
    ///
    /// Results that are not finite (NaN, infinities) are rejected.
    pub fn get_result(&self) -> Result<f64, CalculationError> {
        let result = self.evaluate()?;
        if !result.is_finite() {
            return Err(CalculationError::validation(NOT_FINITE));
        }
        Ok(result)
    }

    fn evaluate(&self) -> Result<f64, CalculationError> {
        match self.operation {
            Operation::Addition => {
                let xs = numbers(&self.inputs, NOT_A_LIST)?;
                Ok(xs.iter().sum())
            }
            Operation::Subtraction => {
                let xs = numbers(&self.inputs, NOT_A_LIST)?;
                let (first, rest) = at_least_two(&xs)?;
                Ok(rest.iter().fold(first, |acc, x| acc - x))
            }
            Operation::Multiplication => {
                let xs = numbers(&self.inputs, MULTIPLICATION_NOT_A_LIST)?;
                Ok(xs.iter().product())
            }
            Operation::Division => {
                let xs = numbers(&self.inputs, NOT_A_LIST)?;
                let (first, rest) = at_least_two(&xs)?;
                rest.iter().try_fold(first, |acc, &x| {
                    if x == 0.0 {
                        return Err(CalculationError::validation(DIVIDE_BY_ZERO));
                    }
                    Ok(acc / x)
                })
            }
            Operation::Exponentiation => {
                let xs = numbers(&self.inputs, NOT_A_LIST)?;
                if xs.is_empty() {
                    return Err(CalculationError::validation(EXPONENTIATION_EMPTY));
                }
                at_least_two(&xs)?;
                power_tower(&xs)
            }
            Operation::Modulo => {
                let xs = numbers(&self.inputs, NOT_A_LIST)?;
                let (first, rest) = at_least_two(&xs)
                    .map_err(|_| CalculationError::validation(MODULO_ARITY))?;
                rest.iter().try_fold(first, |acc, &x| {
                    if x == 0.0 {
                        return Err(CalculationError::validation(MODULO_BY_ZERO));
                    }
                    Ok(floored_rem(acc, x))
                })
            }
        }
    }
}

/// Read the inputs as a list of numbers or fail with `not_a_list`.
fn numbers(inputs: &Value, not_a_list: &str) -> Result<Vec<f64>, CalculationError> {
    let items = inputs
        .as_array()
        .ok_or_else(|| CalculationError::validation(not_a_list))?;
    items
        .iter()
        .map(|item| {
            item.as_f64()
                .ok_or_else(|| CalculationError::validation(not_a_list))
        })
        .collect()
}

fn at_least_two(xs: &[f64]) -> Result<(f64, &[f64]), CalculationError> {
    match xs {
        [first, rest @ ..] if !rest.is_empty() => Ok((*first, rest)),
        _ => Err(CalculationError::validation(AT_LEAST_TWO)),
    }
}

/// Remainder taking the sign of the divisor, so `-7 % 3 == 2`.
fn floored_rem(dividend: f64, divisor: f64) -> f64 {
    let rem = dividend % divisor;
    if rem != 0.0 && (rem < 0.0) != (divisor < 0.0) {
        rem + divisor
    } else {
        rem
    }
}

/// Right-associative `x0 ** (x1 ** (... ** xn))`, folded from the last element.
fn power_tower(xs: &[f64]) -> Result<f64, CalculationError> {
    let Some((&last, bases)) = xs.split_last() else {
        return Err(CalculationError::validation(EXPONENTIATION_EMPTY));
    };
    bases.iter().rev().try_fold(last, |exponent, &base| {
        if base == 0.0 && exponent < 0.0 {
            return Err(CalculationError::validation(ZERO_NEGATIVE_EXPONENT));
        }
        Ok(base.powf(exponent))
    })
}
