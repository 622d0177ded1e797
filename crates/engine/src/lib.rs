//! Calculation engine and the persistence it runs on.
//!
//! [`Calculation`] is the pure arithmetic core. [`Engine`] stores users and
//! their calculations in the database.

pub use calculation::{Calculation, CalculationError, Operation};
pub use calculations::StoredCalculation;
pub use error::EngineError;
pub use ops::{Engine, EngineBuilder};
pub use users::{User, UserNew};

mod calculation;
mod calculations;
mod error;
mod ops;
pub mod password;
mod users;

type ResultEngine<T> = Result<T, EngineError>;
