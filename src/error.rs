//! Error types for the cost engine

use thiserror::Error;

/// Errors surfaced by registry, graph and engine calls.
///
/// All of these are recoverable for the caller: a failed evaluation leaves
/// every other recipe usable.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EconomyError {
    #[error("recipe not found: {0}")]
    RecipeNotFound(String),

    /// The recipe graph loops back to this id on the current path.
    #[error("cyclic dependency through {0}")]
    CyclicDependency(String),

    #[error("material not found: {0}")]
    MaterialNotFound(String),

    #[error("machine not found: {0}")]
    MachineNotFound(String),

    #[error("invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: f64 },

    #[error("invalid catalogue: {0}")]
    InvalidCatalogue(String),
}

pub type EconomyResult<T> = Result<T, EconomyError>;

/// Reject negative and non-finite numbers for fields that must be >= 0.
pub(crate) fn non_negative(field: &'static str, value: f64) -> EconomyResult<f64> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(EconomyError::InvalidValue { field, value })
    }
}
