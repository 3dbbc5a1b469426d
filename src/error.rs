//! Error types shared across the crate.

use thiserror::Error;

/// Errors raised by lattice construction, wavefunction evaluation and training.
#[derive(Debug, Error)]
pub enum VmcError {
    /// Non-positive sizes, rates or otherwise unusable run parameters.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A batch or sequence does not have the shape the operation requires.
    #[error("shape mismatch in {what}: expected {expected}, found {found}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    /// Non-finite loss, gradient or probability.
    #[error("numerical instability: {0}")]
    NumericalInstability(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, VmcError>;
