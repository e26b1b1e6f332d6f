//!
//! Error type of the CVP engine
//!
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CvpError {
    /// shape of an input does not match the network, or the network itself is malformed.
    /// This is a bug of the caller.
    #[error("invalid {what}: expected {expected}, got {actual}")]
    Validation {
        what: &'static str,
        expected: String,
        actual: String,
    },
    /// no flow satisfies the constraint system
    #[error("infeasible: {0}")]
    Infeasible(String),
    /// the external solver failed for a reason other than infeasibility
    #[error("solver failure: {0}")]
    Solver(String),
}

impl CvpError {
    pub fn validation<E: ToString, A: ToString>(what: &'static str, expected: E, actual: A) -> Self {
        CvpError::Validation {
            what,
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CvpError>;

///
/// Check the length of a vector against the expected number of variables.
///
pub fn check_len(what: &'static str, expected: usize, actual: usize) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(CvpError::validation(
            what,
            format!("length {}", expected),
            format!("length {}", actual),
        ))
    }
}
