//! Error types for gwlike

use crate::status::BlasStatus;
use thiserror::Error;

/// gwlike error type
#[derive(Error, Debug)]
pub enum Error {
    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Computation error
    #[error("Computation error: {0}")]
    Computation(String),

    /// A device linear-algebra call returned a non-success status.
    ///
    /// Outputs for the walkers assigned to `device` are undefined after this.
    #[error("Backend error on device {device} during {operation}: {status}")]
    Backend {
        /// Device id the failing lane runs on.
        device: usize,
        /// Name of the lane operation that failed.
        operation: &'static str,
        /// Status reported by the library.
        status: BlasStatus,
    },

    /// Not implemented
    #[error("Not implemented: {0}")]
    NotImplemented(String),
}

impl Error {
    /// Build a [`Error::Backend`] for `device` / `operation`.
    pub fn backend(device: usize, operation: &'static str, status: BlasStatus) -> Self {
        Self::Backend { device, operation, status }
    }

    /// Status carried by a backend error, if any.
    pub fn status(&self) -> Option<BlasStatus> {
        match self {
            Self::Backend { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
