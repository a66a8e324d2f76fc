//! Status codes of the batched linear-algebra layer.
//!
//! Numeric values follow `cublasStatus_t`. The enumeration is closed: codes
//! the library may add later land in [`BlasStatus::Unknown`].

use std::fmt;

/// Status returned by a device linear-algebra call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlasStatus {
    /// Operation completed.
    Success,
    /// Library handle was not initialized.
    NotInitialized,
    /// Device memory allocation failed.
    AllocFailed,
    /// An argument was rejected.
    InvalidValue,
    /// Feature absent on the device architecture.
    ArchMismatch,
    /// Access to device memory failed.
    MappingError,
    /// Kernel failed to launch or run.
    ExecutionFailed,
    /// Internal library failure.
    InternalError,
    /// Functionality not supported.
    NotSupported,
    /// License check failed.
    LicenseError,
    /// Code outside the known set.
    Unknown(i32),
}

impl BlasStatus {
    /// Map a raw library code to a status.
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Self::Success,
            1 => Self::NotInitialized,
            3 => Self::AllocFailed,
            7 => Self::InvalidValue,
            8 => Self::ArchMismatch,
            11 => Self::MappingError,
            13 => Self::ExecutionFailed,
            14 => Self::InternalError,
            15 => Self::NotSupported,
            16 => Self::LicenseError,
            other => Self::Unknown(other),
        }
    }

    /// Raw library code.
    pub fn code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::NotInitialized => 1,
            Self::AllocFailed => 3,
            Self::InvalidValue => 7,
            Self::ArchMismatch => 8,
            Self::MappingError => 11,
            Self::ExecutionFailed => 13,
            Self::InternalError => 14,
            Self::NotSupported => 15,
            Self::LicenseError => 16,
            Self::Unknown(code) => code,
        }
    }

    /// True only for [`BlasStatus::Success`].
    pub fn is_success(self) -> bool {
        self == Self::Success
    }

    /// Symbolic library name, `"<unknown>"` for codes outside the set.
    pub fn name(self) -> &'static str {
        match self {
            Self::Success => "CUBLAS_STATUS_SUCCESS",
            Self::NotInitialized => "CUBLAS_STATUS_NOT_INITIALIZED",
            Self::AllocFailed => "CUBLAS_STATUS_ALLOC_FAILED",
            Self::InvalidValue => "CUBLAS_STATUS_INVALID_VALUE",
            Self::ArchMismatch => "CUBLAS_STATUS_ARCH_MISMATCH",
            Self::MappingError => "CUBLAS_STATUS_MAPPING_ERROR",
            Self::ExecutionFailed => "CUBLAS_STATUS_EXECUTION_FAILED",
            Self::InternalError => "CUBLAS_STATUS_INTERNAL_ERROR",
            Self::NotSupported => "CUBLAS_STATUS_NOT_SUPPORTED",
            Self::LicenseError => "CUBLAS_STATUS_LICENSE_ERROR",
            Self::Unknown(_) => "<unknown>",
        }
    }
}

impl fmt::Display for BlasStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
