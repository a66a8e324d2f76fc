//! # gwl-compute
//!
//! Compute backends for match-filter likelihood reductions.
//!
//! This crate provides implementations of the `LikelihoodBackend` trait:
//! - **CPU backend** (Rayon + SIMD) - always available
//! - **GPU backend** (batched BLAS per device) - generic over [`blas::BatchedBlas`]
//!   lanes; [`blas::HostBlas`] runs anywhere, `CublasDevice` needs the `cuda`
//!   feature and an NVIDIA GPU at runtime
//!
//! ## Architecture
//!
//! Both backends reduce through the same conjugation convention,
//! `Σ conj(data) · template`, and publish the real part of the
//! channel-summed cross term as `d_h` and the channel-summed template
//! energy as `h_h`. Reduction order differs (sequential/SIMD on CPU, tree
//! order on devices); results agree to relative `1e-9` on well-scaled input.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod blas;
pub mod cpu;
pub mod gpu;
pub mod partition;
pub mod reduce;

pub use blas::{BatchedBlas, HostBlas};
pub use cpu::CpuBackend;
pub use gpu::{DeviceResident, GpuBackend};
pub use partition::DeviceAssignment;

#[cfg(feature = "cuda")]
pub use blas::cuda::CublasDevice;

use std::sync::atomic::{AtomicU8, Ordering};

/// Evaluation mode for the complex reductions.
///
/// Controls the trade-off between numerical precision and speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalMode {
    /// Maximum speed: SIMD where available, naive summation.
    /// Default mode.
    Fast = 0,
    /// Maximum precision: Kahan summation, scalar path, deterministic.
    /// Results are bit-exact between runs.
    Parity = 1,
}

static EVAL_MODE: AtomicU8 = AtomicU8::new(0); // 0 = Fast

/// Set the process-wide evaluation mode.
pub fn set_eval_mode(mode: EvalMode) {
    EVAL_MODE.store(mode as u8, Ordering::Relaxed);
}

/// Get the current evaluation mode.
pub fn eval_mode() -> EvalMode {
    match EVAL_MODE.load(Ordering::Relaxed) {
        1 => EvalMode::Parity,
        _ => EvalMode::Fast,
    }
}

/// Serializes unit tests that switch the process-wide eval mode.
#[cfg(test)]
pub(crate) static EVAL_MODE_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
