//! # gwl-core
//!
//! Core types for match-filter likelihood reductions.
//!
//! This crate holds what every backend and every caller agrees on:
//! - the [`Error`] type and [`Result`] alias
//! - the [`BlasStatus`] enumeration reported by device linear-algebra layers
//! - borrowed input views ([`LikelihoodInputs`]) and the per-walker
//!   [`LikelihoodResult`]
//! - the [`LikelihoodBackend`] trait implemented by the CPU and GPU backends
//!
//! ## Architecture
//!
//! The likelihood driver (gwl-inference) depends on the `LikelihoodBackend`
//! trait, NOT on a concrete backend. Both backends are therefore checked
//! against the same property suite through the same abstraction.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod status;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use status::BlasStatus;
pub use traits::LikelihoodBackend;
pub use types::{ChannelLayout, LikelihoodInputs, LikelihoodResult, N_CHANNELS};

/// Complex sample type used by every series.
pub use num_complex::Complex64;
