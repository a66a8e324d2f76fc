//! # gwl-inference
//!
//! Likelihood driver for match-filter parameter searches.
//!
//! This crate provides:
//! - [`LikelihoodDriver`]: owns the data series and a backend, publishes
//!   `d_h` / `h_h` per walker and the negative log-likelihood
//! - [`LikelihoodConfig`]: backend selection and reduction settings
//! - [`weighting`]: noise weighting of frequency-domain series
//!
//! ## Architecture
//!
//! The driver depends on the `LikelihoodBackend` trait from gwl-core, NOT
//! on a concrete backend. The concrete backend is picked once from the
//! configuration by [`build_backend`].

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Backend selection and reduction settings.
pub mod config;
/// Per-walker likelihood driver.
pub mod driver;
/// Noise weighting of frequency-domain series.
pub mod weighting;

pub use config::{BackendKind, LikelihoodConfig, ReductionMode, build_backend};
pub use driver::LikelihoodDriver;
