//! Core traits for gwlike
//!
//! The likelihood driver talks to backends only through
//! [`LikelihoodBackend`], so the CPU and GPU implementations are
//! interchangeable and testable against the same properties.

use crate::types::{LikelihoodInputs, LikelihoodResult};
use crate::Result;

/// Likelihood reduction backend - abstraction over CPU and device batches
pub trait LikelihoodBackend: Send {
    /// Fill caller-allocated `d_h` / `h_h` (length `n_walkers`) for `inputs`.
    ///
    /// On error the contents of both outputs are undefined.
    ///
    /// # Panics
    /// Implementations panic if an output length differs from `n_walkers`.
    fn compute_into(
        &mut self,
        inputs: &LikelihoodInputs<'_>,
        d_h: &mut [f64],
        h_h: &mut [f64],
    ) -> Result<()>;

    /// Allocate outputs and compute them.
    fn compute(&mut self, inputs: &LikelihoodInputs<'_>) -> Result<LikelihoodResult> {
        let mut result = LikelihoodResult::zeros(inputs.n_walkers());
        self.compute_into(inputs, &mut result.d_h, &mut result.h_h)?;
        Ok(result)
    }

    /// Backend name (e.g., "CPU", "GPU")
    fn name(&self) -> &str;
}
