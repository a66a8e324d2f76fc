//! CPU compute backend
//!
//! This is the backend that MUST work everywhere.
//!
//! Features:
//! - Rayon work-stealing parallelism, one task per walker
//! - SIMD reductions via `wide` (see [`crate::reduce`])
//! - Optional dedicated thread pool (`n_threads > 0`)

use crate::reduce::{complex_dot_product, self_energy};
use gwl_core::{Error, LikelihoodBackend, LikelihoodInputs, N_CHANNELS, Result};
use num_complex::Complex64;
use rayon::prelude::*;

/// Channel-summed cross term and template energy of one walker.
pub fn walker_statistics(inputs: &LikelihoodInputs<'_>, walker: usize) -> (Complex64, f64) {
    let mut cross = Complex64::new(0.0, 0.0);
    let mut energy = 0.0;
    for channel in 0..N_CHANNELS {
        let template = inputs.template(walker, channel);
        cross += complex_dot_product(inputs.data(channel), template);
        energy += self_energy(template);
    }
    (cross, energy)
}

/// Fill `d_h[i] = Re(Σ_c dot(data_c, h_{i,c}))` and `h_h[i] = Σ_c |h_{i,c}|²`
/// for every walker, in parallel on the current Rayon pool.
///
/// Each task writes only its own index, so no locking is needed.
///
/// # Panics
/// Panics if either output length differs from `inputs.n_walkers()`.
pub fn get_likelihood_cpu(inputs: &LikelihoodInputs<'_>, d_h: &mut [f64], h_h: &mut [f64]) {
    let n_walkers = inputs.n_walkers();
    assert_eq!(d_h.len(), n_walkers, "d_h length must equal n_walkers");
    assert_eq!(h_h.len(), n_walkers, "h_h length must equal n_walkers");

    d_h.par_iter_mut().zip(h_h.par_iter_mut()).enumerate().for_each(|(walker, (dh, hh))| {
        let (cross, energy) = walker_statistics(inputs, walker);
        *dh = cross.re;
        *hh = energy;
    });
}

/// CPU compute backend using Rayon for parallelism
pub struct CpuBackend {
    /// Number of threads (0 = automatic)
    pub n_threads: usize,
    pool: Option<rayon::ThreadPool>,
}

impl CpuBackend {
    /// Create a new CPU backend
    pub fn new() -> Self {
        Self { n_threads: 0, pool: None }
    }

    /// Create a CPU backend with specified thread count
    pub fn with_threads(n_threads: usize) -> Self {
        Self { n_threads, pool: None }
    }

    fn pool(&mut self) -> Result<Option<&rayon::ThreadPool>> {
        if self.n_threads == 0 {
            return Ok(None);
        }
        if self.pool.is_none() {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.n_threads)
                .thread_name(|i| format!("gwl-cpu-{i}"))
                .build()
                .map_err(|e| Error::Computation(format!("failed to create thread pool: {e}")))?;
            log::info!("CPU backend: dedicated pool with {} threads", self.n_threads);
            self.pool = Some(pool);
        }
        Ok(self.pool.as_ref())
    }
}

impl Default for CpuBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl LikelihoodBackend for CpuBackend {
    fn compute_into(
        &mut self,
        inputs: &LikelihoodInputs<'_>,
        d_h: &mut [f64],
        h_h: &mut [f64],
    ) -> Result<()> {
        match self.pool()? {
            Some(pool) => pool.install(|| get_likelihood_cpu(inputs, d_h, h_h)),
            None => get_likelihood_cpu(inputs, d_h, h_h),
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "CPU"
    }
}
