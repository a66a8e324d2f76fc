//! Per-walker likelihood driver.
//!
//! The driver owns the (whitened) data series and one backend. Each call
//! takes a flat template batch per channel and publishes `d_h` / `h_h` per
//! walker; the Gaussian negative log-likelihood is
//! `d_d + h_h - 2 d_h`, with `d_d` the data self-energy computed once.

use crate::config::{LikelihoodConfig, build_backend};
use crate::weighting;
use gwl_compute::reduce::self_energy;
use gwl_core::{
    ChannelLayout, Error, LikelihoodBackend, LikelihoodInputs, LikelihoodResult, N_CHANNELS,
    Result,
};
use num_complex::Complex64;
use std::time::Instant;

/// Data series plus a likelihood backend.
pub struct LikelihoodDriver {
    backend: Box<dyn LikelihoodBackend>,
    data: [Vec<Complex64>; N_CHANNELS],
    layout: ChannelLayout,
    log_scaled: bool,
    weights: Option<[Vec<f64>; N_CHANNELS]>,
    d_d: f64,
}

impl LikelihoodDriver {
    /// Build a driver around `backend`. All three data series must share one
    /// non-zero length.
    pub fn new(
        backend: Box<dyn LikelihoodBackend>,
        data: [Vec<Complex64>; N_CHANNELS],
        layout: ChannelLayout,
    ) -> Result<Self> {
        let stream_len = data[0].len();
        if stream_len == 0 {
            return Err(Error::Validation("data series are empty".into()));
        }
        let labels = layout.labels();
        for (c, d) in data.iter().enumerate() {
            if d.len() != stream_len {
                return Err(Error::Validation(format!(
                    "data channel {} has {} samples, expected {stream_len}",
                    labels[c],
                    d.len()
                )));
            }
        }
        let d_d = data_self_energy(&data);
        log::debug!(
            "likelihood driver: backend={} stream_len={stream_len} channels={:?} d_d={d_d:.6e}",
            backend.name(),
            labels
        );
        let log_scaled = LikelihoodConfig::default().log_scaled;
        Ok(Self { backend, data, layout, log_scaled, weights: None, d_d })
    }

    /// Pick the backend and reduction mode from `config`.
    ///
    /// The reduction mode is process-wide and affects every backend.
    pub fn from_config(config: &LikelihoodConfig, data: [Vec<Complex64>; N_CHANNELS]) -> Result<Self> {
        config.validate()?;
        gwl_compute::set_eval_mode(config.eval_mode.into());
        let backend = build_backend(config)?;
        let mut driver = Self::new(backend, data, config.channels)?;
        driver.log_scaled = config.log_scaled;
        Ok(driver)
    }

    /// Whiten with weights built from the inverse ASD of each channel on
    /// the grid `freqs` (see [`weighting::noise_weights`]). The `sqrt(Δf)`
    /// factor is applied when the driver is log-scaled (the default, or
    /// `log_scaled` from the configuration).
    pub fn with_asd_inverse(self, freqs: &[f64], asd_inv: [&[f64]; N_CHANNELS]) -> Result<Self> {
        let [w0, w1, w2] = [
            weighting::noise_weights(freqs, asd_inv[0], self.log_scaled)?,
            weighting::noise_weights(freqs, asd_inv[1], self.log_scaled)?,
            weighting::noise_weights(freqs, asd_inv[2], self.log_scaled)?,
        ];
        self.with_noise_weights([&w0, &w1, &w2])
    }

    /// Whiten the data with per-channel noise weights and refresh `d_d`.
    ///
    /// The weights are kept; templates passed to [`Self::evaluate`] must be
    /// weighted the same way, e.g. with [`Self::apply_noise_weights`].
    pub fn with_noise_weights(mut self, weights: [&[f64]; N_CHANNELS]) -> Result<Self> {
        let labels = self.layout.labels();
        for (c, w) in weights.iter().enumerate() {
            if w.len() != self.stream_len() {
                return Err(Error::Validation(format!(
                    "noise weights for channel {} have {} bins, expected {}",
                    labels[c],
                    w.len(),
                    self.stream_len()
                )));
            }
        }
        for (series, w) in self.data.iter_mut().zip(weights) {
            weighting::whiten(series, w);
        }
        self.d_d = data_self_energy(&self.data);
        self.weights = Some(weights.map(|w| w.to_vec()));
        Ok(self)
    }

    /// Noise weights the data was whitened with, if any.
    pub fn noise_weights(&self) -> Option<[&[f64]; N_CHANNELS]> {
        self.weights.as_ref().map(|[w0, w1, w2]| [&w0[..], &w1[..], &w2[..]])
    }

    /// Weight flat walker-major templates with the stored noise weights,
    /// walker by walker. A no-op when the data was never whitened.
    pub fn apply_noise_weights(&self, templates: [&mut [Complex64]; N_CHANNELS]) -> Result<()> {
        let stream_len = self.stream_len();
        let labels = self.layout.labels();
        for (c, t) in templates.iter().enumerate() {
            if t.len() % stream_len != 0 {
                return Err(Error::Validation(format!(
                    "templates for channel {} have {} samples, not a multiple of {stream_len}",
                    labels[c],
                    t.len()
                )));
            }
        }
        let Some(weights) = &self.weights else {
            return Ok(());
        };
        for (t, w) in templates.into_iter().zip(weights) {
            for walker in t.chunks_exact_mut(stream_len) {
                weighting::whiten(walker, w);
            }
        }
        Ok(())
    }

    /// Samples per channel.
    pub fn stream_len(&self) -> usize {
        self.data[0].len()
    }

    /// Data series of `channel`.
    pub fn data(&self, channel: usize) -> &[Complex64] {
        &self.data[channel]
    }

    /// Data series by channel label (`"A"`, `"E"`, `"T"` or `"X"`, `"Y"`, `"Z"`).
    pub fn data_by_label(&self, label: &str) -> Option<&[Complex64]> {
        self.layout.index_of(label).map(|c| self.data(c))
    }

    /// `Σ_c Σ_k |d_c[k]|²`.
    pub fn d_d(&self) -> f64 {
        self.d_d
    }

    /// Name of the active backend.
    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// `d_h` / `h_h` for `n_walkers` templates (flat, walker-major per channel).
    pub fn evaluate(
        &mut self,
        templates: [&[Complex64]; N_CHANNELS],
        n_walkers: usize,
    ) -> Result<LikelihoodResult> {
        let mut result = LikelihoodResult::zeros(n_walkers);
        self.evaluate_into(templates, n_walkers, &mut result.d_h, &mut result.h_h)?;
        Ok(result)
    }

    /// Like [`Self::evaluate`] into caller-owned buffers.
    pub fn evaluate_into(
        &mut self,
        templates: [&[Complex64]; N_CHANNELS],
        n_walkers: usize,
        d_h: &mut [f64],
        h_h: &mut [f64],
    ) -> Result<()> {
        if d_h.len() != n_walkers || h_h.len() != n_walkers {
            return Err(Error::Validation(format!(
                "output buffers have {} / {} slots for {n_walkers} walkers",
                d_h.len(),
                h_h.len()
            )));
        }
        let inputs = LikelihoodInputs::new(
            [&self.data[0], &self.data[1], &self.data[2]],
            templates,
            n_walkers,
            self.stream_len(),
        )?;

        let start = Instant::now();
        self.backend.compute_into(&inputs, d_h, h_h)?;
        log::debug!(
            "{}: {n_walkers} walkers x {} samples in {:?}",
            self.backend.name(),
            self.stream_len(),
            start.elapsed()
        );
        Ok(())
    }

    /// `d_d + h_h - 2 d_h` per walker.
    pub fn neg_log_likelihood(&self, result: &LikelihoodResult) -> Vec<f64> {
        result.d_h.iter().zip(&result.h_h).map(|(dh, hh)| self.d_d + hh - 2.0 * dh).collect()
    }

    /// Evaluate and return the negative log-likelihood per walker.
    pub fn evaluate_nll(
        &mut self,
        templates: [&[Complex64]; N_CHANNELS],
        n_walkers: usize,
    ) -> Result<Vec<f64>> {
        let result = self.evaluate(templates, n_walkers)?;
        Ok(self.neg_log_likelihood(&result))
    }
}

fn data_self_energy(data: &[Vec<Complex64>; N_CHANNELS]) -> f64 {
    data.iter().map(|d| self_energy(d)).sum()
}
