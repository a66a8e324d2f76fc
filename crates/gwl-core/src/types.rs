//! Common data types for gwlike

use crate::{Error, Result};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Number of detector channels per walker and per dataset.
pub const N_CHANNELS: usize = 3;

/// Borrowed view of one likelihood call's inputs.
///
/// Data series are shared by all walkers. Templates are stored per channel
/// as one flat walker-major buffer: walker `i` occupies
/// `[i * stream_len, (i + 1) * stream_len)`.
#[derive(Debug, Clone, Copy)]
pub struct LikelihoodInputs<'a> {
    data: [&'a [Complex64]; N_CHANNELS],
    templates: [&'a [Complex64]; N_CHANNELS],
    n_walkers: usize,
    stream_len: usize,
}

impl<'a> LikelihoodInputs<'a> {
    /// Validate shapes and build the view.
    pub fn new(
        data: [&'a [Complex64]; N_CHANNELS],
        templates: [&'a [Complex64]; N_CHANNELS],
        n_walkers: usize,
        stream_len: usize,
    ) -> Result<Self> {
        if n_walkers == 0 || stream_len == 0 {
            return Err(Error::Validation("n_walkers and stream_len must be > 0".into()));
        }
        for (c, d) in data.iter().enumerate() {
            if d.len() != stream_len {
                return Err(Error::Validation(format!(
                    "data channel {c} length mismatch: expected {stream_len}, got {}",
                    d.len()
                )));
            }
        }
        let template_len = n_walkers.checked_mul(stream_len).ok_or_else(|| {
            Error::Validation(format!(
                "template length overflows: {n_walkers} walkers x {stream_len} samples"
            ))
        })?;
        for (c, t) in templates.iter().enumerate() {
            if t.len() != template_len {
                return Err(Error::Validation(format!(
                    "template channel {c} length mismatch: expected {template_len}, got {}",
                    t.len()
                )));
            }
        }
        Ok(Self { data, templates, n_walkers, stream_len })
    }

    /// Number of walkers.
    pub fn n_walkers(&self) -> usize {
        self.n_walkers
    }

    /// Samples per channel series.
    pub fn stream_len(&self) -> usize {
        self.stream_len
    }

    /// Data series of `channel`.
    pub fn data(&self, channel: usize) -> &'a [Complex64] {
        self.data[channel]
    }

    /// All three data series.
    pub fn data_channels(&self) -> [&'a [Complex64]; N_CHANNELS] {
        self.data
    }

    /// Template series of `walker` on `channel`.
    pub fn template(&self, walker: usize, channel: usize) -> &'a [Complex64] {
        let start = walker * self.stream_len;
        &self.templates[channel][start..start + self.stream_len]
    }

    /// Contiguous template block for a walker range on `channel`.
    pub fn walker_block(&self, channel: usize, walkers: Range<usize>) -> &'a [Complex64] {
        &self.templates[channel][walkers.start * self.stream_len..walkers.end * self.stream_len]
    }
}

/// Per-walker outputs of one likelihood call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LikelihoodResult {
    /// Cross statistic `Re(Σ_c Σ_k conj(d) h)` per walker.
    pub d_h: Vec<f64>,
    /// Template energy `Σ_c Σ_k |h|²` per walker.
    pub h_h: Vec<f64>,
}

impl LikelihoodResult {
    /// Zero-filled result for `n_walkers` walkers.
    pub fn zeros(n_walkers: usize) -> Self {
        Self { d_h: vec![0.0; n_walkers], h_h: vec![0.0; n_walkers] }
    }

    /// Number of walkers.
    pub fn len(&self) -> usize {
        self.d_h.len()
    }

    /// True when no walkers are held.
    pub fn is_empty(&self) -> bool {
        self.d_h.is_empty()
    }
}

/// Detector channel naming convention.
///
/// Only used for labels; the reduction treats channels as indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelLayout {
    /// Noise-orthogonal `A`, `E`, `T` combinations.
    #[default]
    Aet,
    /// Michelson-like `X`, `Y`, `Z` combinations.
    Xyz,
}

impl ChannelLayout {
    /// Channel labels in index order.
    pub fn labels(self) -> [&'static str; N_CHANNELS] {
        match self {
            Self::Aet => ["A", "E", "T"],
            Self::Xyz => ["X", "Y", "Z"],
        }
    }

    /// Index of a channel label, if it belongs to this layout.
    pub fn index_of(self, label: &str) -> Option<usize> {
        self.labels().iter().position(|l| *l == label)
    }
}
