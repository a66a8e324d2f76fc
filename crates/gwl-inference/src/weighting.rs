//! Noise weighting of frequency-domain series.
//!
//! A series is whitened by multiplying each bin with `1 / ASD(f)`. On a
//! non-uniform (log-spaced) grid each bin is additionally scaled by
//! `sqrt(Δf)`, so that `Σ |x|²` approximates the noise-weighted integral.
//! The first bin has no left neighbour and reuses the second bin's spacing.

use gwl_core::{Error, Result};
use num_complex::Complex64;

/// `sqrt(f[k] - f[k-1])` per bin, with bin 0 taking bin 1's value.
///
/// A single-bin grid gets a factor of `1.0`.
pub fn frequency_spacing_factor(freqs: &[f64]) -> Result<Vec<f64>> {
    if freqs.is_empty() {
        return Err(Error::Validation("frequency grid is empty".into()));
    }
    if freqs.len() == 1 {
        return Ok(vec![1.0]);
    }

    let mut out = Vec::with_capacity(freqs.len());
    out.push(0.0);
    for (k, pair) in freqs.windows(2).enumerate() {
        let df = pair[1] - pair[0];
        if !(df > 0.0) || !df.is_finite() {
            return Err(Error::Validation(format!(
                "frequency grid must be strictly increasing (bin {}: {} -> {})",
                k + 1,
                pair[0],
                pair[1]
            )));
        }
        out.push(df.sqrt());
    }
    out[0] = out[1];
    Ok(out)
}

/// Per-bin weights from the inverse amplitude spectral density.
///
/// With `log_scaled` the weights include [`frequency_spacing_factor`].
pub fn noise_weights(freqs: &[f64], asd_inv: &[f64], log_scaled: bool) -> Result<Vec<f64>> {
    if freqs.len() != asd_inv.len() {
        return Err(Error::Validation(format!(
            "ASD length mismatch: {} frequencies, {} ASD values",
            freqs.len(),
            asd_inv.len()
        )));
    }
    if let Some(k) = asd_inv.iter().position(|w| !w.is_finite() || *w < 0.0) {
        return Err(Error::Validation(format!("ASD inverse at bin {k} is {}", asd_inv[k])));
    }
    if !log_scaled {
        return Ok(asd_inv.to_vec());
    }
    let spacing = frequency_spacing_factor(freqs)?;
    Ok(asd_inv.iter().zip(&spacing).map(|(w, s)| w * s).collect())
}

/// Multiply `series` bin by bin with `weights`.
///
/// # Panics
/// If the lengths differ.
pub fn whiten(series: &mut [Complex64], weights: &[f64]) {
    assert_eq!(series.len(), weights.len(), "series and weights lengths must match");
    for (v, w) in series.iter_mut().zip(weights) {
        *v *= *w;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_spacing_factor_uniform_grid() {
        let f = frequency_spacing_factor(&[1.0, 5.0, 9.0, 13.0]).unwrap();
        assert_eq!(f, vec![2.0; 4]);
    }

    #[test]
    fn test_spacing_factor_log_grid() {
        let freqs = [1e-4, 1e-3, 1e-2];
        let f = frequency_spacing_factor(&freqs).unwrap();
        assert_relative_eq!(f[1], (9e-4f64).sqrt(), epsilon = 1e-15);
        assert_relative_eq!(f[2], (9e-3f64).sqrt(), epsilon = 1e-15);
        assert_eq!(f[0], f[1]);
    }

    #[test]
    fn test_spacing_factor_edge_cases() {
        assert_eq!(frequency_spacing_factor(&[3.0]).unwrap(), vec![1.0]);
        assert!(frequency_spacing_factor(&[]).is_err());
        assert!(frequency_spacing_factor(&[1.0, 1.0]).is_err());
        assert!(frequency_spacing_factor(&[2.0, 1.0]).is_err());
        assert!(frequency_spacing_factor(&[1.0, f64::NAN]).is_err());
    }

    #[test]
    fn test_noise_weights() {
        let freqs = [1.0, 2.0, 6.0];
        let asd_inv = [10.0, 20.0, 30.0];
        assert_eq!(noise_weights(&freqs, &asd_inv, false).unwrap(), asd_inv.to_vec());
        let w = noise_weights(&freqs, &asd_inv, true).unwrap();
        assert_relative_eq!(w[0], 10.0, epsilon = 1e-12);
        assert_relative_eq!(w[1], 20.0, epsilon = 1e-12);
        assert_relative_eq!(w[2], 60.0, epsilon = 1e-12);
    }

    #[test]
    fn test_noise_weights_validation() {
        assert!(noise_weights(&[1.0, 2.0], &[1.0], true).is_err());
        assert!(noise_weights(&[1.0, 2.0], &[1.0, -1.0], false).is_err());
        assert!(noise_weights(&[1.0, 2.0], &[1.0, f64::INFINITY], false).is_err());
    }

    #[test]
    fn test_whiten() {
        let mut s = vec![Complex64::new(1.0, -1.0), Complex64::new(0.5, 2.0)];
        whiten(&mut s, &[2.0, 0.0]);
        assert_eq!(s, vec![Complex64::new(2.0, -2.0), Complex64::new(0.0, 0.0)]);
    }

    #[test]
    #[should_panic(expected = "lengths must match")]
    fn test_whiten_length_mismatch() {
        let mut s = vec![Complex64::new(1.0, 0.0)];
        whiten(&mut s, &[1.0, 2.0]);
    }
}
