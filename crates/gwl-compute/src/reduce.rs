//! Complex inner-product kernels (the elemental reduction of every backend).
//!
//! Convention: `dot(a, b) = Σ_k conj(a[k]) · b[k]`, with `a` the data series
//! and `b` the template. The self-energy `Σ_k |a[k]|²` is the real part of
//! `dot(a, a)` and is computed without the (zero) imaginary half.
//!
//! Uses `wide::f64x4` over two interleaved complex samples per lane group.
//! Automatically dispatches to AVX2 on x86_64 and NEON on aarch64.

use crate::{EvalMode, eval_mode};
use num_complex::Complex64;
use wide::f64x4;

/// Below this length the tree reduction sums sequentially.
const PAIRWISE_BLOCK: usize = 16;

/// Load two consecutive complex samples as `[re0, im0, re1, im1]`.
#[inline(always)]
fn load2(s: &[Complex64], k: usize) -> f64x4 {
    f64x4::from([s[k].re, s[k].im, s[k + 1].re, s[k + 1].im])
}

/// Load two consecutive complex samples with re/im swapped: `[im0, re0, im1, re1]`.
#[inline(always)]
fn load2_swapped(s: &[Complex64], k: usize) -> f64x4 {
    f64x4::from([s[k].im, s[k].re, s[k + 1].im, s[k + 1].re])
}

#[inline(always)]
fn check_pair(a: &[Complex64], b: &[Complex64]) {
    assert_eq!(a.len(), b.len(), "complex series lengths must match");
    assert!(!a.is_empty(), "complex series must be non-empty");
}

/// Conjugated complex dot product `Σ conj(a[k]) · b[k]`.
///
/// Dispatches on [`eval_mode`]: `Fast` uses SIMD when the host supports it,
/// `Parity` uses compensated summation.
///
/// # Panics
/// Panics if `a.len() != b.len()` or the series are empty.
pub fn complex_dot_product(a: &[Complex64], b: &[Complex64]) -> Complex64 {
    match eval_mode() {
        EvalMode::Parity => complex_dot_kahan(a, b),
        EvalMode::Fast if use_simd() => complex_dot_simd(a, b),
        EvalMode::Fast => complex_dot_scalar(a, b),
    }
}

/// Template energy `Σ |a[k]|²`, dispatched like [`complex_dot_product`].
///
/// # Panics
/// Panics if `a` is empty.
pub fn self_energy(a: &[Complex64]) -> f64 {
    match eval_mode() {
        EvalMode::Parity => self_energy_kahan(a),
        EvalMode::Fast if use_simd() => self_energy_simd(a),
        EvalMode::Fast => self_energy_scalar(a),
    }
}

/// Scalar reference implementation (sequential order).
pub fn complex_dot_scalar(a: &[Complex64], b: &[Complex64]) -> Complex64 {
    check_pair(a, b);
    let mut sum = Complex64::new(0.0, 0.0);
    for (ai, bi) in a.iter().zip(b.iter()) {
        sum += ai.conj() * bi;
    }
    sum
}

/// SIMD implementation: two complex samples per `f64x4`.
///
/// `re` accumulates `[ar·br, ai·bi, ...]` and sums every lane; `im`
/// accumulates `a · swap(b) = [ar·bi, ai·br, ...]` and takes even minus odd
/// lanes.
pub fn complex_dot_simd(a: &[Complex64], b: &[Complex64]) -> Complex64 {
    check_pair(a, b);
    let n = a.len();
    let pairs = n / 2;

    let mut acc_re = f64x4::ZERO;
    let mut acc_im = f64x4::ZERO;
    for i in 0..pairs {
        let k = 2 * i;
        let av = load2(a, k);
        acc_re += av * load2(b, k);
        acc_im += av * load2_swapped(b, k);
    }

    let im_lanes: [f64; 4] = acc_im.into();
    let mut sum =
        Complex64::new(acc_re.reduce_add(), (im_lanes[0] - im_lanes[1]) + (im_lanes[2] - im_lanes[3]));

    if n % 2 == 1 {
        sum += a[n - 1].conj() * b[n - 1];
    }
    sum
}

/// Kahan-compensated scalar implementation (real and imaginary parts
/// compensated independently).
pub fn complex_dot_kahan(a: &[Complex64], b: &[Complex64]) -> Complex64 {
    check_pair(a, b);
    let mut re = KahanSum::default();
    let mut im = KahanSum::default();
    for (ai, bi) in a.iter().zip(b.iter()) {
        let term = ai.conj() * bi;
        re.add(term.re);
        im.add(term.im);
    }
    Complex64::new(re.value(), im.value())
}

/// Tree-order implementation, the summation order of a device reduction.
pub fn complex_dot_pairwise(a: &[Complex64], b: &[Complex64]) -> Complex64 {
    check_pair(a, b);
    pairwise_dot(a, b)
}

fn pairwise_dot(a: &[Complex64], b: &[Complex64]) -> Complex64 {
    if a.len() <= PAIRWISE_BLOCK {
        let mut sum = Complex64::new(0.0, 0.0);
        for (ai, bi) in a.iter().zip(b.iter()) {
            sum += ai.conj() * bi;
        }
        return sum;
    }
    let mid = a.len() / 2;
    pairwise_dot(&a[..mid], &b[..mid]) + pairwise_dot(&a[mid..], &b[mid..])
}

/// Scalar self-energy.
pub fn self_energy_scalar(a: &[Complex64]) -> f64 {
    assert!(!a.is_empty(), "complex series must be non-empty");
    a.iter().map(|v| v.norm_sqr()).sum()
}

/// SIMD self-energy.
pub fn self_energy_simd(a: &[Complex64]) -> f64 {
    assert!(!a.is_empty(), "complex series must be non-empty");
    let n = a.len();
    let mut acc = f64x4::ZERO;
    for i in 0..n / 2 {
        let av = load2(a, 2 * i);
        acc += av * av;
    }
    let mut total = acc.reduce_add();
    if n % 2 == 1 {
        total += a[n - 1].norm_sqr();
    }
    total
}

/// Kahan-compensated self-energy.
pub fn self_energy_kahan(a: &[Complex64]) -> f64 {
    assert!(!a.is_empty(), "complex series must be non-empty");
    let mut acc = KahanSum::default();
    for v in a {
        acc.add(v.norm_sqr());
    }
    acc.value()
}

/// Tree-order self-energy.
pub fn self_energy_pairwise(a: &[Complex64]) -> f64 {
    assert!(!a.is_empty(), "complex series must be non-empty");
    pairwise_energy(a)
}

fn pairwise_energy(a: &[Complex64]) -> f64 {
    if a.len() <= PAIRWISE_BLOCK {
        return a.iter().map(|v| v.norm_sqr()).sum();
    }
    let mid = a.len() / 2;
    pairwise_energy(&a[..mid]) + pairwise_energy(&a[mid..])
}

#[derive(Default)]
struct KahanSum {
    sum: f64,
    comp: f64,
}

impl KahanSum {
    #[inline(always)]
    fn add(&mut self, x: f64) {
        let y = x - self.comp;
        let t = self.sum + y;
        self.comp = (t - self.sum) - y;
        self.sum = t;
    }

    #[inline(always)]
    fn value(&self) -> f64 {
        self.sum
    }
}

/// Check if SIMD should be used on the current platform.
#[inline(always)]
fn use_simd() -> bool {
    #[cfg(target_arch = "x86_64")]
    {
        is_x86_feature_detected!("avx2")
    }
    #[cfg(target_arch = "aarch64")]
    {
        // NEON is always available on aarch64
        true
    }
    #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
    {
        false
    }
}
