//! Device batched-BLAS lanes.
//!
//! A lane is one device together with the handle and stream that drive it.
//! [`BatchedBlas`] is the minimal surface the device backend needs: upload,
//! two batched conjugated dot products, download, synchronize. Every call
//! reports a [`BlasStatus`] so the backend can name the failure.
//!
//! The trait is always available (no feature gate) so the reduction logic in
//! [`crate::gpu`] can be tested on [`HostBlas`] without a device.

use gwl_core::BlasStatus;
use num_complex::Complex64;

mod host;
pub use host::HostBlas;

#[cfg(feature = "cuda")]
pub mod cuda;

/// One device lane of a batched linear-algebra library.
pub trait BatchedBlas: Send {
    /// Device-resident buffer of complex samples.
    type Buffer: Send + Sync;

    /// Device id this lane runs on.
    fn device_id(&self) -> usize;

    /// Copy a host series into a new device buffer.
    fn upload(&mut self, host: &[Complex64]) -> Result<Self::Buffer, BlasStatus>;

    /// Allocate a zeroed device buffer of `len` samples.
    fn alloc_zeros(&mut self, len: usize) -> Result<Self::Buffer, BlasStatus>;

    /// `out[j] = Σ_k conj(x[k]) · ys[j·len + k]` for `j < batch`.
    ///
    /// When `accumulate` is set the result is added to `out` instead of
    /// overwriting it.
    fn dotc_broadcast(
        &mut self,
        x: &Self::Buffer,
        ys: &Self::Buffer,
        len: usize,
        batch: usize,
        out: &mut Self::Buffer,
        accumulate: bool,
    ) -> Result<(), BlasStatus>;

    /// `out[j] = Σ_k |ys[j·len + k]|²` for `j < batch` (real, stored as complex).
    fn dotc_self(
        &mut self,
        ys: &Self::Buffer,
        len: usize,
        batch: usize,
        out: &mut Self::Buffer,
        accumulate: bool,
    ) -> Result<(), BlasStatus>;

    /// Copy a device buffer back into `host` (`host.len()` samples).
    fn download(&mut self, buf: &Self::Buffer, host: &mut [Complex64]) -> Result<(), BlasStatus>;

    /// Block until all queued work on this lane has finished.
    fn synchronize(&mut self) -> Result<(), BlasStatus>;
}
