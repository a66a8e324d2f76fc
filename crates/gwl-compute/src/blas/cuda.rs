//! cuBLAS lane for one NVIDIA device (requires `cuda` feature + GPU at runtime).
//!
//! `dotc_broadcast` is a single ZGEMM, `Aᴴ · B` with `A` the data column
//! (`len × 1`) and `B` the template block (`len × batch`, column per walker),
//! giving a `1 × batch` row of cross terms. `dotc_self` is one strided
//! batched ZGEMM with `m = n = 1`, one `Tᴴ · T` per walker. `beta = 1`
//! accumulates channels on the device.

#![cfg(feature = "cuda")]

use super::BatchedBlas;
use core::ffi::c_int;
use cudarc::cublas::{CudaBlas, sys as cublas_sys};
use cudarc::driver::{
    CudaContext, CudaSlice, CudaStream, DevicePtr, DevicePtrMut, DeviceRepr, ValidAsZeroBits,
};
use gwl_core::{BlasStatus, Error};
use num_complex::Complex64;
use std::sync::Arc;

/// `cuDoubleComplex` layout (`double2`).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GpuComplex {
    /// Real part.
    pub re: f64,
    /// Imaginary part.
    pub im: f64,
}

unsafe impl DeviceRepr for GpuComplex {}
unsafe impl ValidAsZeroBits for GpuComplex {}

impl From<Complex64> for GpuComplex {
    fn from(v: Complex64) -> Self {
        Self { re: v.re, im: v.im }
    }
}

impl From<GpuComplex> for Complex64 {
    fn from(v: GpuComplex) -> Self {
        Complex64::new(v.re, v.im)
    }
}

const ONE: GpuComplex = GpuComplex { re: 1.0, im: 0.0 };
const ZERO: GpuComplex = GpuComplex { re: 0.0, im: 0.0 };

fn cuda_err(msg: impl std::fmt::Display) -> Error {
    Error::Computation(format!("CUDA: {msg}"))
}

/// cuBLAS dimension or leading dimension, rejecting values past `c_int`.
fn dim(value: usize) -> Result<c_int, BlasStatus> {
    c_int::try_from(value).map_err(|_| BlasStatus::InvalidValue)
}

fn check(status: cublas_sys::cublasStatus_t) -> Result<(), BlasStatus> {
    match BlasStatus::from_code(status as i32) {
        BlasStatus::Success => Ok(()),
        other => Err(other),
    }
}

/// One CUDA device with its own stream and cuBLAS handle.
pub struct CublasDevice {
    device_id: usize,
    #[allow(dead_code)]
    ctx: Arc<CudaContext>,
    stream: Arc<CudaStream>,
    blas: CudaBlas,
}

impl CublasDevice {
    /// Check if CUDA is available at runtime (driver loaded, GPU present).
    pub fn is_available() -> bool {
        CudaContext::new(0).is_ok()
    }

    /// Open `device_id`: context, a dedicated stream and a cuBLAS handle bound to it.
    pub fn new(device_id: usize) -> gwl_core::Result<Self> {
        let ctx = CudaContext::new(device_id)
            .map_err(|e| cuda_err(format!("context (device {device_id}): {e}")))?;
        let stream = ctx
            .new_stream()
            .map_err(|e| cuda_err(format!("stream (device {device_id}): {e}")))?;
        let blas = CudaBlas::new(stream.clone()).map_err(|e| {
            Error::backend(device_id, "create handle", BlasStatus::from_code(e.0 as i32))
        })?;
        log::info!("cuBLAS lane ready on device {device_id}");
        Ok(Self { device_id, ctx, stream, blas })
    }

    /// One lane per device id in `0..n_devices`.
    pub fn lanes(n_devices: usize) -> gwl_core::Result<Vec<Self>> {
        (0..n_devices).map(Self::new).collect()
    }

    fn driver_failure(
        &self,
        what: &str,
        e: impl std::fmt::Display,
        status: BlasStatus,
    ) -> BlasStatus {
        log::warn!("device {}: {what} failed: {e}", self.device_id);
        status
    }
}

impl BatchedBlas for CublasDevice {
    type Buffer = CudaSlice<GpuComplex>;

    fn device_id(&self) -> usize {
        self.device_id
    }

    fn upload(&mut self, host: &[Complex64]) -> Result<Self::Buffer, BlasStatus> {
        let staged: Vec<GpuComplex> = host.iter().copied().map(GpuComplex::from).collect();
        self.stream
            .clone_htod(&staged)
            .map_err(|e| self.driver_failure("htod copy", e, BlasStatus::AllocFailed))
    }

    fn alloc_zeros(&mut self, len: usize) -> Result<Self::Buffer, BlasStatus> {
        self.stream
            .alloc_zeros::<GpuComplex>(len)
            .map_err(|e| self.driver_failure("alloc", e, BlasStatus::AllocFailed))
    }

    fn dotc_broadcast(
        &mut self,
        x: &Self::Buffer,
        ys: &Self::Buffer,
        len: usize,
        batch: usize,
        out: &mut Self::Buffer,
        accumulate: bool,
    ) -> Result<(), BlasStatus> {
        if x.len() < len || ys.len() < len * batch || out.len() < batch {
            return Err(BlasStatus::InvalidValue);
        }
        let (n, k) = (dim(batch)?, dim(len)?);
        let beta = if accumulate { ONE } else { ZERO };
        let (x_ptr, _x_sync) = x.device_ptr(&self.stream);
        let (ys_ptr, _ys_sync) = ys.device_ptr(&self.stream);
        let (out_ptr, _out_sync) = out.device_ptr_mut(&self.stream);
        let status = unsafe {
            cublas_sys::cublasZgemm_v2(
                *self.blas.handle(),
                cublas_sys::cublasOperation_t::CUBLAS_OP_C,
                cublas_sys::cublasOperation_t::CUBLAS_OP_N,
                1,
                n,
                k,
                &ONE as *const GpuComplex as *const _,
                x_ptr as *const _,
                k,
                ys_ptr as *const _,
                k,
                &beta as *const GpuComplex as *const _,
                out_ptr as *mut _,
                1,
            )
        };
        check(status)
    }

    fn dotc_self(
        &mut self,
        ys: &Self::Buffer,
        len: usize,
        batch: usize,
        out: &mut Self::Buffer,
        accumulate: bool,
    ) -> Result<(), BlasStatus> {
        if ys.len() < len * batch || out.len() < batch {
            return Err(BlasStatus::InvalidValue);
        }
        let (k, n_batch) = (dim(len)?, dim(batch)?);
        let stride = i64::from(k);
        let beta = if accumulate { ONE } else { ZERO };
        let (ys_ptr, _ys_sync) = ys.device_ptr(&self.stream);
        let (out_ptr, _out_sync) = out.device_ptr_mut(&self.stream);
        let status = unsafe {
            cublas_sys::cublasZgemmStridedBatched(
                *self.blas.handle(),
                cublas_sys::cublasOperation_t::CUBLAS_OP_C,
                cublas_sys::cublasOperation_t::CUBLAS_OP_N,
                1,
                1,
                k,
                &ONE as *const GpuComplex as *const _,
                ys_ptr as *const _,
                k,
                stride,
                ys_ptr as *const _,
                k,
                stride,
                &beta as *const GpuComplex as *const _,
                out_ptr as *mut _,
                1,
                1,
                n_batch,
            )
        };
        check(status)
    }

    fn download(&mut self, buf: &Self::Buffer, host: &mut [Complex64]) -> Result<(), BlasStatus> {
        let mut staged = vec![GpuComplex::default(); buf.len()];
        self.stream
            .memcpy_dtoh(buf, &mut staged)
            .map_err(|e| self.driver_failure("dtoh copy", e, BlasStatus::MappingError))?;
        if staged.len() < host.len() {
            return Err(BlasStatus::MappingError);
        }
        for (dst, src) in host.iter_mut().zip(staged) {
            *dst = src.into();
        }
        Ok(())
    }

    fn synchronize(&mut self) -> Result<(), BlasStatus> {
        self.stream
            .synchronize()
            .map_err(|e| self.driver_failure("synchronize", e, BlasStatus::ExecutionFailed))
    }
}
