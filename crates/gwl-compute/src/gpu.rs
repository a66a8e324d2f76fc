//! Batched device backend.
//!
//! Walkers are split into contiguous blocks, one per device lane. Each lane
//! computes its whole block with six batched calls and the channel sum is
//! accumulated on the device:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  Host: partition 0..n_walkers → lane blocks (contiguous)     │
//! │                                                              │
//! │  Per lane (one Rayon task each, lanes run concurrently):     │
//! │    for c in 0..3:                                            │
//! │      cross[j]  (+)= Σ conj(data_c) · tmpl_c[j]   (1 call)    │
//! │      energy[j] (+)= Σ |tmpl_c[j]|²                (1 call)    │
//! │    synchronize → download → Re() into the lane's window      │
//! │                                                              │
//! │  Host: join all lanes before returning                       │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Device mirrors and handles belong to the caller and are passed in
//! explicitly ([`DeviceResident`], the lane slice); nothing here is ambient.

use crate::blas::BatchedBlas;
use crate::partition::DeviceAssignment;
use gwl_core::{BlasStatus, Error, LikelihoodBackend, LikelihoodInputs, N_CHANNELS, Result};
use num_complex::Complex64;
use rayon::prelude::*;
use std::ops::Range;

/// One device's resident share of a likelihood call.
pub struct DeviceResident<Buf> {
    /// Data series per channel (`stream_len` samples each).
    pub data: [Buf; N_CHANNELS],
    /// Walker-major template block per channel (`walkers.len() * stream_len`).
    pub templates: [Buf; N_CHANNELS],
    /// Global walker indices held by this device.
    pub walkers: Range<usize>,
}

impl<Buf> DeviceResident<Buf> {
    /// Upload the data triple and the template block for `walkers` to `lane`.
    pub fn stage<B>(
        lane: &mut B,
        inputs: &LikelihoodInputs<'_>,
        walkers: Range<usize>,
    ) -> Result<Self>
    where
        B: BatchedBlas<Buffer = Buf>,
    {
        let device = lane.device_id();
        let upload_err = |status: BlasStatus| Error::backend(device, "upload", status);

        let [d0, d1, d2] = inputs.data_channels();
        let data = [
            lane.upload(d0).map_err(upload_err)?,
            lane.upload(d1).map_err(upload_err)?,
            lane.upload(d2).map_err(upload_err)?,
        ];
        let templates = [
            lane.upload(inputs.walker_block(0, walkers.clone())).map_err(upload_err)?,
            lane.upload(inputs.walker_block(1, walkers.clone())).map_err(upload_err)?,
            lane.upload(inputs.walker_block(2, walkers.clone())).map_err(upload_err)?,
        ];
        Ok(Self { data, templates, walkers })
    }
}

/// Reduce every device block and gather the results into `d_h` / `h_h`.
///
/// `lanes[i]` processes `resident[i]`, which must hold the walkers
/// `assignment.range(i)`. Lanes run concurrently and all are joined before
/// this returns. The first non-success status aborts the call with
/// [`Error::Backend`]; outputs are then undefined.
///
/// # Panics
/// Panics if the lane, resident and device counts differ, if a resident
/// block does not match its assigned range, if the outputs do not have
/// one slot per walker, or if `stream_len == 0`.
pub fn get_likelihood_gpu<B: BatchedBlas>(
    lanes: &mut [B],
    resident: &[DeviceResident<B::Buffer>],
    assignment: &DeviceAssignment,
    stream_len: usize,
    d_h: &mut [f64],
    h_h: &mut [f64],
) -> Result<()> {
    assert_eq!(lanes.len(), resident.len(), "one resident block per lane");
    assert_eq!(lanes.len(), assignment.n_devices(), "one assigned block per lane");
    assert!(stream_len > 0, "stream_len must be > 0");
    for ((device, range), block) in assignment.iter().zip(resident) {
        assert_eq!(block.walkers, range, "resident block {device} does not match its assignment");
    }

    let d_windows = assignment.split_outputs(d_h);
    let h_windows = assignment.split_outputs(h_h);

    lanes
        .par_iter_mut()
        .zip(resident.par_iter())
        .zip(d_windows.into_par_iter().zip(h_windows.into_par_iter()))
        .try_for_each(|((lane, block), (dh, hh))| reduce_on_lane(lane, block, stream_len, dh, hh))
}

fn reduce_on_lane<B: BatchedBlas>(
    lane: &mut B,
    block: &DeviceResident<B::Buffer>,
    stream_len: usize,
    d_h: &mut [f64],
    h_h: &mut [f64],
) -> Result<()> {
    let batch = block.walkers.len();
    if batch == 0 {
        return Ok(());
    }
    let device = lane.device_id();
    let fail =
        move |operation: &'static str| move |status| Error::backend(device, operation, status);

    let mut cross = lane.alloc_zeros(batch).map_err(fail("alloc_zeros"))?;
    let mut energy = lane.alloc_zeros(batch).map_err(fail("alloc_zeros"))?;

    for c in 0..N_CHANNELS {
        let accumulate = c > 0;
        lane.dotc_broadcast(
            &block.data[c],
            &block.templates[c],
            stream_len,
            batch,
            &mut cross,
            accumulate,
        )
        .map_err(fail("dotc_broadcast"))?;
        lane.dotc_self(&block.templates[c], stream_len, batch, &mut energy, accumulate)
            .map_err(fail("dotc_self"))?;
    }
    lane.synchronize().map_err(fail("synchronize"))?;

    let mut host = vec![Complex64::new(0.0, 0.0); batch];
    lane.download(&cross, &mut host).map_err(fail("download"))?;
    for (out, v) in d_h.iter_mut().zip(&host) {
        *out = v.re;
    }
    lane.download(&energy, &mut host).map_err(fail("download"))?;
    for (out, v) in h_h.iter_mut().zip(&host) {
        *out = v.re;
    }
    lane.synchronize().map_err(fail("synchronize"))?;

    log::debug!("device {device}: reduced walkers {:?}", block.walkers);
    Ok(())
}

/// Batched device backend owning one lane per device.
pub struct GpuBackend<B: BatchedBlas> {
    lanes: Vec<B>,
}

impl<B: BatchedBlas> GpuBackend<B> {
    /// Create a backend over `lanes` (at least one).
    pub fn new(lanes: Vec<B>) -> Result<Self> {
        if lanes.is_empty() {
            return Err(Error::Validation("GPU backend needs at least one device lane".into()));
        }
        log::info!("GPU backend: {} device lane(s)", lanes.len());
        Ok(Self { lanes })
    }

    /// Number of device lanes.
    pub fn n_devices(&self) -> usize {
        self.lanes.len()
    }

    /// Borrow the lanes.
    pub fn lanes(&self) -> &[B] {
        &self.lanes
    }

    /// Assignment used for `n_walkers`: lanes past `n_walkers` stay idle.
    pub fn assignment(&self, n_walkers: usize) -> DeviceAssignment {
        DeviceAssignment::contiguous(n_walkers, self.lanes.len().min(n_walkers).max(1))
    }

    /// Stage host inputs onto the active lanes, in parallel.
    pub fn stage(
        &mut self,
        inputs: &LikelihoodInputs<'_>,
    ) -> Result<(DeviceAssignment, Vec<DeviceResident<B::Buffer>>)> {
        let assignment = self.assignment(inputs.n_walkers());
        let resident = self.lanes[..assignment.n_devices()]
            .par_iter_mut()
            .enumerate()
            .map(|(device, lane)| DeviceResident::stage(lane, inputs, assignment.range(device)))
            .collect::<Result<Vec<_>>>()?;
        Ok((assignment, resident))
    }
}

impl<B: BatchedBlas> LikelihoodBackend for GpuBackend<B> {
    fn compute_into(
        &mut self,
        inputs: &LikelihoodInputs<'_>,
        d_h: &mut [f64],
        h_h: &mut [f64],
    ) -> Result<()> {
        assert_eq!(d_h.len(), inputs.n_walkers(), "d_h length must equal n_walkers");
        assert_eq!(h_h.len(), inputs.n_walkers(), "h_h length must equal n_walkers");

        let (assignment, resident) = self.stage(inputs)?;
        get_likelihood_gpu(
            &mut self.lanes[..assignment.n_devices()],
            &resident,
            &assignment,
            inputs.stream_len(),
            d_h,
            h_h,
        )
    }

    fn name(&self) -> &str {
        "GPU"
    }
}
