//! Host-memory lane with device-style (tree order) reductions.

use super::BatchedBlas;
use crate::reduce::{complex_dot_pairwise, self_energy_pairwise};
use gwl_core::BlasStatus;
use num_complex::Complex64;

/// Emulated device lane backed by host memory.
///
/// Reductions use [`complex_dot_pairwise`], the summation order of a device
/// tree reduction, so results differ from the CPU backend only by rounding.
/// Shape errors are reported as [`BlasStatus::InvalidValue`], like the real
/// library.
#[derive(Debug, Clone)]
pub struct HostBlas {
    device_id: usize,
    calls: usize,
    fault: Option<(usize, BlasStatus)>,
}

impl HostBlas {
    /// Lane for `device_id`.
    pub fn new(device_id: usize) -> Self {
        Self { device_id, calls: 0, fault: None }
    }

    /// One lane per device id in `0..n_devices`.
    pub fn lanes(n_devices: usize) -> Vec<Self> {
        (0..n_devices).map(Self::new).collect()
    }

    /// Lane whose call number `n_ok` (0-based) and every later call fail with `status`.
    pub fn failing_after(device_id: usize, n_ok: usize, status: BlasStatus) -> Self {
        Self { device_id, calls: 0, fault: Some((n_ok, status)) }
    }

    /// Number of library calls issued so far.
    pub fn calls(&self) -> usize {
        self.calls
    }

    fn enter(&mut self) -> Result<(), BlasStatus> {
        let call = self.calls;
        self.calls += 1;
        match self.fault {
            Some((n_ok, status)) if call >= n_ok => Err(status),
            _ => Ok(()),
        }
    }
}

fn check_batch(
    ys: &[Complex64],
    len: usize,
    batch: usize,
    out: &[Complex64],
) -> Result<(), BlasStatus> {
    if len == 0 || ys.len() < len * batch || out.len() < batch {
        return Err(BlasStatus::InvalidValue);
    }
    Ok(())
}

impl BatchedBlas for HostBlas {
    type Buffer = Vec<Complex64>;

    fn device_id(&self) -> usize {
        self.device_id
    }

    fn upload(&mut self, host: &[Complex64]) -> Result<Self::Buffer, BlasStatus> {
        self.enter()?;
        Ok(host.to_vec())
    }

    fn alloc_zeros(&mut self, len: usize) -> Result<Self::Buffer, BlasStatus> {
        self.enter()?;
        Ok(vec![Complex64::new(0.0, 0.0); len])
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
        self.enter()?;
        check_batch(ys, len, batch, out)?;
        if x.len() < len {
            return Err(BlasStatus::InvalidValue);
        }
        for (j, slot) in out.iter_mut().take(batch).enumerate() {
            let dot = complex_dot_pairwise(&x[..len], &ys[j * len..(j + 1) * len]);
            *slot = if accumulate { *slot + dot } else { dot };
        }
        Ok(())
    }

    fn dotc_self(
        &mut self,
        ys: &Self::Buffer,
        len: usize,
        batch: usize,
        out: &mut Self::Buffer,
        accumulate: bool,
    ) -> Result<(), BlasStatus> {
        self.enter()?;
        check_batch(ys, len, batch, out)?;
        for (j, slot) in out.iter_mut().take(batch).enumerate() {
            let energy = Complex64::new(self_energy_pairwise(&ys[j * len..(j + 1) * len]), 0.0);
            *slot = if accumulate { *slot + energy } else { energy };
        }
        Ok(())
    }

    fn download(&mut self, buf: &Self::Buffer, host: &mut [Complex64]) -> Result<(), BlasStatus> {
        self.enter()?;
        if buf.len() < host.len() {
            return Err(BlasStatus::MappingError);
        }
        host.copy_from_slice(&buf[..host.len()]);
        Ok(())
    }

    fn synchronize(&mut self) -> Result<(), BlasStatus> {
        self.enter()
    }
}
