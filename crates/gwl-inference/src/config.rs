use gwl_compute::{CpuBackend, EvalMode, GpuBackend, HostBlas};
use gwl_core::{ChannelLayout, Error, LikelihoodBackend, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Which backend evaluates the reductions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Rayon thread-parallel backend.
    #[default]
    Cpu,
    /// Batched device backend on host-emulated lanes.
    Emulated,
    /// Batched device backend on cuBLAS lanes (requires the `cuda` feature).
    Cuda,
}

impl BackendKind {
    /// True for the batched device backends.
    pub fn uses_devices(self) -> bool {
        matches!(self, Self::Emulated | Self::Cuda)
    }
}

impl FromStr for BackendKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cpu" => Ok(Self::Cpu),
            "emulated" => Ok(Self::Emulated),
            "cuda" | "gpu" => Ok(Self::Cuda),
            other => Err(Error::Validation(format!("unknown backend '{other}'"))),
        }
    }
}

/// Summation mode of the complex reductions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReductionMode {
    /// SIMD, naive summation.
    #[default]
    Fast,
    /// Kahan summation, bit-exact between runs.
    Parity,
}

impl From<ReductionMode> for EvalMode {
    fn from(mode: ReductionMode) -> Self {
        match mode {
            ReductionMode::Fast => EvalMode::Fast,
            ReductionMode::Parity => EvalMode::Parity,
        }
    }
}

impl FromStr for ReductionMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fast" => Ok(Self::Fast),
            "parity" => Ok(Self::Parity),
            other => Err(Error::Validation(format!("unknown eval mode '{other}'"))),
        }
    }
}

/// Likelihood evaluation settings.
///
/// Every field has a default, so `{}` is a valid configuration (CPU backend,
/// automatic thread count, fast reductions, `A/E/T` channels).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LikelihoodConfig {
    /// Backend evaluating the reductions.
    pub backend: BackendKind,
    /// CPU threads (0 = automatic).
    pub n_threads: usize,
    /// Device lanes for the batched backends.
    pub n_devices: usize,
    /// Summation mode.
    pub eval_mode: ReductionMode,
    /// Channel naming convention.
    pub channels: ChannelLayout,
    /// Scale noise weights by `sqrt(Δf)` (log-spaced frequency grids).
    pub log_scaled: bool,
}

impl Default for LikelihoodConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Cpu,
            n_threads: 0,
            n_devices: 1,
            eval_mode: ReductionMode::Fast,
            channels: ChannelLayout::Aet,
            log_scaled: true,
        }
    }
}

impl LikelihoodConfig {
    /// Parse from JSON and validate.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `GWL_BACKEND`, `GWL_THREADS`, `GWL_DEVICES` and `GWL_EVAL_MODE`
    /// from the process environment.
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup (same keys as
    /// [`Self::with_env_overrides`]).
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(v) = lookup("GWL_BACKEND") {
            self.backend = v.parse()?;
        }
        if let Some(v) = lookup("GWL_THREADS") {
            self.n_threads = parse_count("GWL_THREADS", &v)?;
        }
        if let Some(v) = lookup("GWL_DEVICES") {
            self.n_devices = parse_count("GWL_DEVICES", &v)?;
        }
        if let Some(v) = lookup("GWL_EVAL_MODE") {
            self.eval_mode = v.parse()?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Reject settings no backend can run with.
    pub fn validate(&self) -> Result<()> {
        if self.backend.uses_devices() && self.n_devices == 0 {
            return Err(Error::Validation(format!(
                "backend {:?} needs n_devices >= 1",
                self.backend
            )));
        }
        Ok(())
    }
}

fn parse_count(key: &str, value: &str) -> Result<usize> {
    value
        .trim()
        .parse()
        .map_err(|e| Error::Validation(format!("{key}={value}: {e}")))
}

/// Build the backend named by `config`.
pub fn build_backend(config: &LikelihoodConfig) -> Result<Box<dyn LikelihoodBackend>> {
    config.validate()?;
    let backend: Box<dyn LikelihoodBackend> = match config.backend {
        BackendKind::Cpu => Box::new(CpuBackend::with_threads(config.n_threads)),
        BackendKind::Emulated => Box::new(GpuBackend::new(HostBlas::lanes(config.n_devices))?),
        BackendKind::Cuda => cuda_backend(config.n_devices)?,
    };
    log::info!("likelihood backend: {} ({:?})", backend.name(), config.backend);
    Ok(backend)
}

#[cfg(feature = "cuda")]
fn cuda_backend(n_devices: usize) -> Result<Box<dyn LikelihoodBackend>> {
    if !gwl_compute::CublasDevice::is_available() {
        return Err(Error::Computation("no CUDA device available".to_string()));
    }
    let lanes = gwl_compute::CublasDevice::lanes(n_devices)?;
    Ok(Box::new(GpuBackend::new(lanes)?))
}

#[cfg(not(feature = "cuda"))]
fn cuda_backend(_n_devices: usize) -> Result<Box<dyn LikelihoodBackend>> {
    Err(Error::NotImplemented("CUDA backend (build with --features cuda)".to_string()))
}
