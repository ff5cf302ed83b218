//! Run configuration, device selection, and validation errors.
//!
//! [`RunConfig`] is the input to
//! [`IterationController::new`](crate::IterationController::new).
//! [`validate()`](RunConfig::validate) checks every structural invariant
//! before any memory is allocated or any device is touched.

use std::error::Error;
use std::fmt;

use relax_arena::ArenaConfig;
use relax_core::field::MIN_FIELD_LEN;
use relax_core::{BoundaryCondition, FieldError, SetupError, Tolerance, DEFAULT_HEAT};
use relax_device::{ComputeDevice, SequentialDevice, ThreadPoolDevice, ThreadPoolOptions};

// ── DeviceSelection ────────────────────────────────────────────────

/// Which in-process device a run should use.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceSelection {
    /// [`SequentialDevice`].
    Sequential,
    /// [`ThreadPoolDevice`] with an optional dedicated worker count.
    ThreadPool {
        /// `None` uses rayon's global pool.
        threads: Option<usize>,
    },
}

impl Default for DeviceSelection {
    fn default() -> Self {
        Self::ThreadPool { threads: None }
    }
}

impl DeviceSelection {
    /// Reject a dedicated pool with zero workers.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Self::ThreadPool { threads: Some(0) } = self {
            return Err(ConfigError::ZeroThreads);
        }
        Ok(())
    }

    /// Construct the selected device.
    pub fn build(&self) -> Result<Box<dyn ComputeDevice>, SetupError> {
        match *self {
            Self::Sequential => Ok(Box::new(SequentialDevice::new())),
            Self::ThreadPool { threads } => Ok(Box::new(ThreadPoolDevice::with_options(
                ThreadPoolOptions { threads },
            )?)),
        }
    }
}

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected during [`RunConfig::validate()`].
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigError {
    /// Fewer than three cells: the interior would be empty.
    FieldTooShort {
        /// The configured length.
        len: usize,
    },
    /// Length does not fit the kernel's `u32` count argument.
    FieldTooLong {
        /// The configured length.
        len: usize,
    },
    /// Boundary value or tolerance rejected by the field model.
    Field(FieldError),
    /// Work-group size is zero.
    ZeroWorkGroupSize,
    /// `max_iterations` is `Some(0)`.
    ZeroIterationCap,
    /// Dedicated thread pool requested with zero workers.
    ZeroThreads,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FieldTooShort { len } => write!(
                f,
                "field length {len} is below the minimum of {MIN_FIELD_LEN}"
            ),
            Self::FieldTooLong { len } => write!(f, "field length {len} exceeds u32::MAX"),
            Self::Field(e) => write!(f, "field: {e}"),
            Self::ZeroWorkGroupSize => write!(f, "work_group_size must be at least 1"),
            Self::ZeroIterationCap => write!(f, "max_iterations must be at least 1"),
            Self::ZeroThreads => write!(f, "thread pool needs at least one worker"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Field(e) => Some(e),
            _ => None,
        }
    }
}

impl From<FieldError> for ConfigError {
    fn from(e: FieldError) -> Self {
        Self::Field(e)
    }
}

// ── RunConfig ──────────────────────────────────────────────────────

/// Complete configuration for one relaxation run.
#[derive(Clone, Debug, PartialEq)]
pub struct RunConfig {
    /// Cells per field. Default: 10 000 000. Minimum: 3.
    pub len: usize,
    /// Fixed value of cell 0. Default: 100.0.
    pub heat: f64,
    /// Fixed value of cell `len - 1`. Default: 0.0.
    pub right_boundary: f64,
    /// Convergence tolerance. Default: 0.1.
    pub eps: f64,
    /// Work-group size passed to every dispatch. Default: 32.
    pub work_group_size: usize,
    /// Stop with an error after this many applications. Default: `None`.
    pub max_iterations: Option<u64>,
    /// Device used by [`DeviceSelection::build`]. Default: global thread pool.
    pub device: DeviceSelection,
}

impl RunConfig {
    /// Default field length.
    pub const DEFAULT_LEN: usize = ArenaConfig::DEFAULT_LEN;
    /// Default work-group size.
    pub const DEFAULT_WORK_GROUP_SIZE: usize = 32;

    /// Defaults with a custom field length.
    pub fn new(len: usize) -> Self {
        Self {
            len,
            ..Self::default()
        }
    }

    /// Set the left boundary value.
    pub fn with_heat(mut self, heat: f64) -> Self {
        self.heat = heat;
        self
    }

    /// Set the right boundary value.
    pub fn with_right_boundary(mut self, value: f64) -> Self {
        self.right_boundary = value;
        self
    }

    /// Set the convergence tolerance.
    pub fn with_eps(mut self, eps: f64) -> Self {
        self.eps = eps;
        self
    }

    /// Set the work-group size.
    pub fn with_work_group_size(mut self, local: usize) -> Self {
        self.work_group_size = local;
        self
    }

    /// Cap the number of iterations.
    pub fn with_max_iterations(mut self, cap: u64) -> Self {
        self.max_iterations = Some(cap);
        self
    }

    /// Choose the device.
    pub fn with_device(mut self, device: DeviceSelection) -> Self {
        self.device = device;
        self
    }

    /// Validate all structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.len < MIN_FIELD_LEN {
            return Err(ConfigError::FieldTooShort { len: self.len });
        }
        if u32::try_from(self.len).is_err() {
            return Err(ConfigError::FieldTooLong { len: self.len });
        }
        self.boundary()?;
        self.tolerance()?;
        if self.work_group_size == 0 {
            return Err(ConfigError::ZeroWorkGroupSize);
        }
        if self.max_iterations == Some(0) {
            return Err(ConfigError::ZeroIterationCap);
        }
        self.device.validate()
    }

    /// The validated boundary condition.
    pub fn boundary(&self) -> Result<BoundaryCondition, ConfigError> {
        Ok(BoundaryCondition::new(self.heat, self.right_boundary)?)
    }

    /// The validated tolerance.
    pub fn tolerance(&self) -> Result<Tolerance, ConfigError> {
        Ok(Tolerance::new(self.eps)?)
    }

    /// The arena configuration for this run.
    pub fn arena(&self) -> Result<ArenaConfig, ConfigError> {
        Ok(ArenaConfig::new(self.len).with_boundary(self.boundary()?))
    }

    /// Bytes held by one field.
    pub fn field_bytes(&self) -> usize {
        self.len * std::mem::size_of::<f64>()
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            len: Self::DEFAULT_LEN,
            heat: DEFAULT_HEAT,
            right_boundary: 0.0,
            eps: Tolerance::DEFAULT.value(),
            work_group_size: Self::DEFAULT_WORK_GROUP_SIZE,
            max_iterations: None,
            device: DeviceSelection::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_program() {
        let c = RunConfig::default();
        assert_eq!(c.len, 10_000_000);
        assert_eq!(c.heat, 100.0);
        assert_eq!(c.right_boundary, 0.0);
        assert_eq!(c.eps, 0.1);
        assert_eq!(c.work_group_size, 32);
        assert_eq!(c.max_iterations, None);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn short_field_rejected() {
        assert_eq!(
            RunConfig::new(2).validate(),
            Err(ConfigError::FieldTooShort { len: 2 })
        );
        assert!(RunConfig::new(3).validate().is_ok());
    }

    #[test]
    fn non_finite_values_rejected() {
        assert!(matches!(
            RunConfig::new(5).with_heat(f64::NAN).validate(),
            Err(ConfigError::Field(_))
        ));
        assert!(matches!(
            RunConfig::new(5).with_right_boundary(f64::INFINITY).validate(),
            Err(ConfigError::Field(_))
        ));
        assert!(matches!(
            RunConfig::new(5).with_eps(-1.0).validate(),
            Err(ConfigError::Field(_))
        ));
    }

    #[test]
    fn zero_knobs_rejected() {
        assert_eq!(
            RunConfig::new(5).with_work_group_size(0).validate(),
            Err(ConfigError::ZeroWorkGroupSize)
        );
        assert_eq!(
            RunConfig::new(5).with_max_iterations(0).validate(),
            Err(ConfigError::ZeroIterationCap)
        );
        assert_eq!(
            RunConfig::new(5)
                .with_device(DeviceSelection::ThreadPool { threads: Some(0) })
                .validate(),
            Err(ConfigError::ZeroThreads)
        );
    }

    #[test]
    fn field_error_is_chained() {
        let err = RunConfig::new(5).with_eps(f64::NAN).validate().unwrap_err();
        assert!(err.source().is_some());
        assert!(err.to_string().starts_with("field: "));
    }

    #[test]
    fn device_selection_builds() {
        let dev = DeviceSelection::Sequential.build().unwrap();
        assert_eq!(dev.info().parallelism, 1);
        let dev = DeviceSelection::ThreadPool { threads: Some(2) }
            .build()
            .unwrap();
        assert_eq!(dev.info().parallelism, 2);
    }
}
