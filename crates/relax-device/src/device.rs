//! The [`ComputeDevice`] trait and its launch/reporting types.

use std::fmt;
use std::time::Duration;

use relax_core::{BufferHandle, DispatchError, KernelHandle, SetupError};

use crate::program::{KernelArg, KernelSource};

/// Family of a compute device.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    /// Single-threaded, in-order evaluation.
    Sequential,
    /// Work-groups evaluated concurrently on a thread pool.
    ThreadPool,
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sequential => write!(f, "sequential"),
            Self::ThreadPool => write!(f, "thread-pool"),
        }
    }
}

/// Static description of a device.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Human-readable device name.
    pub name: String,
    /// Device family.
    pub kind: DeviceKind,
    /// Number of work-groups the device can evaluate at once.
    pub parallelism: usize,
}

/// Cumulative counters since the device was created.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeviceStats {
    /// Completed dispatches.
    pub dispatches: u64,
    /// Wall-clock time spent inside dispatches.
    pub kernel_time: Duration,
    /// Bytes copied host → device.
    pub bytes_uploaded: u64,
    /// Bytes copied device → host.
    pub bytes_read_back: u64,
}

/// One-dimensional launch geometry.
///
/// `global` is the number of work-items and must equal the length of the
/// bound buffers. `local` is the work-group size: a scheduling hint that
/// must not change the result. When `local` does not divide `global` the
/// last group is partial; when it exceeds `global` it is clamped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LaunchGeometry {
    /// Total work-items.
    pub global: usize,
    /// Work-items per group.
    pub local: usize,
}

impl LaunchGeometry {
    /// Build a geometry. Validation happens at dispatch.
    pub fn new(global: usize, local: usize) -> Self {
        Self { global, local }
    }

    /// Reject a zero work-group size.
    pub fn validate(&self) -> Result<(), DispatchError> {
        if self.local == 0 {
            return Err(DispatchError::InvalidWorkGroup { local: self.local });
        }
        Ok(())
    }

    /// Work-group size actually used: `local` clamped to `[1, global]`.
    pub fn effective_local(&self) -> usize {
        self.local.min(self.global).max(1)
    }

    /// Number of work-groups, counting a trailing partial group.
    pub fn group_count(&self) -> usize {
        self.global.div_ceil(self.effective_local())
    }

    /// Whether every group is full.
    pub fn is_uniform(&self) -> bool {
        self.global % self.effective_local() == 0
    }
}

/// A data-parallel executor for per-index kernels.
///
/// # Contract
///
/// - Handles are only valid on the device that issued them.
/// - `dispatch()` returns only after every work-item has completed, so a
///   following `read_back()` observes the full result.
/// - The result of a dispatch must not depend on the work-group size or on
///   the order work-items are evaluated in.
///
/// # Object safety
///
/// This trait is object-safe; callers that choose a device at runtime can
/// hold a `Box<dyn ComputeDevice>`.
pub trait ComputeDevice: Send {
    /// Static device description.
    fn info(&self) -> DeviceInfo;

    /// Allocate a zero-filled buffer of `len` elements.
    fn allocate(&mut self, len: usize) -> Result<BufferHandle, SetupError>;

    /// Copy host data into a device buffer of the same length.
    fn upload(&mut self, buffer: BufferHandle, data: &[f64]) -> Result<(), SetupError>;

    /// Compile `entry_point` from `source` with concrete argument bindings.
    ///
    /// The returned handle is reused for every dispatch of that binding.
    fn compile(
        &mut self,
        source: &KernelSource,
        entry_point: &str,
        args: &[KernelArg],
    ) -> Result<KernelHandle, SetupError>;

    /// Execute one application of a compiled kernel over `[0, global)`.
    fn dispatch(&mut self, kernel: KernelHandle, geometry: LaunchGeometry)
        -> Result<(), DispatchError>;

    /// Copy a device buffer into a host slice of the same length.
    fn read_back(&mut self, buffer: BufferHandle, host: &mut [f64]) -> Result<(), DispatchError>;

    /// Cumulative counters.
    fn stats(&self) -> DeviceStats;
}

impl<D: ComputeDevice + ?Sized> ComputeDevice for Box<D> {
    fn info(&self) -> DeviceInfo {
        (**self).info()
    }

    fn allocate(&mut self, len: usize) -> Result<BufferHandle, SetupError> {
        (**self).allocate(len)
    }

    fn upload(&mut self, buffer: BufferHandle, data: &[f64]) -> Result<(), SetupError> {
        (**self).upload(buffer, data)
    }

    fn compile(
        &mut self,
        source: &KernelSource,
        entry_point: &str,
        args: &[KernelArg],
    ) -> Result<KernelHandle, SetupError> {
        (**self).compile(source, entry_point, args)
    }

    fn dispatch(
        &mut self,
        kernel: KernelHandle,
        geometry: LaunchGeometry,
    ) -> Result<(), DispatchError> {
        (**self).dispatch(kernel, geometry)
    }

    fn read_back(&mut self, buffer: BufferHandle, host: &mut [f64]) -> Result<(), DispatchError> {
        (**self).read_back(buffer, host)
    }

    fn stats(&self) -> DeviceStats {
        (**self).stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_geometry() {
        let g = LaunchGeometry::new(10_000_000, 32);
        assert!(g.validate().is_ok());
        assert_eq!(g.effective_local(), 32);
        assert_eq!(g.group_count(), 312_500);
        assert!(g.is_uniform());
    }

    #[test]
    fn partial_last_group() {
        let g = LaunchGeometry::new(10, 4);
        assert_eq!(g.group_count(), 3);
        assert!(!g.is_uniform());
    }

    #[test]
    fn oversized_group_is_clamped() {
        let g = LaunchGeometry::new(5, 32);
        assert_eq!(g.effective_local(), 5);
        assert_eq!(g.group_count(), 1);
        assert!(g.is_uniform());
    }

    #[test]
    fn zero_group_is_rejected() {
        let g = LaunchGeometry::new(5, 0);
        assert_eq!(
            g.validate(),
            Err(DispatchError::InvalidWorkGroup { local: 0 })
        );
    }

    #[test]
    fn device_kind_display() {
        assert_eq!(DeviceKind::Sequential.to_string(), "sequential");
        assert_eq!(DeviceKind::ThreadPool.to_string(), "thread-pool");
    }
}
