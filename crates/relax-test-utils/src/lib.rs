//! Test utilities and mock devices for relax development.
//!
//! Provides wrapper implementations of [`ComputeDevice`] that inject
//! failures or record calls, plus field fixtures and a host-only
//! reference run in [`fixtures`].

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use relax_core::{BufferHandle, DispatchError, KernelHandle, SetupError};
use relax_device::{
    ComputeDevice, DeviceInfo, DeviceStats, KernelArg, KernelSource, LaunchGeometry,
    SequentialDevice,
};

/// Where a [`FailingDevice`] injects its failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailurePoint {
    /// Every `compile()` fails with [`SetupError::DeviceUnavailable`].
    Compile,
    /// Every `upload()` fails with [`SetupError::DeviceUnavailable`].
    Upload,
    /// `dispatch()` succeeds `n` times, then fails with
    /// [`DispatchError::ExecutionFailed`].
    DispatchAfter(usize),
    /// `read_back()` succeeds `n` times, then fails with
    /// [`DispatchError::ExecutionFailed`].
    ReadBackAfter(usize),
}

/// Wraps a device and fails deterministically at a configured point.
///
/// Useful for testing that the iteration controller aborts cleanly and
/// reports the iteration the failure happened in.
pub struct FailingDevice<D = SequentialDevice> {
    inner: D,
    point: FailurePoint,
    dispatch_calls: usize,
    read_back_calls: usize,
}

impl FailingDevice<SequentialDevice> {
    /// A sequential device that fails at `point`.
    pub fn new(point: FailurePoint) -> Self {
        Self::wrap(SequentialDevice::new(), point)
    }
}

impl<D: ComputeDevice> FailingDevice<D> {
    /// Wrap `inner`, failing at `point`.
    pub fn wrap(inner: D, point: FailurePoint) -> Self {
        Self {
            inner,
            point,
            dispatch_calls: 0,
            read_back_calls: 0,
        }
    }

    /// How many times `dispatch()` has been called, including the failing call.
    pub fn dispatch_calls(&self) -> usize {
        self.dispatch_calls
    }

    /// How many times `read_back()` has been called, including the failing call.
    pub fn read_back_calls(&self) -> usize {
        self.read_back_calls
    }

    /// The wrapped device.
    pub fn inner(&self) -> &D {
        &self.inner
    }

    fn setup_failure(&self, what: &str) -> SetupError {
        SetupError::DeviceUnavailable {
            reason: format!("deliberate {what} failure"),
        }
    }
}

impl<D: ComputeDevice> ComputeDevice for FailingDevice<D> {
    fn info(&self) -> DeviceInfo {
        self.inner.info()
    }

    fn allocate(&mut self, len: usize) -> Result<BufferHandle, SetupError> {
        self.inner.allocate(len)
    }

    fn upload(&mut self, buffer: BufferHandle, data: &[f64]) -> Result<(), SetupError> {
        if self.point == FailurePoint::Upload {
            return Err(self.setup_failure("upload"));
        }
        self.inner.upload(buffer, data)
    }

    fn compile(
        &mut self,
        source: &KernelSource,
        entry_point: &str,
        args: &[KernelArg],
    ) -> Result<KernelHandle, SetupError> {
        if self.point == FailurePoint::Compile {
            return Err(self.setup_failure("compile"));
        }
        self.inner.compile(source, entry_point, args)
    }

    fn dispatch(
        &mut self,
        kernel: KernelHandle,
        geometry: LaunchGeometry,
    ) -> Result<(), DispatchError> {
        let n = self.dispatch_calls;
        self.dispatch_calls += 1;
        if let FailurePoint::DispatchAfter(succeed) = self.point {
            if n >= succeed {
                return Err(DispatchError::ExecutionFailed {
                    reason: format!("deliberate failure after {succeed} successful dispatches"),
                });
            }
        }
        self.inner.dispatch(kernel, geometry)
    }

    fn read_back(&mut self, buffer: BufferHandle, host: &mut [f64]) -> Result<(), DispatchError> {
        let n = self.read_back_calls;
        self.read_back_calls += 1;
        if let FailurePoint::ReadBackAfter(succeed) = self.point {
            if n >= succeed {
                return Err(DispatchError::ExecutionFailed {
                    reason: format!("deliberate failure after {succeed} successful read-backs"),
                });
            }
        }
        self.inner.read_back(buffer, host)
    }

    fn stats(&self) -> DeviceStats {
        self.inner.stats()
    }
}

/// One recorded `dispatch()` call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DispatchRecord {
    pub kernel: KernelHandle,
    pub geometry: LaunchGeometry,
}

/// Wraps a device and records every compile and dispatch.
pub struct RecordingDevice<D = SequentialDevice> {
    inner: D,
    compiled: Vec<(KernelHandle, Vec<KernelArg>)>,
    dispatches: Vec<DispatchRecord>,
}

impl RecordingDevice<SequentialDevice> {
    /// A recording sequential device.
    pub fn new() -> Self {
        Self::wrap(SequentialDevice::new())
    }
}

impl Default for RecordingDevice<SequentialDevice> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: ComputeDevice> RecordingDevice<D> {
    /// Wrap `inner`.
    pub fn wrap(inner: D) -> Self {
        Self {
            inner,
            compiled: Vec::new(),
            dispatches: Vec::new(),
        }
    }

    /// Successful compiles in call order, with the bound arguments.
    pub fn compiled(&self) -> &[(KernelHandle, Vec<KernelArg>)] {
        &self.compiled
    }

    /// Dispatches in call order.
    pub fn dispatches(&self) -> &[DispatchRecord] {
        &self.dispatches
    }
}

impl<D: ComputeDevice> ComputeDevice for RecordingDevice<D> {
    fn info(&self) -> DeviceInfo {
        self.inner.info()
    }

    fn allocate(&mut self, len: usize) -> Result<BufferHandle, SetupError> {
        self.inner.allocate(len)
    }

    fn upload(&mut self, buffer: BufferHandle, data: &[f64]) -> Result<(), SetupError> {
        self.inner.upload(buffer, data)
    }

    fn compile(
        &mut self,
        source: &KernelSource,
        entry_point: &str,
        args: &[KernelArg],
    ) -> Result<KernelHandle, SetupError> {
        let handle = self.inner.compile(source, entry_point, args)?;
        self.compiled.push((handle, args.to_vec()));
        Ok(handle)
    }

    fn dispatch(
        &mut self,
        kernel: KernelHandle,
        geometry: LaunchGeometry,
    ) -> Result<(), DispatchError> {
        self.dispatches.push(DispatchRecord { kernel, geometry });
        self.inner.dispatch(kernel, geometry)
    }

    fn read_back(&mut self, buffer: BufferHandle, host: &mut [f64]) -> Result<(), DispatchError> {
        self.inner.read_back(buffer, host)
    }

    fn stats(&self) -> DeviceStats {
        self.inner.stats()
    }
}
