//! Buffer and kernel bookkeeping shared by the in-process devices.
//!
//! Both devices keep their buffers in host memory; they differ only in
//! how a bound kernel is evaluated. Handles are issued sequentially and
//! never reused within one device.

use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};

use indexmap::IndexMap;
use tracing::debug;

use relax_core::{BufferHandle, DispatchError, KernelHandle, SetupError};

use crate::device::{DeviceStats, LaunchGeometry};
use crate::program::{CellFn, KernelArg, KernelSource, ParamKind};

/// A kernel entry point bound to concrete buffers.
#[derive(Clone, Debug)]
pub(crate) struct BoundKernel {
    pub(crate) entry_point: String,
    pub(crate) cell: CellFn,
    pub(crate) input: BufferHandle,
    pub(crate) output: BufferHandle,
    pub(crate) len: usize,
}

/// Host-resident device memory plus the compiled-kernel table.
#[derive(Debug, Default)]
pub(crate) struct DeviceMemory {
    buffers: IndexMap<BufferHandle, Vec<f64>>,
    kernels: IndexMap<KernelHandle, BoundKernel>,
    next_buffer: u32,
    next_kernel: u32,
    stats: DeviceStats,
}

impl DeviceMemory {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn allocate(&mut self, len: usize) -> Result<BufferHandle, SetupError> {
        let handle = BufferHandle(self.next_buffer);
        self.next_buffer = self
            .next_buffer
            .checked_add(1)
            .ok_or_else(|| SetupError::DeviceUnavailable {
                reason: "buffer handle space exhausted".into(),
            })?;
        self.buffers.insert(handle, vec![0.0; len]);
        Ok(handle)
    }

    pub(crate) fn upload(&mut self, buffer: BufferHandle, data: &[f64]) -> Result<(), SetupError> {
        let dst = self
            .buffers
            .get_mut(&buffer)
            .ok_or(SetupError::UnknownBuffer { buffer })?;
        if dst.len() != data.len() {
            return Err(SetupError::Upload {
                buffer,
                expected: dst.len(),
                got: data.len(),
            });
        }
        dst.copy_from_slice(data);
        self.stats.bytes_uploaded += byte_len(data.len());
        Ok(())
    }

    pub(crate) fn read_back(
        &mut self,
        buffer: BufferHandle,
        host: &mut [f64],
    ) -> Result<(), DispatchError> {
        let src = self
            .buffers
            .get(&buffer)
            .ok_or(DispatchError::UnknownBuffer { buffer })?;
        if src.len() != host.len() {
            return Err(DispatchError::ReadBackLength {
                buffer,
                expected: src.len(),
                got: host.len(),
            });
        }
        host.copy_from_slice(src);
        self.stats.bytes_read_back += byte_len(host.len());
        Ok(())
    }

    /// Validate `args` against the entry point signature and install the
    /// binding.
    pub(crate) fn compile(
        &mut self,
        source: &KernelSource,
        entry_point: &str,
        args: &[KernelArg],
    ) -> Result<KernelHandle, SetupError> {
        let entry = source
            .entry_point(entry_point)
            .ok_or_else(|| SetupError::UnknownEntryPoint {
                program: source.name().to_string(),
                entry_point: entry_point.to_string(),
            })?;
        let params = entry.params();

        let count_of = |kind: ParamKind| params.iter().filter(|&&p| p == kind).count();
        if count_of(ParamKind::InputBuffer) != 1 || count_of(ParamKind::OutputBuffer) != 1 {
            return Err(SetupError::InvalidSignature {
                entry_point: entry_point.to_string(),
                reason: "expected exactly one input buffer and one output buffer".into(),
            });
        }
        if args.len() != params.len() {
            return Err(SetupError::ArgumentCount {
                entry_point: entry_point.to_string(),
                expected: params.len(),
                got: args.len(),
            });
        }

        let mut input = None;
        let mut output = None;
        let mut counts: Vec<u32> = Vec::new();
        for (index, (&kind, &arg)) in params.iter().zip(args).enumerate() {
            match (kind, arg) {
                (ParamKind::InputBuffer, KernelArg::Buffer(b)) => input = Some(b),
                (ParamKind::OutputBuffer, KernelArg::Buffer(b)) => output = Some(b),
                (ParamKind::UintConst, KernelArg::Uint(v)) => counts.push(v),
                _ => {
                    return Err(SetupError::ArgumentKind {
                        entry_point: entry_point.to_string(),
                        index,
                        expected: kind.describe(),
                    })
                }
            }
        }
        // Signature check above guarantees both are present.
        let (Some(input), Some(output)) = (input, output) else {
            return Err(SetupError::InvalidSignature {
                entry_point: entry_point.to_string(),
                reason: "missing buffer binding".into(),
            });
        };

        if input == output {
            return Err(SetupError::AliasedBuffers { buffer: input });
        }
        let in_len = self
            .buffers
            .get(&input)
            .ok_or(SetupError::UnknownBuffer { buffer: input })?
            .len();
        let out_len = self
            .buffers
            .get(&output)
            .ok_or(SetupError::UnknownBuffer { buffer: output })?
            .len();
        if in_len != out_len {
            return Err(SetupError::BufferLengthMismatch {
                input: in_len,
                output: out_len,
            });
        }
        for count in counts {
            if count as usize != in_len {
                return Err(SetupError::CountMismatch {
                    buffer_len: in_len,
                    count,
                });
            }
        }

        let handle = KernelHandle(self.next_kernel);
        self.next_kernel = self
            .next_kernel
            .checked_add(1)
            .ok_or_else(|| SetupError::DeviceUnavailable {
                reason: "kernel handle space exhausted".into(),
            })?;
        debug!(
            program = source.name(),
            entry_point,
            %handle,
            %input,
            %output,
            len = in_len,
            "compiled kernel"
        );
        self.kernels.insert(
            handle,
            BoundKernel {
                entry_point: entry_point.to_string(),
                cell: entry.cell(),
                input,
                output,
                len: in_len,
            },
        );
        Ok(handle)
    }

    /// Resolve a kernel and run `eval` over its buffers.
    ///
    /// The output buffer is moved out of the table for the duration of the
    /// call so the input can be borrowed immutably alongside it. A panic
    /// inside `eval` becomes [`DispatchError::ExecutionFailed`]; the
    /// output contents are undefined afterwards.
    pub(crate) fn dispatch<F>(
        &mut self,
        kernel: KernelHandle,
        geometry: LaunchGeometry,
        eval: F,
    ) -> Result<(), DispatchError>
    where
        F: FnOnce(CellFn, &[f64], &mut [f64], LaunchGeometry),
    {
        geometry.validate()?;
        let bound = self
            .kernels
            .get(&kernel)
            .ok_or(DispatchError::UnknownKernel { kernel })?
            .clone();
        if geometry.global != bound.len {
            return Err(DispatchError::RangeMismatch {
                expected: bound.len,
                got: geometry.global,
            });
        }
        if !self.buffers.contains_key(&bound.input) {
            return Err(DispatchError::UnknownBuffer {
                buffer: bound.input,
            });
        }
        let slot = self
            .buffers
            .get_mut(&bound.output)
            .ok_or(DispatchError::UnknownBuffer {
                buffer: bound.output,
            })?;
        let mut out = std::mem::take(slot);

        let start = Instant::now();
        let outcome = match self.buffers.get(&bound.input) {
            Some(input) => panic::catch_unwind(AssertUnwindSafe(|| {
                eval(bound.cell, input, &mut out, geometry)
            })),
            None => Ok(()),
        };
        let elapsed = start.elapsed();

        if let Some(slot) = self.buffers.get_mut(&bound.output) {
            *slot = out;
        }

        match outcome {
            Ok(()) => {
                self.record_dispatch(elapsed);
                Ok(())
            }
            Err(payload) => Err(DispatchError::ExecutionFailed {
                reason: format!(
                    "kernel '{}' panicked: {}",
                    bound.entry_point,
                    panic_message(payload.as_ref())
                ),
            }),
        }
    }

    pub(crate) fn stats(&self) -> DeviceStats {
        self.stats.clone()
    }

    fn record_dispatch(&mut self, elapsed: Duration) {
        self.stats.dispatches += 1;
        self.stats.kernel_time += elapsed;
    }
}

fn byte_len(elements: usize) -> u64 {
    (elements * std::mem::size_of::<f64>()) as u64
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
