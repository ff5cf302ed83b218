//! Error types for the device boundary.
//!
//! Split by phase: [`SetupError`] covers everything that can fail before
//! the first iteration (device acquisition, buffer upload, kernel
//! compilation), [`DispatchError`] covers failures while executing or
//! reading back a single stencil application. Both are fatal to a run.

use std::error::Error;
use std::fmt;

use crate::id::{BufferHandle, KernelHandle};

/// Errors raised while preparing a device for a run.
///
/// The iteration controller never dispatches without a successfully
/// compiled kernel, so any of these aborts the run before iteration 1.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SetupError {
    /// The device could not be acquired or initialised.
    DeviceUnavailable {
        /// Human-readable description of the failure.
        reason: String,
    },
    /// The requested entry point does not exist in the kernel source.
    UnknownEntryPoint {
        /// Name of the kernel program.
        program: String,
        /// The entry point that was requested.
        entry_point: String,
    },
    /// The entry point does not declare exactly one input and one output buffer.
    InvalidSignature {
        /// The offending entry point.
        entry_point: String,
        /// Description of the problem.
        reason: String,
    },
    /// Wrong number of arguments bound to an entry point.
    ArgumentCount {
        /// The entry point being bound.
        entry_point: String,
        /// Number of parameters declared by the entry point.
        expected: usize,
        /// Number of arguments supplied.
        got: usize,
    },
    /// An argument does not match the kind of its parameter slot.
    ArgumentKind {
        /// The entry point being bound.
        entry_point: String,
        /// Zero-based parameter position.
        index: usize,
        /// The declared parameter kind.
        expected: &'static str,
    },
    /// A bound buffer handle was not issued by this device.
    UnknownBuffer {
        /// The unrecognised handle.
        buffer: BufferHandle,
    },
    /// Input and output buffers have different lengths.
    BufferLengthMismatch {
        /// Length of the input buffer.
        input: usize,
        /// Length of the output buffer.
        output: usize,
    },
    /// The same buffer was bound as both input and output.
    AliasedBuffers {
        /// The buffer bound twice.
        buffer: BufferHandle,
    },
    /// The element-count constant disagrees with the bound buffer length.
    CountMismatch {
        /// Length of the bound buffers.
        buffer_len: usize,
        /// Value passed for the count parameter.
        count: u32,
    },
    /// Host data passed to an upload has the wrong length.
    Upload {
        /// The destination buffer.
        buffer: BufferHandle,
        /// Length of the device buffer.
        expected: usize,
        /// Length of the host slice.
        got: usize,
    },
}

impl fmt::Display for SetupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeviceUnavailable { reason } => write!(f, "device unavailable: {reason}"),
            Self::UnknownEntryPoint {
                program,
                entry_point,
            } => write!(f, "program '{program}' has no entry point '{entry_point}'"),
            Self::InvalidSignature {
                entry_point,
                reason,
            } => write!(f, "entry point '{entry_point}' has an invalid signature: {reason}"),
            Self::ArgumentCount {
                entry_point,
                expected,
                got,
            } => write!(
                f,
                "entry point '{entry_point}' takes {expected} arguments, got {got}"
            ),
            Self::ArgumentKind {
                entry_point,
                index,
                expected,
            } => write!(
                f,
                "argument {index} of '{entry_point}' must be a {expected}"
            ),
            Self::UnknownBuffer { buffer } => write!(f, "unknown {buffer}"),
            Self::BufferLengthMismatch { input, output } => write!(
                f,
                "input buffer has {input} elements but output buffer has {output}"
            ),
            Self::AliasedBuffers { buffer } => {
                write!(f, "{buffer} bound as both input and output")
            }
            Self::CountMismatch { buffer_len, count } => write!(
                f,
                "count argument {count} does not match buffer length {buffer_len}"
            ),
            Self::Upload {
                buffer,
                expected,
                got,
            } => write!(
                f,
                "upload to {buffer}: expected {expected} elements, got {got}"
            ),
        }
    }
}

impl Error for SetupError {}

/// Errors raised by a single dispatch or read-back.
///
/// No retry or rollback happens at this layer; the contents of the
/// destination buffer are undefined after a failure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DispatchError {
    /// The kernel handle was not issued by this device.
    UnknownKernel {
        /// The unrecognised handle.
        kernel: KernelHandle,
    },
    /// The buffer handle was not issued by this device.
    UnknownBuffer {
        /// The unrecognised handle.
        buffer: BufferHandle,
    },
    /// The global range does not cover the bound buffers exactly.
    RangeMismatch {
        /// Length of the bound buffers.
        expected: usize,
        /// Requested global range.
        got: usize,
    },
    /// The local work-group size is zero.
    InvalidWorkGroup {
        /// The rejected work-group size.
        local: usize,
    },
    /// The host buffer passed to a read-back has the wrong length.
    ReadBackLength {
        /// The source buffer.
        buffer: BufferHandle,
        /// Length of the device buffer.
        expected: usize,
        /// Length of the host slice.
        got: usize,
    },
    /// The device failed while executing the kernel.
    ExecutionFailed {
        /// Human-readable description of the failure.
        reason: String,
    },
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownKernel { kernel } => write!(f, "unknown {kernel}"),
            Self::UnknownBuffer { buffer } => write!(f, "unknown {buffer}"),
            Self::RangeMismatch { expected, got } => write!(
                f,
                "global range {got} does not match buffer length {expected}"
            ),
            Self::InvalidWorkGroup { local } => {
                write!(f, "work-group size must be at least 1, got {local}")
            }
            Self::ReadBackLength {
                buffer,
                expected,
                got,
            } => write!(
                f,
                "read-back from {buffer}: expected {expected} elements, got {got}"
            ),
            Self::ExecutionFailed { reason } => write!(f, "execution failed: {reason}"),
        }
    }
}

impl Error for DispatchError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setup_error_messages_name_the_entry_point() {
        let err = SetupError::UnknownEntryPoint {
            program: "relax".into(),
            entry_point: "smooth".into(),
        };
        assert_eq!(err.to_string(), "program 'relax' has no entry point 'smooth'");

        let err = SetupError::ArgumentCount {
            entry_point: "relax".into(),
            expected: 3,
            got: 2,
        };
        assert!(err.to_string().contains("takes 3 arguments, got 2"));
    }

    #[test]
    fn dispatch_error_messages_carry_sizes() {
        let err = DispatchError::RangeMismatch {
            expected: 10,
            got: 12,
        };
        assert_eq!(
            err.to_string(),
            "global range 12 does not match buffer length 10"
        );
        let err = DispatchError::InvalidWorkGroup { local: 0 };
        assert!(err.to_string().contains("got 0"));
    }
}
