//! Strongly-typed identifiers and counters.

use std::fmt;

/// Number of completed stencil applications in a run.
///
/// Incremented exactly once per dispatch. Used for reporting and for
/// deriving which field currently holds the read role.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IterationCount(pub u64);

impl IterationCount {
    /// The next count, saturating at `u64::MAX`.
    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for IterationCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for IterationCount {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// Opaque handle to a kernel compiled on a compute device.
///
/// Only meaningful for the device that issued it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KernelHandle(pub u32);

impl fmt::Display for KernelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "kernel#{}", self.0)
    }
}

/// Opaque handle to a buffer allocated on a compute device.
///
/// Only meaningful for the device that issued it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferHandle(pub u32);

impl fmt::Display for BufferHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "buffer#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iteration_count_saturates() {
        assert_eq!(IterationCount(3).next(), IterationCount(4));
        assert_eq!(IterationCount(u64::MAX).next(), IterationCount(u64::MAX));
    }

    #[test]
    fn handles_display_with_kind() {
        assert_eq!(KernelHandle(2).to_string(), "kernel#2");
        assert_eq!(BufferHandle(0).to_string(), "buffer#0");
    }
}
