//! Per-run performance metrics for the iteration controller.
//!
//! [`RunMetrics`] accumulates timing data across the steps of a run.

/// Timing and memory metrics collected during a run.
///
/// All durations are in microseconds. Totals accumulate across every
/// step since [`start()`](crate::IterationController::start); the
/// `last_*` fields describe the most recent step only.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunMetrics {
    /// Time spent allocating, uploading, and compiling, in microseconds.
    pub setup_us: u64,
    /// Total time inside `dispatch()`, in microseconds.
    pub dispatch_us: u64,
    /// Total time inside `read_back()`, in microseconds.
    pub read_back_us: u64,
    /// Total time in the convergence check, in microseconds.
    pub convergence_us: u64,
    /// Wall-clock time of the most recent step, in microseconds.
    pub last_step_us: u64,
    /// Steps completed.
    pub steps: u64,
    /// Host memory held by both fields, in bytes.
    pub memory_bytes: usize,
}

impl RunMetrics {
    /// Sum of the per-step phases, in microseconds.
    pub fn iteration_us(&self) -> u64 {
        self.dispatch_us + self.read_back_us + self.convergence_us
    }

    /// Mean wall-clock time per step, in microseconds.
    pub fn mean_step_us(&self) -> u64 {
        if self.steps == 0 {
            0
        } else {
            self.iteration_us() / self.steps
        }
    }
}
