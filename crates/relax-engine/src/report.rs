//! End-of-run summary.

use std::fmt;
use std::time::Duration;

use relax_device::{DeviceInfo, DeviceStats};

use crate::metrics::RunMetrics;

/// Summary of a converged run.
///
/// `Display` prints the iteration count and timings one per line:
///
/// ```text
/// Number of iterations: 1234
/// CPU time spent: 5678.901234 msec
/// Kernel time: 4321.000000 msec (1234 dispatches)
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct RunReport {
    /// Stencil applications performed.
    pub iterations: u64,
    /// Max interior delta of the final application.
    pub final_max_delta: f64,
    /// Wall-clock time from `start()` to convergence.
    pub elapsed: Duration,
    /// Device counters at convergence.
    pub device_stats: DeviceStats,
    /// The device the run executed on.
    pub device: DeviceInfo,
    /// Controller-side timings.
    pub metrics: RunMetrics,
}

fn millis(d: Duration) -> f64 {
    d.as_secs_f64() * 1_000.0
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Number of iterations: {}", self.iterations)?;
        writeln!(f, "CPU time spent: {:.6} msec", millis(self.elapsed))?;
        write!(
            f,
            "Kernel time: {:.6} msec ({} dispatches)",
            millis(self.device_stats.kernel_time),
            self.device_stats.dispatches
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relax_device::DeviceKind;

    #[test]
    fn display_uses_reference_line_format() {
        let report = RunReport {
            iterations: 42,
            final_max_delta: 0.05,
            elapsed: Duration::from_micros(1_500),
            device_stats: DeviceStats {
                dispatches: 42,
                kernel_time: Duration::from_millis(1),
                bytes_uploaded: 0,
                bytes_read_back: 0,
            },
            device: DeviceInfo {
                name: "sequential".into(),
                kind: DeviceKind::Sequential,
                parallelism: 1,
            },
            metrics: RunMetrics::default(),
        };
        let text = report.to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Number of iterations: 42");
        assert_eq!(lines[1], "CPU time spent: 1.500000 msec");
        assert_eq!(lines[2], "Kernel time: 1.000000 msec (42 dispatches)");
    }
}
