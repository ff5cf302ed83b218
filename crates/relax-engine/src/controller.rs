//! Ping-pong iteration controller.
//!
//! [`IterationController`] is the composition root of a run. It owns the
//! [`FieldPair`], the compute device, and the run state machine:
//!
//! ```text
//! Idle ──start()──▶ Running ──step()*──▶ Converged
//!                     │
//!                     └── device error / iteration cap ──▶ Aborted
//! ```
//!
//! Setup compiles the stencil twice, once per role assignment (A→B and
//! B→A), so swapping roles each iteration is a choice between two kernel
//! handles and never a buffer copy.
//!
//! # Ownership model
//!
//! The controller is [`Send`] and single-threaded. All mutating methods
//! take `&mut self`; the device is the only place parallelism happens, and
//! every dispatch completes before the following read-back.

use std::error::Error;
use std::fmt;
use std::time::{Duration, Instant};

use tracing::{debug, info, trace, warn};

use relax_arena::{ArenaError, FieldPair, Parity};
use relax_core::{
    BufferHandle, Convergence, ConvergenceChecker, DispatchError, Field, IterationCount,
    KernelHandle, SetupError, StencilKernel,
};
use relax_device::{ComputeDevice, KernelArg, KernelSource, LaunchGeometry};

use crate::config::{ConfigError, RunConfig};
use crate::metrics::RunMetrics;
use crate::report::RunReport;

// Compile-time assertion: the controller can move between threads.
const _: () = {
    #[allow(dead_code)]
    fn assert_send<T: Send>() {}
    #[allow(dead_code)]
    fn check() {
        assert_send::<IterationController<relax_device::SequentialDevice>>();
        assert_send::<IterationController<Box<dyn ComputeDevice>>>();
    }
};

// ── RunState ────────────────────────────────────────────────────

/// Lifecycle state of a controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RunState {
    /// Constructed; no device work done yet.
    Idle,
    /// Device prepared; stepping.
    Running,
    /// The last step met the convergence criterion. Terminal.
    Converged,
    /// A device error or the iteration cap ended the run. Terminal.
    Aborted,
}

impl RunState {
    /// Whether no further steps are possible.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Converged | Self::Aborted)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Converged => "converged",
            Self::Aborted => "aborted",
        };
        f.write_str(s)
    }
}

// ── RunError ────────────────────────────────────────────────────

/// Errors that end (or prevent) a run.
#[derive(Clone, Debug, PartialEq)]
pub enum RunError {
    /// The run configuration is invalid.
    Config(ConfigError),
    /// The field pair could not be built or driven.
    Arena(ArenaError),
    /// Device preparation failed before the first iteration.
    Setup(SetupError),
    /// A dispatch or read-back failed.
    Dispatch {
        /// The iteration that was being computed (1-based).
        iteration: IterationCount,
        /// The device error.
        source: DispatchError,
    },
    /// `max_iterations` applications ran without converging.
    IterationLimit {
        /// The configured cap.
        limit: u64,
        /// Max interior delta of the last application.
        max_delta: f64,
    },
    /// An operation was called in a state that does not allow it.
    InvalidState {
        /// State at the time of the call.
        state: RunState,
        /// The refused operation.
        operation: &'static str,
    },
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Arena(e) => write!(f, "arena: {e}"),
            Self::Setup(e) => write!(f, "setup: {e}"),
            Self::Dispatch { iteration, source } => {
                write!(f, "iteration {iteration}: {source}")
            }
            Self::IterationLimit { limit, max_delta } => write!(
                f,
                "no convergence after {limit} iterations (max delta {max_delta})"
            ),
            Self::InvalidState { state, operation } => {
                write!(f, "cannot {operation} while {state}")
            }
        }
    }
}

impl Error for RunError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Arena(e) => Some(e),
            Self::Setup(e) => Some(e),
            Self::Dispatch { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<ConfigError> for RunError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<ArenaError> for RunError {
    fn from(e: ArenaError) -> Self {
        Self::Arena(e)
    }
}

impl From<SetupError> for RunError {
    fn from(e: SetupError) -> Self {
        Self::Setup(e)
    }
}

// ── StepOutcome ─────────────────────────────────────────────────

/// Result of one successful [`IterationController::step()`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepOutcome {
    /// Applications completed, including this one.
    pub iteration: IterationCount,
    /// Role assignment after the swap.
    pub parity: Parity,
    /// Convergence of this application against its input.
    pub convergence: Convergence,
}

impl StepOutcome {
    /// Whether this step ended the run.
    pub fn converged(&self) -> bool {
        self.convergence.stable
    }
}

// ── IterationController ─────────────────────────────────────────

/// Device handles issued during `start()`.
#[derive(Clone, Copy, Debug)]
struct DeviceBindings {
    /// `[A, B]`.
    buffers: [BufferHandle; 2],
    /// `[A→B, B→A]`.
    kernels: [KernelHandle; 2],
}

impl DeviceBindings {
    fn kernel(&self, parity: Parity) -> KernelHandle {
        self.kernels[parity.index()]
    }

    fn write_buffer(&self, parity: Parity) -> BufferHandle {
        self.buffers[parity.flip().index()]
    }
}

/// Drives repeated stencil applications on a device until convergence.
///
/// # Example
///
/// ```
/// use relax_device::SequentialDevice;
/// use relax_engine::{IterationController, RunConfig, RunState};
///
/// let config = RunConfig::new(5).with_work_group_size(2);
/// let mut ctl = IterationController::new(config, SequentialDevice::new())?;
/// let report = ctl.run()?;
/// assert_eq!(ctl.state(), RunState::Converged);
/// assert!(report.iterations >= 1);
/// # Ok::<(), relax_engine::RunError>(())
/// ```
pub struct IterationController<D: ComputeDevice> {
    config: RunConfig,
    device: D,
    fields: FieldPair,
    checker: ConvergenceChecker,
    geometry: LaunchGeometry,
    state: RunState,
    iterations: IterationCount,
    bindings: Option<DeviceBindings>,
    last: Option<Convergence>,
    metrics: RunMetrics,
    started: Option<Instant>,
    elapsed: Duration,
}

impl<D: ComputeDevice> IterationController<D> {
    /// Validate `config` and allocate both host fields.
    ///
    /// No device work happens until [`start()`](Self::start).
    pub fn new(config: RunConfig, device: D) -> Result<Self, RunError> {
        config.validate()?;
        let fields = FieldPair::new(config.arena()?)?;
        let checker = ConvergenceChecker::new(config.tolerance()?);
        let geometry = LaunchGeometry::new(config.len, config.work_group_size);
        let metrics = RunMetrics {
            memory_bytes: fields.memory_bytes(),
            ..RunMetrics::default()
        };
        Ok(Self {
            config,
            device,
            fields,
            checker,
            geometry,
            state: RunState::Idle,
            iterations: IterationCount::default(),
            bindings: None,
            last: None,
            metrics,
            started: None,
            elapsed: Duration::ZERO,
        })
    }

    /// `Idle → Running`: initialise the fields, upload them, and compile
    /// the kernel for both role assignments.
    ///
    /// # Errors
    ///
    /// [`RunError::Setup`] if the device rejects any step; the controller
    /// is then `Aborted` and no iteration has run.
    pub fn start(&mut self) -> Result<(), RunError> {
        if self.state != RunState::Idle {
            return Err(self.invalid("start"));
        }
        let t0 = Instant::now();
        self.started = Some(t0);
        self.fields.initialise();
        self.iterations = IterationCount::default();
        self.last = None;

        match self.prepare_device() {
            Ok(bindings) => {
                self.bindings = Some(bindings);
                self.metrics.setup_us = micros(t0.elapsed());
                self.state = RunState::Running;
                let info = self.device.info();
                info!(
                    len = self.config.len,
                    work_group_size = self.config.work_group_size,
                    eps = self.config.eps,
                    device = %info.name,
                    parallelism = info.parallelism,
                    "run started"
                );
                Ok(())
            }
            Err(e) => {
                let err = RunError::Setup(e);
                self.abort(&err);
                Err(err)
            }
        }
    }

    fn prepare_device(&mut self) -> Result<DeviceBindings, SetupError> {
        let n = self.fields.len();
        let count = u32::try_from(n).map_err(|_| SetupError::DeviceUnavailable {
            reason: format!("field length {n} exceeds u32::MAX"),
        })?;
        let a = self.device.allocate(n)?;
        let b = self.device.allocate(n)?;
        self.device.upload(a, self.fields.field_a().as_slice())?;
        self.device.upload(b, self.fields.field_b().as_slice())?;

        let source = KernelSource::relax();
        let bind = |input, output| {
            [
                KernelArg::Buffer(input),
                KernelArg::Buffer(output),
                KernelArg::Uint(count),
            ]
        };
        let forward = self
            .device
            .compile(&source, StencilKernel::ENTRY_POINT, &bind(a, b))?;
        let backward = self
            .device
            .compile(&source, StencilKernel::ENTRY_POINT, &bind(b, a))?;
        debug!(%a, %b, %forward, %backward, "device prepared");
        Ok(DeviceBindings {
            buffers: [a, b],
            kernels: [forward, backward],
        })
    }

    /// `Running → Running | Converged`: one stencil application.
    ///
    /// Dispatches the kernel bound to the current role assignment, reads
    /// the written buffer back into the host write field, checks
    /// convergence against the read field, then swaps roles.
    ///
    /// # Errors
    ///
    /// - [`RunError::Dispatch`] if the device fails; the run is aborted.
    /// - [`RunError::IterationLimit`] if this application reached
    ///   `max_iterations` without converging; the run is aborted.
    /// - [`RunError::InvalidState`] unless the controller is `Running`.
    pub fn step(&mut self) -> Result<StepOutcome, RunError> {
        if self.state != RunState::Running {
            return Err(self.invalid("step"));
        }
        let Some(bindings) = self.bindings else {
            return Err(self.invalid("step"));
        };
        let step_start = Instant::now();
        let iteration = self.iterations.next();

        let convergence = match self.apply_once(bindings, iteration) {
            Ok(c) => c,
            Err(err) => {
                self.abort(&err);
                return Err(err);
            }
        };
        self.iterations = iteration;
        self.last = Some(convergence);
        self.metrics.steps += 1;
        self.metrics.last_step_us = micros(step_start.elapsed());
        trace!(
            iteration = iteration.0,
            max_delta = convergence.max_delta,
            stable = convergence.stable,
            "step"
        );

        let outcome = StepOutcome {
            iteration,
            parity: self.fields.parity(),
            convergence,
        };
        if convergence.stable {
            self.state = RunState::Converged;
            self.elapsed = self.started.map(|t| t.elapsed()).unwrap_or_default();
            info!(
                iterations = iteration.0,
                max_delta = convergence.max_delta,
                elapsed_ms = self.elapsed.as_secs_f64() * 1_000.0,
                "converged"
            );
            return Ok(outcome);
        }
        if let Some(limit) = self.config.max_iterations {
            if iteration.0 >= limit {
                let err = RunError::IterationLimit {
                    limit,
                    max_delta: convergence.max_delta,
                };
                self.abort(&err);
                return Err(err);
            }
        }
        Ok(outcome)
    }

    fn apply_once(
        &mut self,
        bindings: DeviceBindings,
        iteration: IterationCount,
    ) -> Result<Convergence, RunError> {
        let dispatch_err = |source| RunError::Dispatch { iteration, source };
        let parity = self.fields.parity();

        let t = Instant::now();
        self.device
            .dispatch(bindings.kernel(parity), self.geometry)
            .map_err(dispatch_err)?;
        self.metrics.dispatch_us += micros(t.elapsed());

        let t = Instant::now();
        let mut guard = self.fields.begin_swap();
        self.device
            .read_back(bindings.write_buffer(parity), guard.write.as_mut_slice())
            .map_err(dispatch_err)?;
        self.metrics.read_back_us += micros(t.elapsed());

        let t = Instant::now();
        let convergence = self
            .checker
            .assess(guard.read.as_slice(), guard.write.as_slice());
        self.metrics.convergence_us += micros(t.elapsed());

        self.fields.publish()?;
        Ok(convergence)
    }

    /// Start if idle, then step until converged.
    ///
    /// # Errors
    ///
    /// Any error from [`start()`](Self::start) or [`step()`](Self::step);
    /// [`RunError::InvalidState`] if the run was already aborted.
    pub fn run(&mut self) -> Result<RunReport, RunError> {
        if self.state == RunState::Idle {
            self.start()?;
        }
        while self.state == RunState::Running {
            self.step()?;
        }
        self.report()
    }

    /// Summary of a converged run.
    pub fn report(&self) -> Result<RunReport, RunError> {
        if self.state != RunState::Converged {
            return Err(self.invalid("report"));
        }
        Ok(RunReport {
            iterations: self.iterations.0,
            final_max_delta: self.last.map_or(f64::NAN, |c| c.max_delta),
            elapsed: self.elapsed,
            device_stats: self.device.stats(),
            device: self.device.info(),
            metrics: self.metrics.clone(),
        })
    }

    fn abort(&mut self, err: &RunError) {
        warn!(iteration = self.iterations.0, error = %err, "run aborted");
        self.state = RunState::Aborted;
        self.elapsed = self.started.map(|t| t.elapsed()).unwrap_or_default();
    }

    fn invalid(&self, operation: &'static str) -> RunError {
        RunError::InvalidState {
            state: self.state,
            operation,
        }
    }

    // ── Accessors ───────────────────────────────────────────────

    /// Current lifecycle state.
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Applications completed since `start()`.
    pub fn iterations(&self) -> IterationCount {
        self.iterations
    }

    /// Current role assignment. Equals `iterations() mod 2`.
    pub fn parity(&self) -> Parity {
        self.fields.parity()
    }

    /// Both host fields.
    pub fn fields(&self) -> &FieldPair {
        &self.fields
    }

    /// The field the next step reads: the latest result once a step ran.
    pub fn read_field(&self) -> &Field {
        self.fields.read_field()
    }

    /// The field the next step writes: the previous result once two
    /// steps ran.
    pub fn write_field(&self) -> &Field {
        self.fields.write_field()
    }

    /// Convergence of the most recent step.
    pub fn last_convergence(&self) -> Option<Convergence> {
        self.last
    }

    /// Controller-side timings.
    pub fn metrics(&self) -> &RunMetrics {
        &self.metrics
    }

    /// The validated configuration.
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// The device.
    pub fn device(&self) -> &D {
        &self.device
    }

    /// Wall-clock time since `start()`, frozen once the run ends.
    pub fn elapsed(&self) -> Duration {
        match (self.state, self.started) {
            (RunState::Running, Some(t)) => t.elapsed(),
            _ => self.elapsed,
        }
    }

    /// Consume the controller, returning the host fields and the device.
    pub fn into_parts(self) -> (FieldPair, D) {
        (self.fields, self.device)
    }
}

impl<D: ComputeDevice> fmt::Debug for IterationController<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IterationController")
            .field("state", &self.state)
            .field("iterations", &self.iterations)
            .field("parity", &self.fields.parity())
            .field("len", &self.fields.len())
            .field("device", &self.device.info().name)
            .finish()
    }
}

fn micros(d: Duration) -> u64 {
    u64::try_from(d.as_micros()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use relax_device::SequentialDevice;

    fn controller(len: usize) -> IterationController<SequentialDevice> {
        IterationController::new(RunConfig::new(len), SequentialDevice::new()).unwrap()
    }

    #[test]
    fn new_controller_is_idle() {
        let ctl = controller(5);
        assert_eq!(ctl.state(), RunState::Idle);
        assert_eq!(ctl.iterations(), IterationCount(0));
        assert_eq!(ctl.parity(), Parity::Even);
        assert_eq!(ctl.metrics().memory_bytes, 2 * 5 * 8);
    }

    #[test]
    fn invalid_config_is_rejected_before_allocation() {
        let err = IterationController::new(RunConfig::new(2), SequentialDevice::new()).unwrap_err();
        assert!(matches!(err, RunError::Config(ConfigError::FieldTooShort { len: 2 })));
    }

    #[test]
    fn step_before_start_is_refused() {
        let mut ctl = controller(5);
        assert_eq!(
            ctl.step(),
            Err(RunError::InvalidState {
                state: RunState::Idle,
                operation: "step"
            })
        );
        assert_eq!(ctl.state(), RunState::Idle);
    }

    #[test]
    fn start_twice_is_refused() {
        let mut ctl = controller(5);
        ctl.start().unwrap();
        assert_eq!(ctl.state(), RunState::Running);
        assert!(matches!(
            ctl.start(),
            Err(RunError::InvalidState {
                state: RunState::Running,
                ..
            })
        ));
    }

    #[test]
    fn first_step_matches_hand_computation() {
        let mut ctl = controller(5);
        ctl.start().unwrap();
        let outcome = ctl.step().unwrap();
        assert_eq!(outcome.iteration, IterationCount(1));
        assert_eq!(outcome.parity, Parity::Odd);
        assert_eq!(outcome.convergence.max_delta, 25.0);
        assert!(!outcome.converged());
        assert_eq!(ctl.read_field().as_slice(), &[100.0, 25.0, 0.0, 0.0, 0.0]);
        assert_eq!(ctl.write_field().as_slice(), &[100.0, 0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn run_converges_and_refuses_further_steps() {
        let mut ctl = controller(5);
        let report = ctl.run().unwrap();
        assert_eq!(ctl.state(), RunState::Converged);
        assert_eq!(report.iterations, ctl.iterations().0);
        assert!(report.final_max_delta <= 0.1);
        assert_eq!(report.device_stats.dispatches, report.iterations);
        assert!(matches!(
            ctl.step(),
            Err(RunError::InvalidState {
                state: RunState::Converged,
                ..
            })
        ));
        // A second run() on a converged controller just reports again.
        assert_eq!(ctl.run().unwrap().iterations, report.iterations);
    }

    #[test]
    fn report_requires_convergence() {
        let ctl = controller(5);
        assert!(matches!(
            ctl.report(),
            Err(RunError::InvalidState { operation: "report", .. })
        ));
    }

    #[test]
    fn run_error_display_and_source() {
        let err = RunError::Dispatch {
            iteration: IterationCount(7),
            source: DispatchError::InvalidWorkGroup { local: 0 },
        };
        assert_eq!(
            err.to_string(),
            "iteration 7: work-group size must be at least 1, got 0"
        );
        assert!(err.source().is_some());
        let err = RunError::InvalidState {
            state: RunState::Aborted,
            operation: "step",
        };
        assert_eq!(err.to_string(), "cannot step while aborted");
        assert!(err.source().is_none());
    }
}
