//! Integration test: device failures and the iteration cap.
//!
//! A failing device must abort the run with the iteration it failed in,
//! setup failures must happen before any dispatch, and an exhausted
//! iteration cap must surface as `IterationLimit`.

use relax_core::{DispatchError, IterationCount, SetupError};
use relax_engine::{IterationController, RunConfig, RunError, RunState};
use relax_test_utils::fixtures::{reference_run, step_field};
use relax_test_utils::{FailingDevice, FailurePoint};

fn failing(len: usize, point: FailurePoint) -> IterationController<FailingDevice> {
    IterationController::new(RunConfig::new(len), FailingDevice::new(point)).unwrap()
}

#[test]
fn dispatch_failure_aborts_with_iteration_number() {
    let mut ctl = failing(10, FailurePoint::DispatchAfter(3));
    let err = ctl.run().unwrap_err();
    match &err {
        RunError::Dispatch { iteration, source } => {
            assert_eq!(*iteration, IterationCount(4));
            assert!(matches!(source, DispatchError::ExecutionFailed { .. }));
        }
        other => panic!("expected Dispatch error, got {other:?}"),
    }
    assert_eq!(ctl.state(), RunState::Aborted);
    assert_eq!(ctl.iterations(), IterationCount(3));
    assert_eq!(ctl.device().dispatch_calls(), 4);
}

#[test]
fn read_back_failure_aborts_first_iteration() {
    let mut ctl = failing(10, FailurePoint::ReadBackAfter(0));
    ctl.start().unwrap();
    let err = ctl.step().unwrap_err();
    assert!(matches!(
        err,
        RunError::Dispatch {
            iteration: IterationCount(1),
            ..
        }
    ));
    assert_eq!(ctl.iterations(), IterationCount(0));
    assert_eq!(ctl.state(), RunState::Aborted);
}

#[test]
fn aborted_controller_refuses_everything() {
    let mut ctl = failing(10, FailurePoint::DispatchAfter(0));
    assert!(ctl.run().is_err());
    assert_eq!(
        ctl.step(),
        Err(RunError::InvalidState {
            state: RunState::Aborted,
            operation: "step"
        })
    );
    assert!(matches!(
        ctl.run(),
        Err(RunError::InvalidState {
            state: RunState::Aborted,
            ..
        })
    ));
    assert!(matches!(
        ctl.start(),
        Err(RunError::InvalidState { .. })
    ));
}

#[test]
fn compile_failure_happens_before_any_dispatch() {
    let mut ctl = failing(10, FailurePoint::Compile);
    let err = ctl.run().unwrap_err();
    assert!(matches!(
        err,
        RunError::Setup(SetupError::DeviceUnavailable { .. })
    ));
    assert_eq!(ctl.state(), RunState::Aborted);
    assert_eq!(ctl.iterations(), IterationCount(0));
    assert_eq!(ctl.device().dispatch_calls(), 0);
}

#[test]
fn upload_failure_happens_before_any_dispatch() {
    let mut ctl = failing(10, FailurePoint::Upload);
    assert!(matches!(ctl.start(), Err(RunError::Setup(_))));
    assert_eq!(ctl.device().dispatch_calls(), 0);
}

#[test]
fn iteration_cap_reports_last_delta() {
    let config = RunConfig::new(10).with_max_iterations(5);
    let mut ctl = IterationController::new(config, FailingDevice::new(FailurePoint::Compile))
        .unwrap();
    // Compile failure wins over the cap: nothing ran.
    assert!(matches!(ctl.run(), Err(RunError::Setup(_))));

    let config = RunConfig::new(10).with_max_iterations(5);
    let mut ctl =
        IterationController::new(config, relax_device::SequentialDevice::new()).unwrap();
    let reference = reference_run(&step_field(10, 100.0), 0.1, Some(5));
    assert_eq!(
        ctl.run(),
        Err(RunError::IterationLimit {
            limit: 5,
            max_delta: reference.max_deltas[4],
        })
    );
    assert_eq!(ctl.iterations(), IterationCount(5));
    assert_eq!(ctl.state(), RunState::Aborted);
    assert_eq!(ctl.read_field().as_slice(), reference.last.as_slice());
}

#[test]
fn cap_equal_to_convergence_point_still_converges() {
    let config = RunConfig::new(10).with_max_iterations(97);
    let mut ctl =
        IterationController::new(config, relax_device::SequentialDevice::new()).unwrap();
    let report = ctl.run().unwrap();
    assert_eq!(report.iterations, 97);
    assert_eq!(ctl.state(), RunState::Converged);
}
