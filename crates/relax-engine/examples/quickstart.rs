//! Relax quickstart: a small run stepped by hand, then a full run.
//!
//! Demonstrates:
//!   1. Building a RunConfig with explicit boundaries
//!   2. Creating an IterationController on the thread-pool device
//!   3. Stepping and reading the host fields
//!   4. Finishing the run and printing the report
//!
//! Run with:
//!   cargo run --example quickstart

use relax_device::ThreadPoolDevice;
use relax_engine::{IterationController, RunConfig, RunError};

fn main() -> Result<(), RunError> {
    let config = RunConfig::new(12)
        .with_heat(100.0)
        .with_right_boundary(25.0)
        .with_eps(0.01)
        .with_work_group_size(4);
    let mut ctl = IterationController::new(config, ThreadPoolDevice::new())?;

    ctl.start()?;
    for _ in 0..5 {
        let outcome = ctl.step()?;
        println!(
            "iteration {:>3}  max delta {:>10.6}  {}",
            outcome.iteration.0,
            outcome.convergence.max_delta,
            ctl.read_field()
        );
    }

    let report = ctl.run()?;
    println!("{}", ctl.read_field());
    println!("{report}");
    Ok(())
}
