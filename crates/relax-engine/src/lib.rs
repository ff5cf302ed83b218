//! Iteration controller for relax.
//!
//! Provides [`IterationController`], which runs the double-buffered
//! relaxation loop on any [`ComputeDevice`](relax_device::ComputeDevice):
//! dispatch the stencil with the current role assignment, read the result
//! back, test convergence, swap roles, repeat. The loop always runs at
//! least once and stops the first time every interior delta is within
//! tolerance, or with an error when an optional iteration cap is reached.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod controller;
pub mod metrics;
pub mod report;

pub use config::{ConfigError, DeviceSelection, RunConfig};
pub use controller::{IterationController, RunError, RunState, StepOutcome};
pub use metrics::RunMetrics;
pub use report::RunReport;
