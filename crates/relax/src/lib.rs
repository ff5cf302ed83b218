//! Relax: double-buffered one-dimensional heat relaxation.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all relax sub-crates. For most users, adding `relax` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use relax::prelude::*;
//!
//! // 10 cells, 100.0 on the left, 0.0 on the right, eps = 0.1.
//! let config = RunConfig::new(10).with_work_group_size(4);
//! let mut ctl = IterationController::new(config, SequentialDevice::new()).unwrap();
//! let report = ctl.run().unwrap();
//!
//! assert_eq!(report.iterations, 97);
//! assert_eq!(ctl.read_field().boundary(), (100.0, 0.0));
//! assert!(is_stable(
//!     ctl.write_field().as_slice(),
//!     ctl.read_field().as_slice(),
//!     0.1,
//! ));
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `relax-core` | Field model, stencil, convergence, handles, device errors |
//! | [`arena`] | `relax-arena` | `FieldPair` and parity |
//! | [`device`] | `relax-device` | `ComputeDevice` trait and in-process devices |
//! | [`engine`] | `relax-engine` | Iteration controller, configuration, reports |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Field model, stencil kernel, convergence check, and errors (`relax-core`).
pub use relax_core as types;

/// Double-buffered field storage (`relax-arena`).
///
/// [`arena::FieldPair`] owns both fields; [`arena::Parity`] says which one
/// is read.
pub use relax_arena as arena;

/// Compute devices (`relax-device`).
///
/// Implement [`device::ComputeDevice`] to run the stencil somewhere new;
/// [`device::SequentialDevice`] and [`device::ThreadPoolDevice`] are
/// provided.
pub use relax_device as device;

/// The iteration controller (`relax-engine`).
pub use relax_engine as engine;

/// Common imports for typical relax usage.
///
/// ```rust
/// use relax::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use relax_core::{
        is_stable, BoundaryCondition, Convergence, ConvergenceChecker, Field, IterationCount,
        StencilKernel, Tolerance,
    };

    // Errors
    pub use relax_core::{DispatchError, SetupError};

    // Arena
    pub use relax_arena::{FieldPair, Parity};

    // Devices
    pub use relax_device::{
        ComputeDevice, KernelSource, LaunchGeometry, SequentialDevice, ThreadPoolDevice,
        ThreadPoolOptions,
    };

    // Engine
    pub use relax_engine::{
        ConfigError, DeviceSelection, IterationController, RunConfig, RunError, RunMetrics,
        RunReport, RunState, StepOutcome,
    };
}
