//! Core types for the relax workspace.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the field model, the three-point stencil update rule, the convergence
//! predicate, typed handles, and the error types shared by devices and
//! the iteration controller.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod convergence;
pub mod error;
pub mod field;
pub mod id;
pub mod kernel;

pub use convergence::{is_stable, max_interior_delta, Convergence, ConvergenceChecker};
pub use error::{DispatchError, SetupError};
pub use field::{BoundaryCondition, Field, FieldError, Tolerance, DEFAULT_HEAT};
pub use id::{BufferHandle, IterationCount, KernelHandle};
pub use kernel::{apply, relax_cell, StencilKernel};
