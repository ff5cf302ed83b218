//! Compute-device interface for relax.
//!
//! The [`ComputeDevice`] trait is the narrow capability the iteration
//! controller needs from a data-parallel executor: allocate and upload
//! buffers, compile a kernel entry point against concrete buffer
//! bindings, dispatch it over a one-dimensional index range, and read
//! results back to the host.
//!
//! Two in-process devices are provided:
//!
//! - [`SequentialDevice`] evaluates work-groups one after another on the
//!   calling thread. It is the reference every other device must match
//!   bit-for-bit.
//! - [`ThreadPoolDevice`] evaluates work-groups concurrently on a `rayon`
//!   pool.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod device;
pub mod program;
mod registry;
pub mod sequential;
pub mod thread_pool;

pub use device::{ComputeDevice, DeviceInfo, DeviceKind, DeviceStats, LaunchGeometry};
pub use program::{CellFn, EntryPoint, KernelArg, KernelSource, ParamKind};
pub use sequential::SequentialDevice;
pub use thread_pool::{ThreadPoolDevice, ThreadPoolOptions};
