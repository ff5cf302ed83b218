//! Double-buffered field storage for relax runs.
//!
//! # Architecture
//!
//! ```text
//! FieldPair (orchestrator)
//! ├── Field A  ←── read role on even iterations, write role on odd
//! ├── Field B  ←── write role on even iterations, read role on odd
//! └── Parity   ←── flipped by publish(), never by copying data
//! ```
//!
//! Both fields are allocated once, initialised once, and then mutated in
//! place through the write role. Swapping roles never moves or copies
//! cell data.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod pingpong;

pub use config::ArenaConfig;
pub use error::ArenaError;
pub use pingpong::{FieldPair, Parity, SwapGuard};
