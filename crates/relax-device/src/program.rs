//! Kernel programs: named entry points with typed parameter signatures.
//!
//! A [`KernelSource`] plays the role of device source text. Each
//! [`EntryPoint`] declares its parameters and carries the per-index pure
//! function the device evaluates as `out[i] = cell(in, i)`. Compiling an
//! entry point against concrete [`KernelArg`]s produces a
//! [`KernelHandle`](relax_core::KernelHandle) that is reused every
//! iteration.

use smallvec::SmallVec;

use relax_core::{relax_cell, BufferHandle, StencilKernel};

/// Per-index pure update: the new value of cell `i` given the input field.
///
/// Must read only from its argument and must not depend on evaluation
/// order.
pub type CellFn = fn(&[f64], usize) -> f64;

/// Kind of a kernel parameter slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ParamKind {
    /// Read-only global buffer.
    InputBuffer,
    /// Write-only global buffer.
    OutputBuffer,
    /// Unsigned element count; must equal the bound buffer length.
    UintConst,
}

impl ParamKind {
    /// Short description used in error messages.
    pub fn describe(self) -> &'static str {
        match self {
            Self::InputBuffer => "input buffer",
            Self::OutputBuffer => "output buffer",
            Self::UintConst => "uint constant",
        }
    }
}

/// A concrete argument bound to a parameter slot at compile time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KernelArg {
    /// A device buffer.
    Buffer(BufferHandle),
    /// An unsigned constant.
    Uint(u32),
}

/// A kernel entry point.
#[derive(Clone, Debug)]
pub struct EntryPoint {
    name: String,
    params: SmallVec<[ParamKind; 4]>,
    cell: CellFn,
}

impl EntryPoint {
    /// Declare an entry point.
    pub fn new(name: impl Into<String>, params: &[ParamKind], cell: CellFn) -> Self {
        Self {
            name: name.into(),
            params: SmallVec::from_slice(params),
            cell,
        }
    }

    /// Entry point name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared parameter kinds, in order.
    pub fn params(&self) -> &[ParamKind] {
        &self.params
    }

    /// The per-index update function.
    pub fn cell(&self) -> CellFn {
        self.cell
    }
}

/// A named kernel program containing one or more entry points.
#[derive(Clone, Debug)]
pub struct KernelSource {
    name: String,
    entry_points: SmallVec<[EntryPoint; 2]>,
}

impl KernelSource {
    /// An empty program.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entry_points: SmallVec::new(),
        }
    }

    /// Add an entry point, replacing any existing one with the same name.
    pub fn with_entry_point(mut self, entry: EntryPoint) -> Self {
        self.entry_points.retain(|e| e.name != entry.name);
        self.entry_points.push(entry);
        self
    }

    /// The heat-relaxation program: `relax(in, out, count)`.
    pub fn relax() -> Self {
        Self::new("relax").with_entry_point(EntryPoint::new(
            StencilKernel::ENTRY_POINT,
            &[
                ParamKind::InputBuffer,
                ParamKind::OutputBuffer,
                ParamKind::UintConst,
            ],
            relax_cell,
        ))
    }

    /// Program name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up an entry point by name.
    pub fn entry_point(&self, name: &str) -> Option<&EntryPoint> {
        self.entry_points.iter().find(|e| e.name == name)
    }

    /// All entry points, in insertion order.
    pub fn entry_points(&self) -> impl Iterator<Item = &EntryPoint> {
        self.entry_points.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn copy_cell(input: &[f64], i: usize) -> f64 {
        input[i]
    }

    #[test]
    fn relax_program_declares_three_params() {
        let src = KernelSource::relax();
        assert_eq!(src.name(), "relax");
        let entry = src.entry_point("relax").unwrap();
        assert_eq!(
            entry.params(),
            &[
                ParamKind::InputBuffer,
                ParamKind::OutputBuffer,
                ParamKind::UintConst
            ]
        );
        let input = [100.0, 0.0, 0.0];
        assert_eq!((entry.cell())(&input, 1), 25.0);
    }

    #[test]
    fn missing_entry_point_is_none() {
        assert!(KernelSource::relax().entry_point("smooth").is_none());
    }

    #[test]
    fn with_entry_point_replaces_same_name() {
        let src = KernelSource::relax().with_entry_point(EntryPoint::new(
            "relax",
            &[ParamKind::InputBuffer, ParamKind::OutputBuffer],
            copy_cell,
        ));
        assert_eq!(src.entry_points().count(), 1);
        assert_eq!(src.entry_point("relax").unwrap().params().len(), 2);
    }

    #[test]
    fn param_kinds_describe_themselves() {
        assert_eq!(ParamKind::UintConst.describe(), "uint constant");
        assert_eq!(ParamKind::InputBuffer.describe(), "input buffer");
    }
}
