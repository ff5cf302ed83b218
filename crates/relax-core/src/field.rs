//! The one-dimensional field, its boundary condition, and the tolerance.
//!
//! A [`Field`] is a fixed-length vector of `f64`. Index 0 and index
//! `len - 1` are boundary cells held fixed by the stencil; everything in
//! between is interior and evolves. Fields are allocated once and never
//! resized.

use std::error::Error;
use std::fmt;

/// Default heat value on the left boundary.
pub const DEFAULT_HEAT: f64 = 100.0;

/// Minimum field length with a non-empty interior.
pub const MIN_FIELD_LEN: usize = 3;

/// Errors from constructing field-model values.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldError {
    /// Field too short to have any interior cell.
    TooShort {
        /// The rejected length.
        len: usize,
    },
    /// Tolerance is negative, NaN, or infinite.
    InvalidTolerance {
        /// The rejected value.
        value: f64,
    },
    /// A boundary value is NaN or infinite.
    NonFiniteBoundary {
        /// Which end (`"left"` or `"right"`).
        side: &'static str,
        /// The rejected value.
        value: f64,
    },
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooShort { len } => write!(
                f,
                "field length {len} is below the minimum of {MIN_FIELD_LEN}"
            ),
            Self::InvalidTolerance { value } => {
                write!(f, "tolerance must be finite and >= 0, got {value}")
            }
            Self::NonFiniteBoundary { side, value } => {
                write!(f, "{side} boundary value must be finite, got {value}")
            }
        }
    }
}

impl Error for FieldError {}

/// Convergence tolerance `eps`.
///
/// Finite and non-negative; immutable once constructed.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub struct Tolerance(f64);

impl Tolerance {
    /// Default tolerance used by the reference configuration.
    pub const DEFAULT: Tolerance = Tolerance(0.1);

    /// Validate and wrap a tolerance.
    pub fn new(eps: f64) -> Result<Self, FieldError> {
        if eps.is_finite() && eps >= 0.0 {
            Ok(Self(eps))
        } else {
            Err(FieldError::InvalidTolerance { value: eps })
        }
    }

    /// The raw value.
    pub fn value(self) -> f64 {
        self.0
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for Tolerance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fixed values for the two boundary cells.
///
/// Both ends are written explicitly at initialisation. The right end
/// defaults to `0.0`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundaryCondition {
    /// Value of cell 0.
    pub left: f64,
    /// Value of cell `len - 1`.
    pub right: f64,
}

impl BoundaryCondition {
    /// Validate and build a boundary condition.
    pub fn new(left: f64, right: f64) -> Result<Self, FieldError> {
        if !left.is_finite() {
            return Err(FieldError::NonFiniteBoundary {
                side: "left",
                value: left,
            });
        }
        if !right.is_finite() {
            return Err(FieldError::NonFiniteBoundary {
                side: "right",
                value: right,
            });
        }
        Ok(Self { left, right })
    }

    /// Heat on the left, zero on the right.
    pub fn heated_left(heat: f64) -> Result<Self, FieldError> {
        Self::new(heat, 0.0)
    }

    /// Overwrite `field` with the initial condition: boundaries set,
    /// interior zeroed.
    pub fn initialise(&self, field: &mut Field) {
        let values = field.as_mut_slice();
        values.fill(0.0);
        let last = values.len() - 1;
        values[0] = self.left;
        values[last] = self.right;
    }
}

impl Default for BoundaryCondition {
    fn default() -> Self {
        Self {
            left: DEFAULT_HEAT,
            right: 0.0,
        }
    }
}

/// A fixed-length one-dimensional field of `f64` values.
#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    values: Vec<f64>,
}

impl Field {
    /// Allocate a zero-filled field of `len` cells.
    pub fn zeroed(len: usize) -> Result<Self, FieldError> {
        if len < MIN_FIELD_LEN {
            return Err(FieldError::TooShort { len });
        }
        Ok(Self {
            values: vec![0.0; len],
        })
    }

    /// Allocate a field and apply `boundary` as its initial condition.
    pub fn initialised(len: usize, boundary: &BoundaryCondition) -> Result<Self, FieldError> {
        let mut field = Self::zeroed(len)?;
        boundary.initialise(&mut field);
        Ok(field)
    }

    /// Wrap existing values.
    pub fn from_vec(values: Vec<f64>) -> Result<Self, FieldError> {
        if values.len() < MIN_FIELD_LEN {
            return Err(FieldError::TooShort { len: values.len() });
        }
        Ok(Self { values })
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Always false: construction rejects short fields.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// All cells.
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// All cells, mutably. The length cannot change through this slice.
    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.values
    }

    /// Interior cells `1..len-1`.
    pub fn interior(&self) -> &[f64] {
        &self.values[1..self.values.len() - 1]
    }

    /// `(field[0], field[len - 1])`.
    pub fn boundary(&self) -> (f64, f64) {
        (self.values[0], self.values[self.values.len() - 1])
    }

    /// Size of the backing storage in bytes.
    pub fn memory_bytes(&self) -> usize {
        self.values.len() * std::mem::size_of::<f64>()
    }

    /// Consume the field, returning its values.
    pub fn into_vec(self) -> Vec<f64> {
        self.values
    }
}

/// Prints `< v0 v1 ... >` with six decimals per value.
impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<")?;
        for v in &self.values {
            write!(f, " {v:.6}")?;
        }
        write!(f, ">")
    }
}
