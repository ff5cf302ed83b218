//! Arena configuration parameters.

use relax_core::field::MIN_FIELD_LEN;
use relax_core::BoundaryCondition;

use crate::error::ArenaError;

/// Configuration for a [`FieldPair`](crate::FieldPair).
///
/// Validated at construction; immutable afterwards.
#[derive(Clone, Debug, PartialEq)]
pub struct ArenaConfig {
    /// Number of cells per field, boundaries included.
    ///
    /// Default: 10_000_000. Must be at least 3.
    pub len: usize,

    /// Values written to cells 0 and `len - 1` at initialisation.
    pub boundary: BoundaryCondition,
}

impl ArenaConfig {
    /// Default field length: 10M cells (80MB per field).
    pub const DEFAULT_LEN: usize = 10_000_000;

    /// Create a config for `len` cells with the default boundary condition.
    pub fn new(len: usize) -> Self {
        Self {
            len,
            boundary: BoundaryCondition::default(),
        }
    }

    /// Replace the boundary condition.
    pub fn with_boundary(mut self, boundary: BoundaryCondition) -> Self {
        self.boundary = boundary;
        self
    }

    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), ArenaError> {
        if self.len < MIN_FIELD_LEN {
            return Err(ArenaError::InvalidConfig {
                reason: format!(
                    "len must be >= {MIN_FIELD_LEN} (got {}); a field needs at least one interior cell",
                    self.len
                ),
            });
        }
        Ok(())
    }

    /// Bytes held by both fields together.
    pub fn pair_bytes(&self) -> usize {
        2 * self.len * std::mem::size_of::<f64>()
    }
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_LEN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_ten_million_cells() {
        let config = ArenaConfig::default();
        assert_eq!(config.len, 10_000_000);
        assert_eq!(config.pair_bytes(), 160_000_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn short_lengths_are_rejected() {
        for len in 0..3 {
            let result = ArenaConfig::new(len).validate();
            assert!(
                matches!(result, Err(ArenaError::InvalidConfig { .. })),
                "len={len} should be rejected"
            );
        }
        assert!(ArenaConfig::new(3).validate().is_ok());
    }

    #[test]
    fn with_boundary_replaces_both_ends() {
        let bc = BoundaryCondition::new(1.0, 2.0).unwrap();
        let config = ArenaConfig::new(8).with_boundary(bc);
        assert_eq!(config.boundary, bc);
    }
}
