//! Double-buffered ping-pong field pair.
//!
//! [`FieldPair`] owns two same-length fields, A and B, that alternate
//! between the "read" role (the immutable source of one stencil
//! application) and the "write" role (its destination). On
//! [`FieldPair::publish`], the freshly written field becomes the next read
//! source and the old source becomes the next destination.
//!
//! The lifecycle per iteration is:
//! 1. `begin_swap()`: borrow the read field immutably and the write field
//!    mutably as a [`SwapGuard`]
//! 2. the caller fills the write field (directly or by device read-back)
//!    and compares the two for convergence
//! 3. `publish()`: flip parity, advance the generation

use relax_core::{BoundaryCondition, Field};

use crate::config::ArenaConfig;
use crate::error::ArenaError;

/// Which field currently holds the read role.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Parity {
    /// A is read, B is written.
    #[default]
    Even,
    /// B is read, A is written.
    Odd,
}

impl Parity {
    /// The parity after `iterations` completed swaps from `Even`.
    pub fn after(iterations: u64) -> Self {
        if iterations % 2 == 0 {
            Self::Even
        } else {
            Self::Odd
        }
    }

    /// The opposite parity.
    pub fn flip(self) -> Self {
        match self {
            Self::Even => Self::Odd,
            Self::Odd => Self::Even,
        }
    }

    /// `0` for `Even`, `1` for `Odd`.
    pub fn index(self) -> usize {
        match self {
            Self::Even => 0,
            Self::Odd => 1,
        }
    }
}

/// Split borrow of a [`FieldPair`] for the duration of one iteration.
///
/// Created by [`FieldPair::begin_swap()`]. Holds the only mutable borrow
/// of the write field, so the read field cannot be modified while the
/// guard lives.
#[must_use]
pub struct SwapGuard<'a> {
    /// Source of this iteration.
    pub read: &'a Field,
    /// Destination of this iteration.
    pub write: &'a mut Field,
    /// Role assignment this guard was created under.
    pub parity: Parity,
}

/// Two same-length fields with alternating read/write roles.
///
/// # Buffer layout
///
/// ```text
/// field_a  ←─── read (even parity) / write (odd parity)
/// field_b  ←─── write (even parity) / read (odd parity)
/// ```
#[derive(Debug)]
pub struct FieldPair {
    field_a: Field,
    field_b: Field,
    parity: Parity,
    /// Number of completed publishes since the last initialise.
    generation: u64,
    /// `begin_swap()` called, `publish()` not yet called.
    swap_in_progress: bool,
    config: ArenaConfig,
}

impl FieldPair {
    /// Allocate both fields and apply the configured initial condition.
    pub fn new(config: ArenaConfig) -> Result<Self, ArenaError> {
        config.validate()?;
        let field_a = Field::initialised(config.len, &config.boundary)?;
        let field_b = field_a.clone();
        Ok(Self {
            field_a,
            field_b,
            parity: Parity::Even,
            generation: 0,
            swap_in_progress: false,
            config,
        })
    }

    /// Pair two existing fields, A starting in the read role.
    ///
    /// The boundary condition recorded in the config is read from `a`.
    pub fn from_fields(a: Field, b: Field) -> Result<Self, ArenaError> {
        if a.len() != b.len() {
            return Err(ArenaError::LengthMismatch {
                a: a.len(),
                b: b.len(),
            });
        }
        let (left, right) = a.boundary();
        let config =
            ArenaConfig::new(a.len()).with_boundary(BoundaryCondition::new(left, right)?);
        Ok(Self {
            field_a: a,
            field_b: b,
            parity: Parity::Even,
            generation: 0,
            swap_in_progress: false,
            config,
        })
    }

    /// Re-apply the initial condition to both fields and reset the roles.
    ///
    /// Reuses the existing allocations.
    pub fn initialise(&mut self) {
        self.config.boundary.initialise(&mut self.field_a);
        self.config.boundary.initialise(&mut self.field_b);
        self.parity = Parity::Even;
        self.generation = 0;
        self.swap_in_progress = false;
    }

    /// Borrow the current read field and write field for one iteration.
    pub fn begin_swap(&mut self) -> SwapGuard<'_> {
        self.swap_in_progress = true;
        let parity = self.parity;
        let (read, write) = match parity {
            Parity::Even => (&self.field_a, &mut self.field_b),
            Parity::Odd => (&self.field_b, &mut self.field_a),
        };
        SwapGuard {
            read,
            write,
            parity,
        }
    }

    /// Make the write field the next read field.
    ///
    /// Returns `Err` if `begin_swap()` was not called first or if
    /// `publish()` is called twice without an intervening `begin_swap()`.
    pub fn publish(&mut self) -> Result<(), ArenaError> {
        if !self.swap_in_progress {
            return Err(ArenaError::NoSwapInProgress);
        }
        self.swap_in_progress = false;
        self.parity = self.parity.flip();
        self.generation += 1;
        Ok(())
    }

    /// `(read, write)` under the current parity.
    pub fn roles(&self) -> (&Field, &Field) {
        match self.parity {
            Parity::Even => (&self.field_a, &self.field_b),
            Parity::Odd => (&self.field_b, &self.field_a),
        }
    }

    /// The field the next iteration will read from.
    ///
    /// After a publish this holds the most recent stencil output.
    pub fn read_field(&self) -> &Field {
        self.roles().0
    }

    /// The field the next iteration will write into.
    pub fn write_field(&self) -> &Field {
        self.roles().1
    }

    /// Field A regardless of role.
    pub fn field_a(&self) -> &Field {
        &self.field_a
    }

    /// Field B regardless of role.
    pub fn field_b(&self) -> &Field {
        &self.field_b
    }

    /// Current role assignment.
    pub fn parity(&self) -> Parity {
        self.parity
    }

    /// Number of publishes since construction or the last initialise.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Cells per field.
    pub fn len(&self) -> usize {
        self.field_a.len()
    }

    /// Always false: fields have at least three cells.
    pub fn is_empty(&self) -> bool {
        self.field_a.is_empty()
    }

    /// Bytes held by both fields.
    pub fn memory_bytes(&self) -> usize {
        self.field_a.memory_bytes() + self.field_b.memory_bytes()
    }

    /// The arena configuration.
    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    /// Consume the pair, returning `(A, B)`.
    pub fn into_fields(self) -> (Field, Field) {
        (self.field_a, self.field_b)
    }
}
