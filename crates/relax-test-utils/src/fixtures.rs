//! Field fixtures and a host-only reference run.
//!
//! - [`step_field`]: the heated-left step function every run starts from.
//! - [`random_field`]: seeded random interior between fixed boundaries.
//! - [`reference_run`]: the do-while relaxation loop on plain vectors,
//!   used as the oracle for device-backed runs.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use relax_core::{kernel, max_interior_delta, BoundaryCondition, Field};

/// `[heat, 0, 0, ..., 0]` of length `len`.
///
/// # Panics
///
/// If `len < 3` or `heat` is not finite.
pub fn step_field(len: usize, heat: f64) -> Field {
    let bc = BoundaryCondition::heated_left(heat).expect("finite heat");
    Field::initialised(len, &bc).expect("len >= 3")
}

/// Interior values drawn uniformly from `[-100, 100)` with a seeded
/// ChaCha8 generator; boundaries taken from `bc`.
///
/// # Panics
///
/// If `len < 3`.
pub fn random_field(len: usize, bc: &BoundaryCondition, seed: u64) -> Field {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut field = Field::initialised(len, bc).expect("len >= 3");
    let values = field.as_mut_slice();
    for v in &mut values[1..len - 1] {
        *v = rng.random_range(-100.0..100.0);
    }
    field
}

/// Outcome of [`reference_run`].
#[derive(Clone, Debug, PartialEq)]
pub struct ReferenceRun {
    /// Stencil applications performed.
    pub iterations: u64,
    /// Max interior delta of each application, in order.
    pub max_deltas: Vec<f64>,
    /// Field before the last application.
    pub previous: Vec<f64>,
    /// Field after the last application.
    pub last: Vec<f64>,
    /// Whether the loop ended by converging rather than hitting `cap`.
    pub converged: bool,
}

/// Relax `initial` on the host until every interior delta is `<= eps`,
/// or `cap` applications have been made.
///
/// At least one application always happens.
pub fn reference_run(initial: &Field, eps: f64, cap: Option<u64>) -> ReferenceRun {
    let mut read = initial.as_slice().to_vec();
    let mut write = read.clone();
    let mut iterations = 0u64;
    let mut max_deltas = Vec::new();
    loop {
        kernel::apply(&read, &mut write);
        iterations += 1;
        let delta = max_interior_delta(&read, &write);
        max_deltas.push(delta);
        let converged = delta <= eps;
        if converged || cap.is_some_and(|c| iterations >= c) {
            return ReferenceRun {
                iterations,
                max_deltas,
                previous: read,
                last: write,
                converged,
            };
        }
        std::mem::swap(&mut read, &mut write);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_field_shape() {
        assert_eq!(step_field(4, 100.0).as_slice(), &[100.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn random_field_is_seeded() {
        let bc = BoundaryCondition::new(1.0, 2.0).unwrap();
        let a = random_field(16, &bc, 7);
        let b = random_field(16, &bc, 7);
        let c = random_field(16, &bc, 8);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.boundary(), (1.0, 2.0));
    }

    #[test]
    fn reference_run_on_five_cells_converges() {
        let run = reference_run(&step_field(5, 100.0), 0.1, None);
        assert!(run.converged);
        assert!(run.iterations >= 1);
        assert_eq!(run.max_deltas.len() as u64, run.iterations);
        assert!(*run.max_deltas.last().unwrap() <= 0.1);
    }

    #[test]
    fn reference_run_respects_cap() {
        let run = reference_run(&step_field(1000, 100.0), 1e-12, Some(3));
        assert!(!run.converged);
        assert_eq!(run.iterations, 3);
    }
}
