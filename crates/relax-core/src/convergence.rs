//! Convergence test between two successive fields.
//!
//! Only interior cells are compared: boundary cells are held fixed by the
//! stencil and carry no information about convergence. A NaN difference
//! is never within tolerance.

use crate::field::Tolerance;

/// True iff `|old[i] - new[i]| <= eps` for every interior index `i`.
///
/// Returns `false` when the slices differ in length or when `eps` is
/// negative or NaN.
pub fn is_stable(old: &[f64], new: &[f64], eps: f64) -> bool {
    if old.len() != new.len() || !(eps >= 0.0) {
        return false;
    }
    if old.len() < 3 {
        return true;
    }
    let last = old.len() - 1;
    old[1..last]
        .iter()
        .zip(&new[1..last])
        .all(|(a, b)| (a - b).abs() <= eps)
}

/// Largest `|old[i] - new[i]|` over interior indices.
///
/// NaN if any interior difference is NaN or the lengths differ; `0.0`
/// when there is no interior.
pub fn max_interior_delta(old: &[f64], new: &[f64]) -> f64 {
    if old.len() != new.len() {
        return f64::NAN;
    }
    if old.len() < 3 {
        return 0.0;
    }
    let last = old.len() - 1;
    let mut max = 0.0f64;
    for (a, b) in old[1..last].iter().zip(&new[1..last]) {
        let d = (a - b).abs();
        if d.is_nan() {
            return f64::NAN;
        }
        if d > max {
            max = d;
        }
    }
    max
}

/// Outcome of a full convergence assessment.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Convergence {
    /// Whether every interior difference is within tolerance.
    pub stable: bool,
    /// Largest interior difference (NaN if any difference was NaN).
    pub max_delta: f64,
}

/// Convergence predicate bound to a fixed tolerance.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ConvergenceChecker {
    eps: Tolerance,
}

impl ConvergenceChecker {
    /// Create a checker for tolerance `eps`.
    pub fn new(eps: Tolerance) -> Self {
        Self { eps }
    }

    /// The tolerance this checker compares against.
    pub fn tolerance(&self) -> Tolerance {
        self.eps
    }

    /// See [`is_stable`].
    pub fn is_stable(&self, old: &[f64], new: &[f64]) -> bool {
        is_stable(old, new, self.eps.value())
    }

    /// Full pass computing both the predicate and the largest difference.
    ///
    /// `assess(a, b).stable == is_stable(a, b)` for all inputs.
    pub fn assess(&self, old: &[f64], new: &[f64]) -> Convergence {
        let max_delta = max_interior_delta(old, new);
        Convergence {
            stable: max_delta <= self.eps.value(),
            max_delta,
        }
    }
}
