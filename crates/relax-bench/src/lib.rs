//! Benchmark profiles and utilities for the relax workspace.
//!
//! Provides pre-built [`RunConfig`] profiles for benchmarks:
//!
//! - [`reference_profile`]: 10K cells, stepped to convergence
//! - [`stress_profile`]: 1M cells, capped iteration count
//! - [`noisy_field`]: seeded random field for kernel micro-benchmarks

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use relax_engine::{DeviceSelection, RunConfig};

/// 10 000 cells, default heat and tolerance, looser `eps = 1.0` so a
/// full run finishes in benchmark time.
pub fn reference_profile(device: DeviceSelection) -> RunConfig {
    RunConfig::new(10_000).with_eps(1.0).with_device(device)
}

/// 1 000 000 cells with a 100-iteration cap.
///
/// The step function does not converge within the cap at this size, so a
/// run ends in `IterationLimit`; benchmarks measure the per-step cost.
pub fn stress_profile(device: DeviceSelection) -> RunConfig {
    RunConfig::new(1_000_000)
        .with_max_iterations(100)
        .with_device(device)
}

/// `len` values uniform in `[0, 100)` from a seeded ChaCha8 generator.
pub fn noisy_field(len: usize, seed: u64) -> Vec<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..len).map(|_| rng.random_range(0.0..100.0)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profiles_validate() {
        assert!(reference_profile(DeviceSelection::Sequential).validate().is_ok());
        assert!(stress_profile(DeviceSelection::default()).validate().is_ok());
    }

    #[test]
    fn noisy_field_is_deterministic() {
        assert_eq!(noisy_field(64, 3), noisy_field(64, 3));
        assert!(noisy_field(64, 3).iter().all(|v| (0.0..100.0).contains(v)));
    }
}
