//! Synthetic channel corruption for exercising the receiver's integrity check.
//!
//! [`ErrorInjector`] sits between checksum computation and segment encoding
//! on the sender.  With probability `error_probability` it perturbs the
//! checksum value (never the payload), so the declared checksum no longer
//! matches what the receiver computes and the segment is discarded.
//!
//! The random source is owned by the injector.  The binary seeds it from the
//! OS once at startup; tests pass a seeded [`StdRng`] for reproducible runs.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Number of random deltas applied to a corrupted checksum.
const PERTURBATIONS: usize = 5;

/// Clamp a configured probability into `[0.0, 1.0]`.  NaN becomes `0.0`.
pub fn clamp_probability(p: f64) -> f64 {
    if p.is_nan() {
        0.0
    } else {
        p.clamp(0.0, 1.0)
    }
}

/// Checksum perturbation at a fixed probability.
#[derive(Debug)]
pub struct ErrorInjector<R = StdRng> {
    error_probability: f64,
    rng: R,
}

impl ErrorInjector<StdRng> {
    /// Injector seeded from the operating system.
    pub fn from_os_rng(error_probability: f64) -> Self {
        Self::new(error_probability, StdRng::from_os_rng())
    }

    /// Injector with a fixed seed.
    pub fn seeded(error_probability: f64, seed: u64) -> Self {
        Self::new(error_probability, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> ErrorInjector<R> {
    pub fn new(error_probability: f64, rng: R) -> Self {
        Self {
            error_probability: clamp_probability(error_probability),
            rng,
        }
    }

    pub fn error_probability(&self) -> f64 {
        self.error_probability
    }

    /// Return `checksum`, perturbed with probability `error_probability`.
    ///
    /// Each delta lies in `[-100, -93]`, so a perturbed value never equals
    /// the input.
    pub fn apply(&mut self, checksum: u32) -> u32 {
        if !self.should_corrupt() {
            return checksum;
        }
        let mut out = checksum;
        for _ in 0..PERTURBATIONS {
            let delta = self.rng.random_range(0..8i32) - 100;
            out = out.wrapping_add_signed(delta);
        }
        log::trace!("[inject] checksum {checksum:08x} -> {out:08x}");
        out
    }

    fn should_corrupt(&mut self) -> bool {
        if self.error_probability <= 0.0 {
            return false;
        }
        if self.error_probability >= 1.0 {
            return true;
        }
        self.rng.random::<f64>() < self.error_probability
    }
}
