/////////////////////////////////////////////////////////////////////////////////////////////\
//
// Zero-truncated Poisson distribution with inverse-CDF sampling.
//
// Created on: 02 Feb 2026     Author: Tobias Kragholm
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! # Zero-truncated Poisson
//!
//! Poisson(λ) conditioned on `k >= 1`. Sampling inverts the CDF directly, so no
//! draws are rejected. The search compares the upper tail `P(X > k)` against
//! a target scaled by `P(X >= 1) = -expm1(-λ)`, which keeps `k = 1` accurate
//! for very small rates. The answer is bracketed by doubling and then
//! bisected, so a draw costs `O(log λ)` tail evaluations.
//!
//! # Examples
//!
//! ```
//! use rand::SeedableRng;
//! use rand::rngs::StdRng;
//! use zero_inflated_models::TruncatedPoisson;
//!
//! let dist = TruncatedPoisson::new(0.5).expect("valid rate");
//! let mut rng = StdRng::seed_from_u64(11);
//! assert!((0..100).all(|_| dist.sample(&mut rng) >= 1));
//! ```

use rand::RngExt;
use rand::rngs::StdRng;
use statrs::distribution::{Discrete, DiscreteCDF, Poisson};

use super::DistributionError;

/// Poisson distribution truncated to the positive integers.
#[derive(Debug, Clone)]
pub struct TruncatedPoisson {
    lambda: f64,
    positive_mass: f64,
    base: Poisson,
}

impl TruncatedPoisson {
    /// # Errors
    ///
    /// Returns `DistributionError::InvalidParameter` if `lambda` is not a
    /// finite, strictly positive rate.
    pub fn new(lambda: f64) -> Result<Self, DistributionError> {
        let invalid = DistributionError::InvalidParameter {
            name: "lambda",
            value: lambda,
        };
        if !(lambda.is_finite() && lambda > 0.0) {
            return Err(invalid);
        }
        let base = Poisson::new(lambda).map_err(|_| invalid.clone())?;
        let positive_mass = -(-lambda).exp_m1();
        if positive_mass <= 0.0 {
            return Err(invalid);
        }
        Ok(Self {
            lambda,
            positive_mass,
            base,
        })
    }

    #[must_use]
    pub const fn lambda(&self) -> f64 {
        self.lambda
    }

    /// Probability mass at `k`; zero for `k == 0`.
    #[must_use]
    pub fn pmf(&self, k: u64) -> f64 {
        if k == 0 {
            0.0
        } else {
            self.base.pmf(k) / self.positive_mass
        }
    }

    /// `P(X <= k)` under the truncated law.
    #[must_use]
    pub fn cdf(&self, k: u64) -> f64 {
        if k == 0 {
            0.0
        } else {
            (1.0 - self.base.sf(k) / self.positive_mass).clamp(0.0, 1.0)
        }
    }

    /// `E[X | X >= 1] = λ / (1 - e^{-λ})`.
    #[must_use]
    pub fn mean(&self) -> f64 {
        self.lambda / self.positive_mass
    }

    /// `Var[X | X >= 1] = m (1 + λ - m)` with `m` the truncated mean.
    #[must_use]
    pub fn variance(&self) -> f64 {
        let m = self.mean();
        m * (1.0 + self.lambda - m)
    }

    /// Draw one value, always `>= 1`.
    ///
    /// With `U` uniform on `[F(0), 1)`, returns the smallest `k` such that
    /// `F(k) >= U`, i.e. `P(X > k) <= 1 - U`.
    pub fn sample(&self, rng: &mut StdRng) -> u64 {
        let u = rng.random::<f64>();
        self.invert_tail(self.positive_mass * (1.0 - u))
    }

    /// Smallest `k >= 1` with `P(X > k) <= target`.
    fn invert_tail(&self, target: f64) -> u64 {
        let accepts = |k: u64| self.base.sf(k) <= target;

        // Invariant: `high` is accepted; `low` is 0 or rejected.
        let mut low = 0_u64;
        let mut high = 1_u64;
        while !accepts(high) {
            low = high;
            match high.checked_mul(2) {
                Some(next) => high = next,
                None => return u64::MAX,
            }
        }
        while high - low > 1 {
            let mid = low + (high - low) / 2;
            if accepts(mid) {
                high = mid;
            } else {
                low = mid;
            }
        }
        high
    }
}

/// Draw a single zero-truncated Poisson deviate.
///
/// # Errors
///
/// Returns `DistributionError::InvalidParameter` if `lambda <= 0` or is not finite.
pub fn sample_truncated_poisson(lambda: f64, rng: &mut StdRng) -> Result<u64, DistributionError> {
    Ok(TruncatedPoisson::new(lambda)?.sample(rng))
}
