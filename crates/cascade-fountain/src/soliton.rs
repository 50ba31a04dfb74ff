//! Soliton degree distributions.
//!
//! LT row generation samples each coded symbol's degree from the robust
//! soliton distribution μ over `1..=K`:
//!
//! - ideal component: ρ(1) = 1/K, ρ(d) = 1/(d·(d−1)) for d ≥ 2
//! - robust correction, with S = c·ln(K/δ)·√K and d* = ⌊K/S⌋:
//!   τ(d) = S/(K·d) for d < d*, τ(d*) = S·ln(S/δ)/K, 0 beyond
//! - μ(d) = (ρ(d) + τ(d)) / β, β = Σ(ρ + τ)
//!
//! The correction concentrates extra mass at low degrees (keeping the
//! decoder's ripple alive) and at the spike d*, bounding the decoding
//! failure probability by δ at K·β received symbols.
//!
//! The distribution is precomputed into a CDF table at construction and
//! sampled by inverse-CDF lookup, so the per-row cost is a binary search.

use crate::error::ConfigError;

/// Precomputed robust-soliton distribution over degrees `1..=K`.
#[derive(Debug, Clone)]
pub struct RobustSoliton {
    k: usize,
    c: f64,
    delta: f64,
    /// cdf[d-1] = P(degree <= d); cdf[k-1] == 1.0.
    cdf: Vec<f64>,
}

impl RobustSoliton {
    /// Build the distribution, validating its parameters.
    ///
    /// # Errors
    ///
    /// `ConfigError` when `k == 0`, `c <= 0`, or `delta` is outside `(0, 1]`.
    pub fn new(k: usize, c: f64, delta: f64) -> Result<Self, ConfigError> {
        if k == 0 {
            return Err(ConfigError::ZeroBlockSize);
        }
        if !(c > 0.0) || !c.is_finite() {
            return Err(ConfigError::InvalidSpread { c });
        }
        if !(delta > 0.0 && delta <= 1.0) {
            return Err(ConfigError::InvalidFailureBound { delta });
        }

        let kf = k as f64;
        let s = c * (kf / delta).ln() * kf.sqrt();
        let spike = if s > 0.0 {
            ((kf / s).floor() as usize).clamp(1, k)
        } else {
            0 // degenerate (K=1, delta=1): pure ideal soliton
        };

        let mut weights = Vec::with_capacity(k);
        for d in 1..=k {
            let rho = if d == 1 {
                1.0 / kf
            } else {
                1.0 / (d as f64 * (d as f64 - 1.0))
            };
            let tau = if spike == 0 || d > spike {
                0.0
            } else if d < spike {
                s / (kf * d as f64)
            } else {
                (s * (s / delta).ln() / kf).max(0.0)
            };
            weights.push(rho + tau);
        }

        let beta: f64 = weights.iter().sum();
        let mut cdf = Vec::with_capacity(k);
        let mut acc = 0.0;
        for w in &weights {
            acc += w / beta;
            cdf.push(acc);
        }
        // Pin the tail against accumulated rounding.
        *cdf.last_mut().expect("k >= 1") = 1.0;

        Ok(RobustSoliton { k, c, delta, cdf })
    }

    /// Block size K.
    pub fn k(&self) -> usize {
        self.k
    }

    /// Spread parameter c.
    pub fn c(&self) -> f64 {
        self.c
    }

    /// Failure bound δ.
    pub fn delta(&self) -> f64 {
        self.delta
    }

    /// Map a uniform variate in `[0, 1)` to a degree in `1..=K` by
    /// inverse-CDF lookup.
    pub fn sample(&self, u: f64) -> usize {
        let idx = self.cdf.partition_point(|&p| p < u);
        (idx + 1).min(self.k)
    }

    /// P(degree <= d), for tests and introspection.
    pub fn cdf(&self, d: usize) -> f64 {
        assert!(d >= 1 && d <= self.k);
        self.cdf[d - 1]
    }
}
