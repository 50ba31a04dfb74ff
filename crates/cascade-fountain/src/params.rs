//! Coding parameter sets.
//!
//! Construction-time configuration for the plain LT coder and the UEP
//! stack. Validation happens once, up front; every error here is fatal for
//! the coder being built.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Parameters of a plain LT fountain coder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LtParams {
    /// Input block size K.
    pub k: usize,
    /// Robust-soliton spread parameter.
    pub c: f64,
    /// Robust-soliton failure-probability bound.
    pub delta: f64,
}

impl LtParams {
    /// Parameter set with explicit soliton shape.
    pub fn new(k: usize, c: f64, delta: f64) -> Self {
        LtParams { k, c, delta }
    }

    /// Check the parameter ranges.
    ///
    /// # Errors
    ///
    /// `ConfigError` for `k == 0`, non-positive `c`, or `delta` outside
    /// `(0, 1]`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.k == 0 {
            return Err(ConfigError::ZeroBlockSize);
        }
        if !(self.c > 0.0) || !self.c.is_finite() {
            return Err(ConfigError::InvalidSpread { c: self.c });
        }
        if !(self.delta > 0.0 && self.delta <= 1.0) {
            return Err(ConfigError::InvalidFailureBound { delta: self.delta });
        }
        Ok(())
    }
}

/// Parameters of a UEP coder: per-priority sub-block sizes and repetition
/// factors, a global expansion factor, and the soliton shape applied to the
/// expanded block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UepParams {
    /// Sub-block size K_i per priority class, highest priority first.
    pub ks: Vec<usize>,
    /// Repetition factor RF_i per priority class.
    pub rfs: Vec<usize>,
    /// Global expansion factor EF.
    pub ef: usize,
    /// Robust-soliton spread parameter.
    pub c: f64,
    /// Robust-soliton failure-probability bound.
    pub delta: f64,
}

impl UepParams {
    /// Check class layout and soliton ranges.
    ///
    /// # Errors
    ///
    /// `ConfigError` for empty or mismatched class lists, zero sizes or
    /// factors, or invalid soliton parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ks.len() != self.rfs.len() {
            return Err(ConfigError::ClassCountMismatch {
                ks: self.ks.len(),
                rfs: self.rfs.len(),
            });
        }
        if self.ks.is_empty() {
            return Err(ConfigError::NoClasses);
        }
        if self.ks.contains(&0) {
            return Err(ConfigError::ZeroBlockSize);
        }
        if let Some(class) = self.rfs.iter().position(|&rf| rf == 0) {
            return Err(ConfigError::ZeroRepetition { class });
        }
        if self.ef == 0 {
            return Err(ConfigError::ZeroExpansion);
        }
        self.lt_params().validate()
    }

    /// Block size seen by the caller: Σ K_i original symbols.
    pub fn block_size_in(&self) -> usize {
        self.ks.iter().sum()
    }

    /// Expanded block size handed to the inner LT coder:
    /// EF · Σ(K_i · RF_i).
    pub fn block_size_out(&self) -> usize {
        self.ef
            * self
                .ks
                .iter()
                .zip(&self.rfs)
                .map(|(k, rf)| k * rf)
                .sum::<usize>()
    }

    /// The inner LT parameter set over the expanded block.
    pub fn lt_params(&self) -> LtParams {
        LtParams::new(self.block_size_out(), self.c, self.delta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lt_validation() {
        assert!(LtParams::new(100, 0.1, 0.5).validate().is_ok());
        assert!(matches!(
            LtParams::new(0, 0.1, 0.5).validate(),
            Err(ConfigError::ZeroBlockSize)
        ));
        assert!(matches!(
            LtParams::new(10, -1.0, 0.5).validate(),
            Err(ConfigError::InvalidSpread { .. })
        ));
        assert!(matches!(
            LtParams::new(10, 0.1, 2.0).validate(),
            Err(ConfigError::InvalidFailureBound { .. })
        ));
    }

    #[test]
    fn uep_block_sizes() {
        let ps = UepParams {
            ks: vec![100, 900],
            rfs: vec![3, 1],
            ef: 4,
            c: 0.1,
            delta: 0.5,
        };
        assert!(ps.validate().is_ok());
        assert_eq!(ps.block_size_in(), 1000);
        assert_eq!(ps.block_size_out(), 4 * (100 * 3 + 900));
        assert_eq!(ps.lt_params().k, 4800);
    }

    #[test]
    fn uep_validation_failures() {
        let base = UepParams {
            ks: vec![10, 20],
            rfs: vec![2, 1],
            ef: 2,
            c: 0.1,
            delta: 0.5,
        };

        let mut ps = base.clone();
        ps.rfs.pop();
        assert!(matches!(
            ps.validate(),
            Err(ConfigError::ClassCountMismatch { .. })
        ));

        let mut ps = base.clone();
        ps.ks.clear();
        ps.rfs.clear();
        assert!(matches!(ps.validate(), Err(ConfigError::NoClasses)));

        let mut ps = base.clone();
        ps.rfs[1] = 0;
        assert!(matches!(
            ps.validate(),
            Err(ConfigError::ZeroRepetition { class: 1 })
        ));

        let mut ps = base.clone();
        ps.ef = 0;
        assert!(matches!(ps.validate(), Err(ConfigError::ZeroExpansion)));

        let mut ps = base;
        ps.ks[0] = 0;
        assert!(matches!(ps.validate(), Err(ConfigError::ZeroBlockSize)));
    }

    #[test]
    fn params_roundtrip_through_json() {
        let ps = UepParams {
            ks: vec![4, 8],
            rfs: vec![2, 1],
            ef: 2,
            c: 0.1,
            delta: 0.5,
        };
        let json = serde_json::to_string(&ps).unwrap();
        let back: UepParams = serde_json::from_str(&json).unwrap();
        assert_eq!(ps, back);
    }
}
