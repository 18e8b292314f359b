//! Group baseline estimators.
//!
//! Two interchangeable ways of centering a vector of per-response values:
//!
//! - **Population** (GRPO): `A_i = (r_i - mean(r)) / (std(r) + eps)`
//! - **Leave-one-out** (RLOO): `A_i = r_i - mean({r_j : j != i})`
//!
//! The composer applies the same primitive to the accuracy rewards of the
//! whole group and to the length scores of the correct-set, so both signals
//! are centered identically.

use serde::{Deserialize, Serialize};

use super::numeric::{rescale_factor, ZScore};

/// Which baseline to subtract from each value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Baseline {
    /// Group mean and standard deviation (GRPO-style z-score).
    Population,
    /// Mean of the other members (RLOO-style).
    LeaveOneOut,
}

impl Baseline {
    /// Pick the baseline for the `use_rloo` flag.
    pub fn from_rloo(use_rloo: bool) -> Self {
        if use_rloo {
            Self::LeaveOneOut
        } else {
            Self::Population
        }
    }

    /// Center `values` against this baseline.
    pub fn center(self, values: &[f64], eps: f64) -> Vec<f64> {
        match self {
            Self::Population => population_normalized(values, eps),
            Self::LeaveOneOut => leave_one_out(values),
        }
    }
}

/// Population-normalized advantages over a group:
///
///   A_i = (r_i - mean(r)) / (max(std(r), eps) + eps)
///
/// # Edge cases
///
/// - If `values` is empty, returns an empty vector.
/// - If all values are identical the numerator is zero everywhere, so every
///   advantage is 0.0. No output should be preferred over another when all
///   received the same reward.
pub fn population_normalized(values: &[f64], eps: f64) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }

    let zscore = ZScore::fit(values, eps);
    values.iter().map(|&v| zscore.z(v)).collect()
}

/// Leave-one-out advantages over a group:
///
///   A_i = r_i - (sum(r) - r_i) / (n - 1)
///
/// A single-element group has no "others"; its advantage is 0.0 by convention.
/// Very large values are summed in rescaled units; an entry is infinite only
/// when the true advantage exceeds `f64::MAX`.
pub fn leave_one_out(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    if n < 2 {
        return vec![0.0; n];
    }

    let scale = rescale_factor(values);
    let total: f64 = values.iter().map(|v| v / scale).sum();
    let others = (n - 1) as f64;

    values
        .iter()
        .map(|&v| {
            let v = v / scale;
            scale * (v - (total - v) / others)
        })
        .collect()
}
