//! Numeric sanity checks for the properties the DCA estimators are built on.
//!
//! Each check recomputes a small closed-form example and reports whether the
//! estimators behave as the derivation predicts:
//!
//! 1. **Parameter inefficacy** -- in an all-correct group the coupled length
//!    penalty `gamma` cancels out of the GRPO advantage.
//! 2. **Zero-sum length term** -- DCA length advantages sum to zero over the
//!    correct-set, for both baselines.
//! 3. **Baseline dilution** -- the coupled baseline is the correct-set mean
//!    scaled by the pass rate, and DCA does not fall below it.
//! 4. **RLOO consistency** -- DCA-RLOO on an all-correct group is finite and
//!    its length term is zero-sum.

use serde::Serialize;

use crate::advantage::{
    advantage_dca_grpo, advantage_vanilla_grpo, decompose, floored_spread, numeric, rewards_coupled_lp,
    Baseline, ComposeParams, DEFAULT_EPS,
};

/// Result of one check.
#[derive(Debug, Clone, Serialize)]
pub struct CheckOutcome {
    pub name: &'static str,
    pub passed: bool,
    pub detail: String,
}

/// Run every check in order.
pub fn run_all() -> Vec<CheckOutcome> {
    vec![
        parameter_inefficacy(),
        length_zero_sum(),
        baseline_dilution(),
        rloo_consistency(),
    ]
}

fn close(a: &[f64], b: &[f64], rtol: f64, atol: f64) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() <= atol + rtol * y.abs())
}

/// With every response correct, `1 - gamma * L` normalizes to `-(L - mean) / std`
/// whatever `gamma` is.
pub fn parameter_inefficacy() -> CheckOutcome {
    let lengths = [100.0, 200.0, 300.0, 400.0];
    let mask = [true; 4];

    let mu = numeric::mean(&lengths);
    let spread = floored_spread(numeric::population_std(&lengths), DEFAULT_EPS);
    let expected: Vec<f64> = lengths.iter().map(|l| -(l - mu) / spread).collect();

    let failing: Vec<f64> = [0.01, 0.1, 0.5]
        .into_iter()
        .filter(|&gamma| {
            let adv = advantage_vanilla_grpo(&rewards_coupled_lp(&mask, &lengths, gamma), DEFAULT_EPS);
            !close(&adv, &expected, 1e-5, 0.0)
        })
        .collect();

    CheckOutcome {
        name: "parameter_inefficacy",
        passed: failing.is_empty(),
        detail: if failing.is_empty() {
            "gamma cancels in all-correct GRPO".into()
        } else {
            format!("advantage depends on gamma for {failing:?}")
        },
    }
}

/// Static DCA length advantages are centered within the correct-set.
pub fn length_zero_sum() -> CheckOutcome {
    let mask = [true, true, false, true];
    let lengths = [500.0, 300.0, 999.0, 400.0];

    let sums: Vec<f64> = [Baseline::Population, Baseline::LeaveOneOut]
        .into_iter()
        .map(|baseline| {
            let params = ComposeParams {
                beta: 0.2,
                eps: DEFAULT_EPS,
                use_dynamic: false,
                baseline,
            };
            decompose(&mask, &lengths, &params).length.iter().sum()
        })
        .collect();

    CheckOutcome {
        name: "length_zero_sum",
        passed: sums.iter().all(|s| s.abs() < 1e-9),
        detail: format!("length-term sums over the correct-set: {sums:?}"),
    }
}

/// In a mixed group the coupled baseline is rho times the correct-set mean.
pub fn baseline_dilution() -> CheckOutcome {
    let mask = [true, true, false, false];
    let lengths = [400.0, 400.0, 100.0, 100.0];
    let gamma = 0.001;

    let coupled = rewards_coupled_lp(&mask, &lengths, gamma);
    let group_mean = numeric::mean(&coupled);
    let correct_rewards: Vec<f64> = coupled.iter().zip(&mask).filter(|(_, &c)| c).map(|(&r, _)| r).collect();
    let rho = correct_rewards.len() as f64 / mask.len() as f64;
    let diluted = (group_mean - rho * numeric::mean(&correct_rewards)).abs() < 1e-12;

    let adv_coupled = advantage_vanilla_grpo(&coupled, DEFAULT_EPS);
    let adv_dca = advantage_dca_grpo(&mask, &lengths, 0.2, DEFAULT_EPS, true);
    let correct_idx = [0usize, 1];
    let dca_not_worse = correct_idx.iter().any(|&i| adv_dca[i] > adv_coupled[i])
        || close(&adv_dca, &adv_coupled, 1e-5, 1e-8);

    CheckOutcome {
        name: "baseline_dilution",
        passed: diluted && dca_not_worse,
        detail: format!(
            "coupled baseline {group_mean:.4} = rho {rho:.2} x correct mean; dca {adv_dca:?} vs coupled {adv_coupled:?}"
        ),
    }
}

/// DCA-RLOO on an all-correct group.
pub fn rloo_consistency() -> CheckOutcome {
    let mask = [true; 3];
    let lengths = [100.0, 200.0, 300.0];
    let params = ComposeParams {
        beta: 0.2,
        eps: DEFAULT_EPS,
        use_dynamic: true,
        baseline: Baseline::LeaveOneOut,
    };
    let parts = decompose(&mask, &lengths, &params);
    let finite = parts.combined.iter().all(|a| a.is_finite());
    let sum: f64 = parts.length.iter().sum();

    CheckOutcome {
        name: "rloo_consistency",
        passed: finite && sum.abs() < 1e-9,
        detail: format!("advantages {:?}, length-term sum {sum:.2e}", parts.combined),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_all_checks_pass() {
        for outcome in run_all() {
            assert!(outcome.passed, "{} failed: {}", outcome.name, outcome.detail);
        }
    }

    #[test]
    fn test_check_names_are_unique() {
        let outcomes = run_all();
        let names: HashSet<&str> = outcomes.iter().map(|o| o.name).collect();
        assert_eq!(names.len(), outcomes.len());
        assert_eq!(outcomes.len(), 4);
    }
}
