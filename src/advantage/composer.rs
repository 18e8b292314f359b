//! Decoupled Conditional Advantage (DCA) and its dynamic variant (DDCA).
//!
//! The accuracy signal and the length signal are centered separately:
//!
//!   A_acc = baseline(1[correct])                      over all G responses
//!   A_len = -baseline(s[Sc])   on Sc,   0 elsewhere   (s = conditional length score)
//!   A     = A_acc + beta * A_len
//!
//! Length is only compared among responses that are already correct, so a
//! short wrong answer can never out-rank a long right one. With the dynamic
//! variant the length term is scaled by the pass rate rho = n / G, which damps
//! a noisy length signal on hard prompts.

use tracing::debug;

use super::baseline::{population_normalized, Baseline};
use super::length_score::length_score_z_sigmoid;

/// Parameters shared by the DCA estimators.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComposeParams {
    /// Weight of the length term.
    pub beta: f64,
    /// Epsilon floor for standard deviations.
    pub eps: f64,
    /// Scale the length term by the pass rate (DDCA).
    pub use_dynamic: bool,
    /// Baseline used for both the accuracy and the length signal.
    pub baseline: Baseline,
}

/// The two halves of a DCA advantage, before and after combination.
#[derive(Debug, Clone, PartialEq)]
pub struct AdvantageParts {
    /// Accuracy advantage for every response.
    pub accuracy: Vec<f64>,
    /// Length advantage (already negated and, for DDCA, scaled by `pass_rate`).
    /// Exactly 0.0 at incorrect positions.
    pub length: Vec<f64>,
    /// `accuracy + beta * length`.
    pub combined: Vec<f64>,
    /// Empirical pass rate rho = n / G.
    pub pass_rate: f64,
}

/// Compute DCA advantages together with their accuracy and length parts.
///
/// The group size is `correct_mask.len()`; extra lengths are ignored.
///
/// # Panics
///
/// Panics if `lengths` is shorter than `correct_mask`. The same holds for
/// [`compose`], [`advantage_dca_grpo`] and [`advantage_dca_rloo`].
pub fn decompose(correct_mask: &[bool], lengths: &[f64], params: &ComposeParams) -> AdvantageParts {
    let g = correct_mask.len();
    assert!(
        lengths.len() >= g,
        "lengths ({}) shorter than correct_mask ({g})",
        lengths.len()
    );
    if g == 0 {
        return AdvantageParts {
            accuracy: Vec::new(),
            length: Vec::new(),
            combined: Vec::new(),
            pass_rate: 0.0,
        };
    }

    let r_acc: Vec<f64> = correct_mask.iter().map(|&c| if c { 1.0 } else { 0.0 }).collect();
    let accuracy = params.baseline.center(&r_acc, params.eps);

    let correct_idx: Vec<usize> = (0..g).filter(|&i| correct_mask[i]).collect();
    let n = correct_idx.len();
    let pass_rate = n as f64 / g as f64;

    let mut length = vec![0.0; g];
    if n > 0 {
        let scores = length_score_z_sigmoid(lengths, correct_mask, params.eps);
        let correct_scores: Vec<f64> = correct_idx.iter().map(|&i| scores[i]).collect();
        let centered = params.baseline.center(&correct_scores, params.eps);

        let scale = if params.use_dynamic { pass_rate } else { 1.0 };
        for (&i, c) in correct_idx.iter().zip(centered) {
            length[i] = -c * scale;
        }
    }

    let combined: Vec<f64> = accuracy
        .iter()
        .zip(&length)
        .map(|(a, l)| a + params.beta * l)
        .collect();

    debug!(
        group_size = g,
        num_correct = n,
        pass_rate,
        baseline = ?params.baseline,
        dynamic = params.use_dynamic,
        "DCA advantages composed"
    );

    AdvantageParts {
        accuracy,
        length,
        combined,
        pass_rate,
    }
}

/// `compose(correct_mask, lengths, beta, use_dynamic, use_rloo) -> advantages`.
pub fn compose(
    correct_mask: &[bool],
    lengths: &[f64],
    beta: f64,
    eps: f64,
    use_dynamic: bool,
    use_rloo: bool,
) -> Vec<f64> {
    let params = ComposeParams {
        beta,
        eps,
        use_dynamic,
        baseline: Baseline::from_rloo(use_rloo),
    };
    decompose(correct_mask, lengths, &params).combined
}

/// DCA-GRPO (DDCA-GRPO when `use_dynamic`): population-normalized baselines.
pub fn advantage_dca_grpo(
    correct_mask: &[bool],
    lengths: &[f64],
    beta: f64,
    eps: f64,
    use_dynamic: bool,
) -> Vec<f64> {
    compose(correct_mask, lengths, beta, eps, use_dynamic, false)
}

/// DCA-RLOO (DDCA-RLOO when `use_dynamic`): leave-one-out baselines.
pub fn advantage_dca_rloo(
    correct_mask: &[bool],
    lengths: &[f64],
    beta: f64,
    eps: f64,
    use_dynamic: bool,
) -> Vec<f64> {
    compose(correct_mask, lengths, beta, eps, use_dynamic, true)
}

/// Plain GRPO: `(r - mean(r)) / (std(r) + eps)` over the group.
pub fn advantage_vanilla_grpo(rewards: &[f64], eps: f64) -> Vec<f64> {
    population_normalized(rewards, eps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advantage::numeric::DEFAULT_EPS;

    fn params(baseline: Baseline, use_dynamic: bool) -> ComposeParams {
        ComposeParams {
            beta: 0.2,
            eps: DEFAULT_EPS,
            use_dynamic,
            baseline,
        }
    }

    fn all_finite(v: &[f64]) -> bool {
        v.iter().all(|x| x.is_finite())
    }

    // ------------------------------------------------------------------
    // Zero-sum length term
    // ------------------------------------------------------------------

    #[test]
    fn test_length_zero_sum_grpo() {
        let parts = decompose(
            &[true, true, false, true],
            &[50.0, 100.0, 200.0, 150.0],
            &params(Baseline::Population, false),
        );
        let sum: f64 = parts.length.iter().sum();
        assert!(sum.abs() < 1e-9, "length term should be zero-sum, got {sum}");
        assert_eq!(parts.length[2], 0.0);
    }

    #[test]
    fn test_length_zero_sum_rloo() {
        let parts = decompose(
            &[true, true, false, true, true],
            &[80.0, 120.0, 999.0, 40.0, 300.0],
            &params(Baseline::LeaveOneOut, false),
        );
        let sum: f64 = parts.length.iter().sum();
        assert!(sum.abs() < 1e-9, "length term should be zero-sum, got {sum}");
        assert_eq!(parts.length[2], 0.0);
    }

    // ------------------------------------------------------------------
    // Dynamic scaling
    // ------------------------------------------------------------------

    #[test]
    fn test_dynamic_scales_length_by_pass_rate() {
        let mask = [true, false, true, true]; // rho = 0.75
        let lengths = [50.0, 100.0, 150.0, 200.0];
        for baseline in [Baseline::Population, Baseline::LeaveOneOut] {
            let dca = decompose(&mask, &lengths, &params(baseline, false));
            let ddca = decompose(&mask, &lengths, &params(baseline, true));
            assert!((ddca.pass_rate - 0.75).abs() < 1e-12);
            assert_eq!(dca.accuracy, ddca.accuracy);
            for (d, dd) in dca.length.iter().zip(&ddca.length) {
                assert!((dd - 0.75 * d).abs() < 1e-12);
            }
            assert!(dca
                .combined
                .iter()
                .zip(&ddca.combined)
                .any(|(a, b)| (a - b).abs() > 1e-9));
        }
    }

    #[test]
    fn test_dynamic_identity_when_all_correct() {
        let mask = [true; 4];
        let lengths = [10.0, 20.0, 30.0, 40.0];
        let dca = advantage_dca_grpo(&mask, &lengths, 0.2, DEFAULT_EPS, false);
        let ddca = advantage_dca_grpo(&mask, &lengths, 0.2, DEFAULT_EPS, true);
        assert_eq!(dca, ddca);
    }

    // ------------------------------------------------------------------
    // Degenerate groups
    // ------------------------------------------------------------------

    #[test]
    fn test_all_wrong_is_pure_accuracy() {
        let adv = advantage_dca_grpo(&[false; 3], &[100.0, 200.0, 300.0], 0.2, DEFAULT_EPS, true);
        assert!(adv.iter().all(|a| a.abs() < 1e-12));
        let adv = advantage_dca_rloo(&[false; 3], &[100.0, 200.0, 300.0], 0.2, DEFAULT_EPS, true);
        assert!(adv.iter().all(|a| a.abs() < 1e-12));
    }

    #[test]
    fn test_all_correct_is_pure_length() {
        let mask = [true; 3];
        let lengths = [100.0, 200.0, 300.0];
        let parts = decompose(&mask, &lengths, &params(Baseline::Population, true));
        assert!(parts.accuracy.iter().all(|a| a.abs() < 1e-12));
        // Shortest correct answer gets the largest push.
        assert!(parts.combined[0] > parts.combined[1]);
        assert!(parts.combined[1] > parts.combined[2]);
    }

    #[test]
    fn test_single_correct_has_no_length_term() {
        for baseline in [Baseline::Population, Baseline::LeaveOneOut] {
            let parts = decompose(&[false, true, false], &[100.0, 200.0, 300.0], &params(baseline, true));
            assert!(parts.length.iter().all(|l| *l == 0.0));
            assert!(all_finite(&parts.combined));
        }
    }

    #[test]
    fn test_group_of_one_is_finite() {
        for use_rloo in [false, true] {
            for correct in [false, true] {
                let adv = compose(&[correct], &[42.0], 0.2, DEFAULT_EPS, true, use_rloo);
                assert_eq!(adv.len(), 1);
                assert!(all_finite(&adv));
            }
        }
    }

    #[test]
    fn test_empty_group() {
        let parts = decompose(&[], &[], &params(Baseline::Population, true));
        assert!(parts.combined.is_empty());
    }

    // ------------------------------------------------------------------
    // Scenarios
    // ------------------------------------------------------------------

    #[test]
    fn test_scenario_mixed_group() {
        let parts = decompose(
            &[true, true, false, true],
            &[500.0, 300.0, 200.0, 400.0],
            &params(Baseline::Population, false),
        );
        // Length 300 is the shortest correct answer: largest positive length advantage.
        assert!(parts.length[1] > 0.0);
        assert!(parts.length[1] > parts.length[3]);
        assert!(parts.length[3] > parts.length[0]);
        // 500 and 300 are symmetric around mu = 400.
        assert!((parts.length[0] + parts.length[1]).abs() < 1e-9);
        assert!(parts.length[3].abs() < 1e-9);
        assert_eq!(parts.length[2], 0.0);
        // Every correct answer still beats the wrong one.
        assert!(parts.combined[2] < parts.combined[0]);
    }

    #[test]
    fn test_beta_zero_is_plain_accuracy() {
        let mask = [true, false, true, false];
        let lengths = [10.0, 20.0, 300.0, 40.0];
        let adv = advantage_dca_grpo(&mask, &lengths, 0.0, DEFAULT_EPS, true);
        let r: Vec<f64> = mask.iter().map(|&c| if c { 1.0 } else { 0.0 }).collect();
        assert_eq!(adv, advantage_vanilla_grpo(&r, DEFAULT_EPS));
    }

    #[test]
    fn test_vanilla_mean_is_zero() {
        let adv = advantage_vanilla_grpo(&[1.0, 1.0, 0.0, 1.0], DEFAULT_EPS);
        let mean: f64 = adv.iter().sum::<f64>() / adv.len() as f64;
        assert!(mean.abs() < 1e-9);
    }

    #[test]
    fn test_vanilla_near_max_rewards_are_finite() {
        let adv = advantage_vanilla_grpo(&[1e308, 1.7e308], DEFAULT_EPS);
        assert!((adv[0] + 1.0).abs() < 1e-9, "{adv:?}");
        assert!((adv[1] - 1.0).abs() < 1e-9, "{adv:?}");
    }

    #[test]
    #[should_panic(expected = "shorter than correct_mask")]
    fn test_short_lengths_panic() {
        advantage_dca_grpo(&[true; 3], &[1.0, 2.0], 0.2, DEFAULT_EPS, true);
    }
}
