//! Conditional length score.
//!
//! Lengths are z-scored against the statistics of the *correct* responses only,
//! then squashed through a sigmoid:
//!
//!   z_i = (|o_i| - mu_c) / (sigma_c + eps),   s_i = sigmoid(clip(z_i, -20, 20))
//!
//! Every response receives a score, including incorrect ones. Those values are
//! never read by the composer, which masks incorrect positions to zero.

use super::numeric::{clipped_sigmoid, ZScore};

/// Compute the conditional length score for every response in a group.
///
/// The result has one entry per element of `correct_mask`; lengths beyond
/// that are ignored. If no response is correct the result is all zeros.
///
/// # Panics
///
/// Panics if `lengths` is shorter than `correct_mask`.
pub fn length_score_z_sigmoid(lengths: &[f64], correct_mask: &[bool], eps: f64) -> Vec<f64> {
    let g = correct_mask.len();
    assert!(
        lengths.len() >= g,
        "lengths ({}) shorter than correct_mask ({g})",
        lengths.len()
    );
    let lengths = &lengths[..g];

    let correct_lengths: Vec<f64> = lengths
        .iter()
        .zip(correct_mask)
        .filter(|(_, &c)| c)
        .map(|(&l, _)| l)
        .collect();

    if correct_lengths.is_empty() {
        return vec![0.0; g];
    }

    let zscore = ZScore::fit(&correct_lengths, eps);
    lengths
        .iter()
        .map(|&l| clipped_sigmoid(zscore.z(l)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scores_strictly_inside_unit_interval() {
        let scores = length_score_z_sigmoid(&[100.0, 200.0, 300.0], &[true; 3], 1e-8);
        assert!(scores.iter().all(|&s| s > 0.0 && s < 1.0));
    }

    #[test]
    fn test_monotone_in_length() {
        let lengths = [500.0, 300.0, 200.0, 400.0];
        let mask = [true, true, false, true];
        let s = length_score_z_sigmoid(&lengths, &mask, 1e-8);
        assert!(s[2] < s[1]);
        assert!(s[1] < s[3]);
        assert!(s[3] < s[0]);
    }

    #[test]
    fn test_statistics_use_correct_set_only() {
        // Correct-set {500, 300, 400}: mu = 400, so the length-400 response
        // sits exactly at the midpoint even though 200 is in the group.
        let s = length_score_z_sigmoid(&[500.0, 300.0, 200.0, 400.0], &[true, true, false, true], 1e-8);
        assert!((s[3] - 0.5).abs() < 1e-12);
        assert!((s[0] + s[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_no_correct_responses_gives_zeros() {
        let s = length_score_z_sigmoid(&[10.0, 20.0], &[false, false], 1e-8);
        assert_eq!(s, vec![0.0, 0.0]);
    }

    #[test]
    fn test_identical_correct_lengths_stay_finite() {
        // sigma = 0 is floored; the outlier saturates but stays inside (0, 1).
        let s = length_score_z_sigmoid(&[100.0, 100.0, 5000.0], &[true, true, false], 1e-8);
        assert!((s[0] - 0.5).abs() < 1e-12);
        assert!(s[2].is_finite() && s[2] < 1.0);
    }

    #[test]
    fn test_excess_lengths_are_truncated() {
        let s = length_score_z_sigmoid(&[1.0, 2.0, 3.0, 99.0], &[true, true, true], 1e-8);
        assert_eq!(s.len(), 3);
    }

    #[test]
    #[should_panic(expected = "shorter than correct_mask")]
    fn test_short_lengths_panic() {
        length_score_z_sigmoid(&[1.0, 2.0], &[true; 3], 1e-8);
    }

    #[test]
    fn test_near_max_lengths_stay_in_unit_interval() {
        let s = length_score_z_sigmoid(&[1e308, 1.7e308, 3.0], &[true, true, false], 1e-8);
        assert!(s.iter().all(|&x| x > 0.0 && x < 1.0), "{s:?}");
        assert!(s[2] < s[0] && s[0] < s[1]);
    }
}
