//! Scalar reward shaping for the non-decoupled path.
//!
//! The coupled length penalty (`grpo_lp`) folds length into the reward before
//! normalization. In a mixed group its single global baseline is pulled down
//! by the incorrect zeros, which dilutes the length signal by the pass rate.
//! It is kept for comparison against DCA.

use super::mode::Mode;

/// Binary correctness reward: 1.0 if correct else 0.0.
pub fn reward_vanilla(correct: &[bool]) -> Vec<f64> {
    correct.iter().map(|&c| if c { 1.0 } else { 0.0 }).collect()
}

/// Coupled length-penalized reward: `1 - gamma * length` if correct else 0.0.
///
/// One reward per element of `correct_mask`; extra lengths are ignored.
///
/// # Panics
///
/// Panics if `lengths` is shorter than `correct_mask`.
pub fn rewards_coupled_lp(correct_mask: &[bool], lengths: &[f64], gamma: f64) -> Vec<f64> {
    assert!(
        lengths.len() >= correct_mask.len(),
        "lengths ({}) shorter than correct_mask ({})",
        lengths.len(),
        correct_mask.len()
    );
    correct_mask
        .iter()
        .zip(lengths)
        .map(|(&c, &l)| if c { 1.0 - gamma * l } else { 0.0 })
        .collect()
}

/// Shape rewards for `mode`.
///
/// Decoupled modes get the binary reward; length reaches them through the
/// composer instead, and `lengths` is not read.
///
/// # Panics
///
/// Under [`Mode::GrpoLp`], panics if `lengths` is shorter than `correct`.
pub fn shape_rewards(correct: &[bool], lengths: &[f64], mode: Mode, gamma: f64) -> Vec<f64> {
    match mode {
        Mode::Vanilla | Mode::Dca | Mode::DcaRloo => reward_vanilla(correct),
        Mode::GrpoLp => rewards_coupled_lp(correct, lengths, gamma),
    }
}
