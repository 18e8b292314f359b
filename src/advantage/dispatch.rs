//! Entry point that selects an estimator by [`Mode`] and applies it to one
//! group or to a batch of independent groups.
//!
//! A batch is handled as an index-addressed arena: group `b` owns the slice
//! `[b * G, (b + 1) * G)` of every input array, groups are evaluated in
//! parallel with rayon, and results are written back in the same order. No
//! value crosses a group boundary.

use rayon::prelude::*;
use tracing::{debug, warn};

use super::composer::{advantage_dca_grpo, advantage_dca_rloo, advantage_vanilla_grpo};
use super::mode::Mode;
use super::shaper::rewards_coupled_lp;
use crate::config::AdvantageConfig;
use crate::error::{DcaError, Result};

/// Rewards above this value count as correct when no mask is supplied.
pub const CORRECT_THRESHOLD: f64 = 0.5;

/// How a flat reward array is split into groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupLayout {
    /// The whole array is one group (1-D input).
    Single,
    /// Consecutive runs of `G` responses, one per prompt (B x G input).
    Grouped(usize),
}

impl From<Option<usize>> for GroupLayout {
    fn from(group_size: Option<usize>) -> Self {
        match group_size {
            Some(g) => GroupLayout::Grouped(g),
            None => GroupLayout::Single,
        }
    }
}

/// Infer correctness from scalar rewards: `reward > threshold`.
pub fn infer_correct_mask(rewards: &[f64], threshold: f64) -> Vec<bool> {
    rewards.iter().map(|&r| r > threshold).collect()
}

/// Compute advantages for a flat array of responses.
///
/// `lengths` and `correct_mask` are aligned with `rewards`. Extra trailing
/// entries are ignored; missing ones are an error. The result has exactly
/// `rewards.len()` entries.
pub fn compute_advantage(
    rewards: &[f64],
    lengths: &[f64],
    correct_mask: Option<&[bool]>,
    layout: GroupLayout,
    config: &AdvantageConfig,
) -> Result<Vec<f64>> {
    let total = rewards.len();
    let lengths = fit_to(lengths, total, "lengths")?;
    let correct_mask = correct_mask
        .map(|m| fit_to(m, total, "correct_mask"))
        .transpose()?;

    let group_size = match layout {
        GroupLayout::Single => return compute_group(rewards, lengths, correct_mask, config),
        GroupLayout::Grouped(g) => g,
    };

    if group_size == 0 || total % group_size != 0 {
        return Err(DcaError::InvalidGroupSize { group_size, total });
    }

    let num_groups = total / group_size;
    debug!(num_groups, group_size, mode = %config.mode, "Computing batched advantages");

    let per_group = (0..num_groups)
        .into_par_iter()
        .map(|b| {
            let span = b * group_size..(b + 1) * group_size;
            compute_group(
                &rewards[span.clone()],
                &lengths[span.clone()],
                correct_mask.map(|m| &m[span]),
                config,
            )
        })
        .collect::<Result<Vec<Vec<f64>>>>()?;

    Ok(per_group.into_iter().flatten().collect())
}

/// Compute advantages for a nested B x G batch. Each row is one group; rows
/// may differ in size.
pub fn compute_advantage_nested(
    rewards: &[Vec<f64>],
    lengths: &[Vec<f64>],
    correct_mask: Option<&[Vec<bool>]>,
    config: &AdvantageConfig,
) -> Result<Vec<Vec<f64>>> {
    let lengths = fit_to(lengths, rewards.len(), "lengths")?;
    let correct_mask = correct_mask
        .map(|m| fit_to(m, rewards.len(), "correct_mask"))
        .transpose()?;

    rewards
        .par_iter()
        .enumerate()
        .map(|(b, row)| {
            compute_group(
                row,
                &lengths[b],
                correct_mask.map(|m| m[b].as_slice()),
                config,
            )
        })
        .collect()
}

/// Advantages for a single group of `rewards.len()` responses.
fn compute_group(
    rewards: &[f64],
    lengths: &[f64],
    correct_mask: Option<&[bool]>,
    config: &AdvantageConfig,
) -> Result<Vec<f64>> {
    let g = rewards.len();
    if g == 0 {
        return Err(DcaError::EmptyGroup);
    }

    let lengths = fit_to(lengths, g, "lengths")?;
    check_finite(rewards, "rewards")?;
    check_finite(lengths, "lengths")?;

    let inferred;
    let correct_mask = match correct_mask {
        Some(m) => fit_to(m, g, "correct_mask")?,
        None => {
            inferred = infer_correct_mask(rewards, CORRECT_THRESHOLD);
            inferred.as_slice()
        }
    };

    let eps = config.eps;
    let advantages = match config.mode {
        Mode::Vanilla => advantage_vanilla_grpo(rewards, eps),
        Mode::GrpoLp => {
            // Binary rewards are rebuilt as coupled rewards; anything else is
            // taken as already shaped by the reward function.
            if rewards.iter().all(|&r| r == 0.0 || r == 1.0) {
                let coupled = rewards_coupled_lp(correct_mask, lengths, config.gamma);
                advantage_vanilla_grpo(&coupled, eps)
            } else {
                advantage_vanilla_grpo(rewards, eps)
            }
        }
        Mode::Dca if !config.use_rloo => {
            advantage_dca_grpo(correct_mask, lengths, config.beta, eps, config.use_dynamic)
        }
        Mode::Dca | Mode::DcaRloo => {
            advantage_dca_rloo(correct_mask, lengths, config.beta, eps, config.use_dynamic)
        }
    };

    check_finite(&advantages, "advantages")?;
    Ok(advantages)
}

/// Truncate `values` to `expected` entries, or fail if there are fewer.
fn fit_to<'a, T>(values: &'a [T], expected: usize, field: &'static str) -> Result<&'a [T]> {
    match values.len().cmp(&expected) {
        std::cmp::Ordering::Less => Err(DcaError::ShapeMismatch {
            field,
            expected,
            actual: values.len(),
        }),
        std::cmp::Ordering::Equal => Ok(values),
        std::cmp::Ordering::Greater => {
            warn!(
                field,
                expected,
                actual = values.len(),
                "Truncating per-response array to group size"
            );
            Ok(&values[..expected])
        }
    }
}

fn check_finite(values: &[f64], field: &'static str) -> Result<()> {
    match values.iter().position(|v| !v.is_finite()) {
        Some(index) => Err(DcaError::NonFinite { field, index }),
        None => Ok(()),
    }
}
