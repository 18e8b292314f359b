//! Answer-equivalence contract.
//!
//! Correctness enters the estimators as a precomputed boolean. This module
//! only fixes the shape of the checker that produces it, plus a plain default;
//! domain-specific equivalence belongs to the caller.

/// Decides whether a predicted answer matches the ground truth.
pub trait AnswerChecker: Send + Sync {
    fn is_correct(&self, pred: &str, gt: &str) -> bool;
}

impl<F> AnswerChecker for F
where
    F: Fn(&str, &str) -> bool + Send + Sync,
{
    fn is_correct(&self, pred: &str, gt: &str) -> bool {
        self(pred, gt)
    }
}

/// Default checker: trim and lowercase both sides, then compare, falling back
/// to the text after the last `####` marker on either side.
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizedMatch;

impl AnswerChecker for NormalizedMatch {
    fn is_correct(&self, pred: &str, gt: &str) -> bool {
        let pred = pred.trim().to_lowercase();
        let gt = gt.trim().to_lowercase();
        if pred == gt {
            return true;
        }
        after_marker(&pred) == after_marker(&gt)
    }
}

fn after_marker(s: &str) -> &str {
    match s.rsplit_once("####") {
        Some((_, tail)) => tail.trim(),
        None => s,
    }
}

/// Check `pred` against `gt` with the default [`NormalizedMatch`].
pub fn is_correct(pred: &str, gt: &str) -> bool {
    NormalizedMatch.is_correct(pred, gt)
}
