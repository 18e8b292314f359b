//! Post-hoc evaluation metrics: pass@k and the accuracy-efficiency score.
//!
//! These consume finished rollouts for reporting and never feed back into
//! advantage computation.

use crate::answer::AnswerChecker;

/// Binomial coefficient C(n, k) as a float. Zero when `k > n`.
fn comb(n: usize, k: usize) -> f64 {
    if k > n {
        return 0.0;
    }
    let k = k.min(n - k);
    (0..k).fold(1.0, |acc, i| acc * (n - i) as f64 / (i + 1) as f64)
}

/// Unbiased pass@k for one problem with `n` samples of which `c` are correct:
///
///   pass@k = 1 - C(n - c, k) / C(n, k)
///
/// Returns 0.0 when `n == 0` or `k > n`.
pub fn pass_at_k(n: usize, c: usize, k: usize) -> f64 {
    if n == 0 || k > n {
        return 0.0;
    }
    let c = c.min(n);
    if k == 1 {
        return c as f64 / n as f64;
    }
    if n - c < k {
        return 1.0;
    }
    1.0 - comb(n - c, k) / comb(n, k)
}

/// Mean pass@k over several problems, each with `num_samples` rollouts.
pub fn pass_at_k_multi(num_samples: usize, num_correct: &[usize], k: usize) -> f64 {
    if num_correct.is_empty() {
        return 0.0;
    }
    num_correct
        .iter()
        .map(|&c| pass_at_k(num_samples, c, k))
        .sum::<f64>()
        / num_correct.len() as f64
}

/// Accuracy-Efficiency Score against a base model.
///
///   AES = (L_b - L) / L_b + { 3 (p - p_b) / p_b   if p >= p_b
///                           { -5 (p_b - p) / p_b  otherwise
///
/// A term whose baseline is not positive contributes 0.
pub fn aes_score(pass_at_1: f64, pass_at_1_base: f64, avg_tokens: f64, avg_tokens_base: f64) -> f64 {
    let token_term = if avg_tokens_base <= 0.0 {
        0.0
    } else {
        (avg_tokens_base - avg_tokens) / avg_tokens_base
    };

    let acc_term = if pass_at_1_base <= 0.0 {
        0.0
    } else if pass_at_1 >= pass_at_1_base {
        3.0 * (pass_at_1 - pass_at_1_base) / pass_at_1_base
    } else {
        -5.0 * (pass_at_1_base - pass_at_1) / pass_at_1_base
    };

    token_term + acc_term
}

/// Fraction of `(pred, label)` pairs the checker accepts. Pairs are zipped, so
/// unmatched trailing predictions are ignored.
pub fn compute_accuracy<C: AnswerChecker + ?Sized>(preds: &[String], labels: &[String], checker: &C) -> f64 {
    if preds.is_empty() {
        return 0.0;
    }
    let correct = preds
        .iter()
        .zip(labels)
        .filter(|(p, g)| checker.is_correct(p, g))
        .count();
    correct as f64 / preds.len() as f64
}

/// Mean token count, 0.0 for no samples.
pub fn compute_avg_tokens(lengths: &[usize]) -> f64 {
    if lengths.is_empty() {
        return 0.0;
    }
    lengths.iter().sum::<usize>() as f64 / lengths.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::answer::NormalizedMatch;

    #[test]
    fn test_pass_at_1() {
        assert_eq!(pass_at_k(10, 5, 1), 0.5);
        assert_eq!(pass_at_k(1, 1, 1), 1.0);
        assert_eq!(pass_at_k(1, 0, 1), 0.0);
    }

    #[test]
    fn test_pass_at_2() {
        // 1 - C(5, 2) / C(10, 2) = 1 - 10 / 45
        assert!((pass_at_k(10, 5, 2) - (1.0 - 10.0 / 45.0)).abs() < 1e-9);
    }

    #[test]
    fn test_pass_at_k_edges() {
        assert_eq!(pass_at_k(0, 0, 1), 0.0);
        assert_eq!(pass_at_k(4, 2, 5), 0.0);
        assert_eq!(pass_at_k(4, 3, 2), 1.0);
        assert_eq!(pass_at_k(4, 0, 2), 0.0);
    }

    #[test]
    fn test_pass_at_k_multi() {
        let p = pass_at_k_multi(10, &[5, 10, 0], 1);
        assert!((p - 0.5).abs() < 1e-12);
        assert_eq!(pass_at_k_multi(10, &[], 1), 0.0);
    }

    #[test]
    fn test_aes_improvement() {
        let aes = aes_score(0.9, 0.8, 500.0, 1000.0);
        assert!(aes > 0.0);
        assert!((aes - 0.5 - 3.0 * 0.1 / 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_aes_accuracy_drop_penalty() {
        let aes = aes_score(0.7, 0.8, 500.0, 1000.0);
        assert!((aes - 0.5 - (-5.0 * 0.1 / 0.8)).abs() < 1e-9);
    }

    #[test]
    fn test_aes_degenerate_baselines() {
        assert_eq!(aes_score(0.5, 0.0, 100.0, 0.0), 0.0);
    }

    #[test]
    fn test_accuracy_and_tokens() {
        let preds = vec!["42".to_string(), "#### 7".to_string(), "x".to_string()];
        let labels = vec!["42".to_string(), "7".to_string(), "y".to_string()];
        let acc = compute_accuracy(&preds, &labels, &NormalizedMatch);
        assert!((acc - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(compute_avg_tokens(&[100, 200, 300]), 200.0);
        assert_eq!(compute_avg_tokens(&[]), 0.0);
    }
}
