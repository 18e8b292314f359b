//! Small numeric helpers shared by every estimator.
//!
//! All divisions by a statistical spread go through [`floored_spread`], so the
//! epsilon policy lives in exactly one place.

/// Default epsilon used to floor standard deviations.
pub const DEFAULT_EPS: f64 = 1e-8;

/// Z-scores are clipped to this magnitude before the sigmoid.
pub const Z_CLIP: f64 = 20.0;

/// Magnitudes above this are divided out before squaring or summing.
const RESCALE_ABOVE: f64 = 1e150;

/// Factor that brings `values` into a range where sums of squares cannot
/// overflow. 1.0 for ordinary inputs, which keeps their arithmetic exact.
pub(crate) fn rescale_factor(values: &[f64]) -> f64 {
    let max_abs = values.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
    if max_abs > RESCALE_ABOVE && max_abs.is_finite() {
        max_abs
    } else {
        1.0
    }
}

/// Arithmetic mean. Returns 0.0 for an empty slice.
///
/// Falls back to summing `v / n` when the plain sum overflows, so the mean of
/// finite values is always finite.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let total: f64 = values.iter().sum();
    if total.is_finite() {
        total / n
    } else {
        values.iter().map(|v| v / n).sum()
    }
}

/// Population standard deviation (divides by N, not N-1).
///
/// We normalize within a fixed group rather than estimate a population
/// parameter, so this matches the group-relative convention. Large values are
/// rescaled first; the result is only infinite when the true spread exceeds
/// `f64::MAX`.
pub fn population_std(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let scale = rescale_factor(values);
    let mu = mean(values) / scale;
    let variance = values
        .iter()
        .map(|v| (v / scale - mu).powi(2))
        .sum::<f64>()
        / values.len() as f64;
    scale * variance.sqrt()
}

/// Z-scores against a fixed reference set:
///
///   z(v) = (v - mean(ref)) / floored_spread(std(ref), eps)
///
/// Statistics are held in rescaled units when the reference holds very large
/// values. A finite reference always gives a finite, strictly positive spread,
/// so `z` is never NaN for finite `v`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZScore {
    scale: f64,
    mu: f64,
    spread: f64,
}

impl ZScore {
    pub fn fit(reference: &[f64], eps: f64) -> Self {
        let scale = rescale_factor(reference);
        let scaled: Vec<f64> = reference.iter().map(|v| v / scale).collect();
        Self {
            scale,
            mu: mean(&scaled),
            spread: floored_spread(population_std(&scaled), eps / scale),
        }
    }

    pub fn z(&self, value: f64) -> f64 {
        (value / self.scale - self.mu) / self.spread
    }
}

/// Denominator for a spread-normalized quantity: `max(std, eps) + eps`.
///
/// Always strictly positive for `eps > 0`, so `(x - mean) / floored_spread(..)`
/// is finite for finite `x`.
pub fn floored_spread(std: f64, eps: f64) -> f64 {
    std.max(eps) + eps
}

/// Logistic sigmoid with the argument clipped to `[-Z_CLIP, Z_CLIP]`.
pub fn clipped_sigmoid(z: f64) -> f64 {
    let z = z.clamp(-Z_CLIP, Z_CLIP);
    1.0 / (1.0 + (-z).exp())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_and_std() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((mean(&values) - 5.0).abs() < 1e-12);
        assert!((population_std(&values) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_is_zero() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(population_std(&[]), 0.0);
    }

    #[test]
    fn test_mean_survives_overflowing_sum() {
        let m = mean(&[1.7e308, 1.7e308, 1.1e308]);
        assert!(m.is_finite());
        assert!((m / 1.5e308 - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_std_of_huge_values() {
        // Deviations of +-0.35e308 square to inf without rescaling.
        let s = population_std(&[1.0e308, 1.7e308]);
        assert!(s.is_finite());
        assert!((s / 0.35e308 - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_zscore_ordinary_values_unscaled() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let z = ZScore::fit(&values, 1e-8);
        assert_eq!(z.z(9.0), (9.0 - 5.0) / floored_spread(2.0, 1e-8));
    }

    #[test]
    fn test_zscore_near_max_is_finite() {
        let reference = [1.0e308, 1.7e308];
        let z = ZScore::fit(&reference, DEFAULT_EPS);
        assert!((z.z(1.7e308) - 1.0).abs() < 1e-9);
        assert!((z.z(1.0e308) + 1.0).abs() < 1e-9);
        // Values far outside the reference still give a number, never NaN.
        assert!(z.z(-f64::MAX).is_finite());
        assert!(z.z(3.0).is_finite());
    }

    #[test]
    fn test_zscore_constant_huge_reference() {
        let z = ZScore::fit(&[f64::MAX; 3], DEFAULT_EPS);
        assert_eq!(z.z(f64::MAX), 0.0);
    }

    #[test]
    fn test_floored_spread() {
        // Zero spread is floored at eps, then eps is added once more.
        assert!((floored_spread(0.0, 1e-8) - 2e-8).abs() < 1e-20);
        assert!((floored_spread(0.5, 1e-8) - (0.5 + 1e-8)).abs() < 1e-15);
        assert!(floored_spread(0.0, DEFAULT_EPS) > 0.0);
    }

    #[test]
    fn test_clipped_sigmoid_bounds() {
        assert!((clipped_sigmoid(0.0) - 0.5).abs() < 1e-12);
        for z in [-1e300, -50.0, -20.0, 20.0, 50.0, 1e300] {
            let s = clipped_sigmoid(z);
            assert!(s > 0.0 && s < 1.0, "sigmoid({z}) = {s}");
        }
        assert_eq!(clipped_sigmoid(1e6), clipped_sigmoid(Z_CLIP));
    }
}
