//! Toy end-to-end validation on CPU.
//!
//! The "policy" is a single parameter lambda: response lengths are drawn from
//! Poisson(lambda), and a response is correct with a probability that peaks
//! near an optimal length. Each step samples a group, computes advantages with
//! either DCA or the coupled length penalty, and takes a REINFORCE step on
//! lambda using the Poisson score `L / lambda - 1`.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Poisson};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use crate::advantage::{advantage_dca_grpo, advantage_vanilla_grpo, rewards_coupled_lp, DEFAULT_EPS};
use crate::config::SimulationConfig;
use crate::error::{DcaError, Result};

/// Length with the highest chance of a correct answer.
pub const OPTIMAL_LENGTH: f64 = 80.0;
const PEAK_WIDTH: f64 = 600.0;
const BASE_CORRECT: f64 = 0.2;

const LAMBDA_MIN: f64 = 5.0;
const LAMBDA_MAX: f64 = 2000.0;

/// Final lambda must land here for a trial to count as healthy.
pub const HEALTHY_LAMBDA: (f64, f64) = (10.0, 500.0);

/// Seeds used by multi-seed validation when none are given.
pub const DEFAULT_SEEDS: [u64; 10] = [42, 43, 44, 45, 46, 47, 48, 49, 50, 51];

/// Which advantage estimator drives the update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Estimator {
    /// DDCA-GRPO on binary correctness.
    Dca,
    /// Vanilla GRPO on `1 - gamma * L` rewards.
    CoupledLp,
}

/// Per-step record of one trial.
#[derive(Debug, Clone, Serialize)]
pub struct TrialHistory {
    pub estimator: Estimator,
    /// lambda before the first step and after each step (`steps + 1` entries).
    pub lambdas: Vec<f64>,
    /// Fraction of correct responses sampled at each step.
    pub accuracy: Vec<f64>,
}

impl TrialHistory {
    pub fn final_lambda(&self) -> f64 {
        self.lambdas.last().copied().unwrap_or(f64::NAN)
    }

    /// Mean accuracy over the last `window` steps.
    pub fn recent_accuracy(&self, window: usize) -> f64 {
        let start = self.accuracy.len().saturating_sub(window);
        let tail = &self.accuracy[start..];
        if tail.is_empty() {
            return 0.0;
        }
        tail.iter().sum::<f64>() / tail.len() as f64
    }

    pub fn is_healthy(&self) -> bool {
        let l = self.final_lambda();
        l >= HEALTHY_LAMBDA.0 && l <= HEALTHY_LAMBDA.1
    }
}

/// Both estimators run from the same starting point.
#[derive(Debug, Clone, Serialize)]
pub struct Comparison {
    pub dca: TrialHistory,
    pub coupled: TrialHistory,
}

impl Comparison {
    pub fn passed(&self) -> bool {
        self.dca.is_healthy() && self.coupled.is_healthy()
    }
}

/// Result of [`compare`] at one seed.
#[derive(Debug, Clone, Serialize)]
pub struct SeedReport {
    pub seed: u64,
    pub comparison: Comparison,
}

impl SeedReport {
    pub fn passed(&self) -> bool {
        self.comparison.passed()
    }
}

/// P(correct | length): a Gaussian bump around [`OPTIMAL_LENGTH`] on top of a floor.
pub fn p_correct_given_length(length: f64) -> f64 {
    BASE_CORRECT + 0.75 * (-(length - OPTIMAL_LENGTH).powi(2) / PEAK_WIDTH).exp()
}

/// Run `config.steps` updates with `estimator`, seeded with `seed`.
pub fn run_trial(estimator: Estimator, config: &SimulationConfig, seed: u64) -> Result<TrialHistory> {
    if config.group_size == 0 {
        return Err(DcaError::Simulation("group size must be at least 1".into()));
    }
    if !(config.initial_lambda > 0.0) {
        return Err(DcaError::Simulation(format!(
            "initial lambda must be positive, got {}",
            config.initial_lambda
        )));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut lambda = config.initial_lambda.clamp(LAMBDA_MIN, LAMBDA_MAX);
    let mut lambdas = Vec::with_capacity(config.steps + 1);
    let mut accuracy = Vec::with_capacity(config.steps);
    lambdas.push(lambda);

    for step in 0..config.steps {
        let poisson = Poisson::new(lambda).map_err(|e| DcaError::Simulation(e.to_string()))?;

        let lengths: Vec<f64> = (0..config.group_size)
            .map(|_| {
                let l: f64 = poisson.sample(&mut rng);
                l.clamp(1.0, 1e4)
            })
            .collect();
        let correct: Vec<bool> = lengths
            .iter()
            .map(|&l| rng.gen::<f64>() < p_correct_given_length(l))
            .collect();

        let advantages = match estimator {
            Estimator::Dca => advantage_dca_grpo(&correct, &lengths, config.beta, DEFAULT_EPS, true),
            Estimator::CoupledLp => {
                let rewards = rewards_coupled_lp(&correct, &lengths, config.gamma);
                advantage_vanilla_grpo(&rewards, DEFAULT_EPS)
            }
        };

        let grad = advantages
            .iter()
            .zip(&lengths)
            .map(|(a, l)| a * (l / (lambda + 1e-8) - 1.0))
            .sum::<f64>()
            / config.group_size as f64;
        lambda = (lambda + config.learning_rate * grad).clamp(LAMBDA_MIN, LAMBDA_MAX);

        let acc = correct.iter().filter(|&&c| c).count() as f64 / correct.len() as f64;
        lambdas.push(lambda);
        accuracy.push(acc);

        debug!(step, ?estimator, lambda, accuracy = acc, "Simulation step");
    }

    Ok(TrialHistory {
        estimator,
        lambdas,
        accuracy,
    })
}

/// Run DCA with `config.seed` and the coupled penalty with `config.seed + 1`.
pub fn compare(config: &SimulationConfig) -> Result<Comparison> {
    let dca = run_trial(Estimator::Dca, config, config.seed)?;
    let coupled = run_trial(Estimator::CoupledLp, config, config.seed.wrapping_add(1))?;

    info!(
        dca_lambda = dca.final_lambda(),
        coupled_lambda = coupled.final_lambda(),
        dca_accuracy = dca.recent_accuracy(20),
        coupled_accuracy = coupled.recent_accuracy(20),
        "Simulation finished"
    );

    Ok(Comparison { dca, coupled })
}

/// Run [`compare`] once per seed, in parallel. Reports keep the order of `seeds`.
pub fn compare_seeds(config: &SimulationConfig, seeds: &[u64]) -> Result<Vec<SeedReport>> {
    let reports = seeds
        .par_iter()
        .map(|&seed| {
            let config = SimulationConfig {
                seed,
                ..config.clone()
            };
            compare(&config).map(|comparison| SeedReport { seed, comparison })
        })
        .collect::<Result<Vec<_>>>()?;

    let healthy = reports.iter().filter(|r| r.passed()).count();
    info!(runs = reports.len(), healthy, "Multi-seed simulation finished");
    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> SimulationConfig {
        SimulationConfig {
            steps: 30,
            ..SimulationConfig::default()
        }
    }

    #[test]
    fn test_p_correct_peaks_at_optimal_length() {
        let peak = p_correct_given_length(OPTIMAL_LENGTH);
        assert!((peak - 0.95).abs() < 1e-12);
        assert!(p_correct_given_length(20.0) < peak);
        assert!(p_correct_given_length(400.0) < peak);
        assert!((p_correct_given_length(10_000.0) - BASE_CORRECT).abs() < 1e-12);
    }

    #[test]
    fn test_trial_history_shapes() {
        let config = small_config();
        for estimator in [Estimator::Dca, Estimator::CoupledLp] {
            let h = run_trial(estimator, &config, 7).unwrap();
            assert_eq!(h.lambdas.len(), config.steps + 1);
            assert_eq!(h.accuracy.len(), config.steps);
            assert!(h.lambdas.iter().all(|l| (LAMBDA_MIN..=LAMBDA_MAX).contains(l)));
            assert!(h.accuracy.iter().all(|a| (0.0..=1.0).contains(a)));
        }
    }

    #[test]
    fn test_trial_is_deterministic_per_seed() {
        let config = small_config();
        let a = run_trial(Estimator::Dca, &config, 3).unwrap();
        let b = run_trial(Estimator::Dca, &config, 3).unwrap();
        assert_eq!(a.lambdas, b.lambdas);
        assert_eq!(a.accuracy, b.accuracy);
    }

    #[test]
    fn test_zero_group_size_is_rejected() {
        let config = SimulationConfig {
            group_size: 0,
            ..small_config()
        };
        assert!(matches!(
            run_trial(Estimator::Dca, &config, 1),
            Err(DcaError::Simulation(_))
        ));
    }

    #[test]
    fn test_zero_steps() {
        let config = SimulationConfig {
            steps: 0,
            ..small_config()
        };
        let h = run_trial(Estimator::CoupledLp, &config, 1).unwrap();
        assert_eq!(h.lambdas, vec![config.initial_lambda]);
        assert_eq!(h.recent_accuracy(20), 0.0);
    }

    #[test]
    fn test_compare_runs_both() {
        let c = compare(&small_config()).unwrap();
        assert_eq!(c.dca.estimator, Estimator::Dca);
        assert_eq!(c.coupled.estimator, Estimator::CoupledLp);
    }

    #[test]
    fn test_compare_seeds_matches_single_runs() {
        let config = small_config();
        let reports = compare_seeds(&config, &[5, 9]).unwrap();
        assert_eq!(reports.iter().map(|r| r.seed).collect::<Vec<_>>(), vec![5, 9]);

        let single = compare(&SimulationConfig { seed: 9, ..config }).unwrap();
        assert_eq!(reports[1].comparison.dca.lambdas, single.dca.lambdas);
        assert_eq!(reports[1].comparison.coupled.lambdas, single.coupled.lambdas);
        assert_eq!(reports[1].passed(), single.passed());
    }

    #[test]
    fn test_compare_seeds_propagates_errors() {
        let config = SimulationConfig {
            group_size: 0,
            ..small_config()
        };
        assert!(compare_seeds(&config, &DEFAULT_SEEDS).is_err());
    }

    #[test]
    fn test_compare_seeds_empty() {
        assert!(compare_seeds(&small_config(), &[]).unwrap().is_empty());
    }
}
