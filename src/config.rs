use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::advantage::Mode;
use crate::error::{DcaError, Result};

/// Complete configuration for advantage computation, batch adaptation and the
/// toy validation run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DcaConfig {
    pub advantage: AdvantageConfig,
    pub adapter: AdapterConfig,
    pub simulation: SimulationConfig,
}

/// Advantage estimation settings, chosen once per call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvantageConfig {
    /// Estimator mode (default: vanilla).
    pub mode: Mode,
    /// Length-term weight for DCA (default: 0.2). Ignored by vanilla / grpo_lp.
    pub beta: f64,
    /// Length penalty per token for grpo_lp rewards (default: 1e-3).
    pub gamma: f64,
    /// Use the leave-one-out baseline when `mode` is `dca` (default: false).
    pub use_rloo: bool,
    /// Scale the length term by the pass rate, i.e. DDCA (default: true).
    pub use_dynamic: bool,
    /// Epsilon floor for standard deviations (default: 1e-8).
    pub eps: f64,
}

/// Key names and grouping for host-trainer batch dictionaries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    /// Key holding per-response rewards (default: "rewards").
    pub reward_key: String,
    /// Key holding per-response token lengths (default: "response_lengths").
    pub length_key: String,
    /// Optional key holding per-response correctness flags.
    pub correct_key: Option<String>,
    /// Responses per prompt G for flat batches. `None` treats the batch as one group.
    pub group_size: Option<usize>,
}

/// Toy policy used by `simulate` to sanity-check the estimators end to end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Responses sampled per step (default: 4).
    pub group_size: usize,
    /// DCA length weight (default: 0.2).
    pub beta: f64,
    /// Coupled length penalty (default: 1e-3).
    pub gamma: f64,
    /// Step size for the Poisson rate update (default: 2.0).
    pub learning_rate: f64,
    /// Number of update steps (default: 100).
    pub steps: usize,
    /// RNG seed (default: 42).
    pub seed: u64,
    /// Starting mean response length (default: 120.0).
    pub initial_lambda: f64,
}

impl Default for AdvantageConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Vanilla,
            beta: 0.2,
            gamma: 1e-3,
            use_rloo: false,
            use_dynamic: true,
            eps: crate::advantage::DEFAULT_EPS,
        }
    }
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            reward_key: "rewards".into(),
            length_key: "response_lengths".into(),
            correct_key: None,
            group_size: None,
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            group_size: 4,
            beta: 0.2,
            gamma: 1e-3,
            learning_rate: 2.0,
            steps: 100,
            seed: 42,
            initial_lambda: 120.0,
        }
    }
}

impl DcaConfig {
    /// Parse a configuration from JSON text. Missing sections and fields keep
    /// their defaults.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| DcaError::Config(e.to_string()))
    }

    /// Load a JSON configuration file.
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        use anyhow::Context;

        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }
}
