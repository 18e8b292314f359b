//! Advantage mode selector.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DcaError;

/// Accepted spellings, in the order they are reported in errors.
pub const VALID_MODES: &str = "vanilla, grpo_lp, dca, dca_rloo";

/// How advantages (and the rewards feeding them) are computed for a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Binary reward, population-normalized.
    #[default]
    Vanilla,
    /// Coupled length penalty `1 - gamma * length` folded into the reward.
    GrpoLp,
    /// Decoupled conditional advantage with the GRPO baseline
    /// (or RLOO when `use_rloo` is set).
    Dca,
    /// Decoupled conditional advantage with the RLOO baseline.
    DcaRloo,
}

impl Mode {
    /// All modes, in declaration order.
    pub const ALL: [Mode; 4] = [Mode::Vanilla, Mode::GrpoLp, Mode::Dca, Mode::DcaRloo];

    /// Canonical lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Vanilla => "vanilla",
            Mode::GrpoLp => "grpo_lp",
            Mode::Dca => "dca",
            Mode::DcaRloo => "dca_rloo",
        }
    }

    /// Whether length enters through the decoupled composer rather than the reward.
    pub fn is_decoupled(self) -> bool {
        matches!(self, Mode::Dca | Mode::DcaRloo)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = DcaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Mode::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| DcaError::UnknownMode {
                given: s.to_string(),
                valid: VALID_MODES,
            })
    }
}
