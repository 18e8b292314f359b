//! DCA: Decoupled Conditional Advantage for RLVR
//!
//! Per-response advantages for groups of sampled answers to the same prompt,
//! balancing correctness against response length. Accuracy is centered over
//! the whole group; length is only compared among correct answers, optionally
//! scaled by the group's pass rate (DDCA).

pub mod adapter;
pub mod advantage;
pub mod answer;
pub mod config;
pub mod error;
pub mod metrics;
pub mod simulate;
pub mod verify;

pub use advantage::{
    advantage_dca_grpo, advantage_dca_rloo, advantage_vanilla_grpo, compute_advantage,
    length_score_z_sigmoid, rewards_coupled_lp, GroupLayout, Mode,
};
pub use config::{AdapterConfig, AdvantageConfig, DcaConfig, SimulationConfig};
pub use error::{DcaError, Result};
