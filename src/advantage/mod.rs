//! Advantage estimation for RLVR response groups.
//!
//! This module implements the decoupled conditional advantage family (DCA and
//! its dynamic variant DDCA) on top of GRPO and RLOO baselines, the coupled
//! length-penalty baseline they are compared against, and the mode dispatch
//! that trainers call once per step.

pub mod baseline;
pub mod composer;
pub mod dispatch;
pub mod length_score;
pub mod mode;
pub mod numeric;
pub mod shaper;

pub use baseline::{leave_one_out, population_normalized, Baseline};
pub use composer::{
    advantage_dca_grpo, advantage_dca_rloo, advantage_vanilla_grpo, compose, decompose,
    AdvantageParts, ComposeParams,
};
pub use dispatch::{
    compute_advantage, compute_advantage_nested, infer_correct_mask, GroupLayout,
    CORRECT_THRESHOLD,
};
pub use length_score::length_score_z_sigmoid;
pub use mode::{Mode, VALID_MODES};
pub use numeric::{floored_spread, DEFAULT_EPS};
pub use shaper::{reward_vanilla, rewards_coupled_lp, shape_rewards};
