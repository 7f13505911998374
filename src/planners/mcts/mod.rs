//! Monte Carlo Tree Search over the landmark graph.
//!
//! Selection uses UCB1, rollouts walk the precomputed edge paths in fixed
//! steps and score each step with a [`RewardFunction`], and rewards are
//! discounted on their way back to the root.

mod config;
mod planner;
mod reward;
mod tree;

pub use config::PlannerConfig;
pub use planner::MctsPlanner;
pub use reward::{BeliefReward, BeliefRewardConfig, RewardFunction, StencilKernel, StepReward};
pub use tree::{NodeId, Rollout, SearchTree, TreeNode};
