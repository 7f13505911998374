//! Planner configuration.

use crate::infra::{PursuitError, Result};

/// MCTS planner parameters.
#[derive(Clone, Debug)]
pub struct PlannerConfig {
    /// Iterations per planning call.
    pub budget: usize,

    /// Step cap per iteration. Each step is `step_length` of path walked.
    pub depth: usize,

    /// UCB1 exploration constant `c`.
    pub exploration: f64,

    /// Fraction of reward lost per level while backpropagating.
    pub discount: f64,

    /// Spacing of reward samples along edge paths, in arena units.
    pub step_length: f64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            budget: 200,
            depth: 30,
            exploration: 1.0,
            discount: 0.05,
            step_length: 1.0,
        }
    }
}

impl PlannerConfig {
    pub fn with_budget(budget: usize) -> Self {
        Self {
            budget,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.step_length.is_finite() && self.step_length > 0.0) {
            return Err(PursuitError::InvalidConfig(format!(
                "step_length must be positive, got {}",
                self.step_length
            )));
        }
        if !(0.0..1.0).contains(&self.discount) {
            return Err(PursuitError::InvalidConfig(format!(
                "discount must be in [0, 1), got {}",
                self.discount
            )));
        }
        if !(self.exploration.is_finite() && self.exploration >= 0.0) {
            return Err(PursuitError::InvalidConfig(format!(
                "exploration must be non-negative, got {}",
                self.exploration
            )));
        }
        Ok(())
    }
}
