use std::env;
use std::str::FromStr;

use crate::infra::{PursuitError, Result};
use crate::planners::mcts::{BeliefRewardConfig, PlannerConfig};
use crate::state::{BeliefConfig, DiffusionConfig};

fn get_env_var<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|val| val.parse::<T>().ok())
}

/// Everything one pursuit episode needs, passed explicitly at construction.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Seed for the simulated adversary.
    pub seed: u64,
    /// Side length of the square arena.
    pub arena_size: f64,
    /// Grid columns.
    pub definition: usize,
    pub max_ticks: u64,
    /// Range of the agent's field of view.
    pub view_radius: f64,
    /// Distance at which the agent catches the adversary.
    pub capture_radius: f64,
    /// Arena units the agent moves per tick.
    pub agent_speed: f64,
    /// Spacing of the waypoint lattice fed to landmark selection.
    pub lattice_spacing: f64,
    /// Landmarks kept for planning.
    pub landmark_count: usize,
    pub centrality_depth: usize,
    /// Predicted belief frames handed to the planner after the current one.
    pub lookahead: usize,
    pub belief: BeliefConfig,
    pub diffusion: DiffusionConfig,
    pub planner: PlannerConfig,
    pub reward: BeliefRewardConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed: 7,
            arena_size: 40.0,
            definition: 40,
            max_ticks: 300,
            view_radius: 8.0,
            capture_radius: 1.5,
            agent_speed: 1.2,
            lattice_spacing: 4.0,
            landmark_count: 40,
            centrality_depth: 3,
            lookahead: 10,
            belief: BeliefConfig::default(),
            diffusion: DiffusionConfig::default(),
            planner: PlannerConfig::default(),
            reward: BeliefRewardConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Defaults overridden by any `PURSUIT_*` environment variables that parse.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(seed) = get_env_var("PURSUIT_SEED") {
            config.seed = seed;
        }
        if let Some(size) = get_env_var("PURSUIT_ARENA_SIZE") {
            config.arena_size = size;
        }
        if let Some(definition) = get_env_var("PURSUIT_DEFINITION") {
            config.definition = definition;
        }
        if let Some(ticks) = get_env_var("PURSUIT_MAX_TICKS") {
            config.max_ticks = ticks;
        }
        if let Some(radius) = get_env_var("PURSUIT_VIEW_RADIUS") {
            config.view_radius = radius;
        }
        if let Some(count) = get_env_var("PURSUIT_LANDMARKS") {
            config.landmark_count = count;
        }
        if let Some(lookahead) = get_env_var("PURSUIT_LOOKAHEAD") {
            config.lookahead = lookahead;
        }
        if let Some(size) = get_env_var::<f64>("PURSUIT_OTHER_SIZE") {
            config.belief.other_size = Some(size);
        }
        if let Some(speed) = get_env_var("PURSUIT_ADVERSARY_SPEED") {
            config.diffusion.speed = speed;
        }
        if let Some(budget) = get_env_var("PURSUIT_BUDGET") {
            config.planner.budget = budget;
        }
        if let Some(depth) = get_env_var("PURSUIT_DEPTH") {
            config.planner.depth = depth;
        }
        if let Some(c) = get_env_var("PURSUIT_EXPLORATION") {
            config.planner.exploration = c;
        }
        if let Some(discount) = get_env_var("PURSUIT_DISCOUNT") {
            config.planner.discount = discount;
        }
        if let Some(radius) = get_env_var("PURSUIT_STENCIL_RADIUS") {
            config.reward.stencil_radius = radius;
        }

        config
    }

    pub fn validate(&self) -> Result<()> {
        self.planner.validate()?;

        if self.definition == 0 {
            return Err(PursuitError::InvalidConfig("definition must be at least 1".into()));
        }
        for (name, value) in [
            ("arena_size", self.arena_size),
            ("view_radius", self.view_radius),
            ("agent_speed", self.agent_speed),
            ("lattice_spacing", self.lattice_spacing),
            ("adversary speed", self.diffusion.speed),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(PursuitError::InvalidConfig(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }
        if self.capture_radius < 0.0 {
            return Err(PursuitError::InvalidConfig(format!(
                "capture_radius must not be negative, got {}",
                self.capture_radius
            )));
        }
        Ok(())
    }
}
