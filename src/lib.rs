pub mod config;
pub mod episode;
pub mod infra;
pub mod planners;
pub mod state;

// Re-export commonly used types for convenience
pub use config::EngineConfig;
pub use infra::{Point, Polygon, PursuitError, Result, Steps};
pub use planners::mcts::{BeliefReward, MctsPlanner, PlannerConfig, RewardFunction, StepReward};
pub use state::{ArenaGrid, BeliefState, DiffusionComponent, Label, LandmarkGraph};
