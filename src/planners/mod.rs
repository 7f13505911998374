pub mod mcts;

pub use mcts::MctsPlanner;
