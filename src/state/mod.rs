mod arena;
mod belief;
mod components;
mod diffusion;
mod landmark_graph;

pub use arena::{ArenaGrid, Cell};
pub use belief::{BeliefConfig, BeliefState, Prediction, TickUpdate};
pub use components::{PredictionComponent, TickContext};
pub use diffusion::{DiffusionComponent, DiffusionConfig};
pub use landmark_graph::{Edge, Label, LandmarkGraph};
