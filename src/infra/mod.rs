mod default_observer;
mod episode_observer;
mod error;
mod pathfinding;
mod steps;
mod types;

pub use default_observer::DefaultObserver;
pub use episode_observer::EpisodeObserver;
pub use error::{PursuitError, Result};
pub use pathfinding::AStar;
pub use steps::Steps;
pub use types::{Bounds, Point, Polygon};
