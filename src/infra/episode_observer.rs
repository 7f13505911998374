use crate::episode::EpisodeSummary;
use crate::infra::Point;
use crate::state::{ArenaGrid, BeliefState, Label, LandmarkGraph, TickUpdate};

/// Trait for observing episode events during a pursuit run
pub trait EpisodeObserver {
    /// Called once the arena, grid and planning graph are built
    fn on_episode_start(&mut self, seed: u64, grid: &ArenaGrid, graph: &LandmarkGraph);

    /// Called after every belief tick
    fn on_tick(
        &mut self,
        tick: u64,
        update: TickUpdate,
        belief: &BeliefState,
        agent: Point,
        adversary: Point,
    );

    /// Called when the planner picks (or fails to pick) a target landmark
    fn on_action_selected(&mut self, _tick: u64, _action: Option<Label>, _target: Option<Point>) {
        // Default implementation does nothing
    }

    /// Called when the belief had to be reset after losing all mass
    fn on_belief_reset(&mut self, _tick: u64) {}

    /// Called when the episode ends
    fn on_episode_finished(&mut self, summary: &EpisodeSummary);
}
