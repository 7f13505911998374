use tracing::{debug, info, warn};

use crate::episode::EpisodeSummary;
use crate::infra::{EpisodeObserver, Point};
use crate::state::{ArenaGrid, BeliefState, Label, LandmarkGraph, TickUpdate};

/// Observer that reports the episode through `tracing`.
pub struct DefaultObserver;

impl EpisodeObserver for DefaultObserver {
    fn on_episode_start(&mut self, seed: u64, grid: &ArenaGrid, graph: &LandmarkGraph) {
        info!("Episode started");
        info!("- seed: {}", seed);
        info!("- grid: {}x{} cells of {:.2}", grid.rows(), grid.columns(), grid.granularity());
        info!("- navigable cells: {}", grid.navigable_count());
        info!("- landmarks: {}", graph.len());
    }

    fn on_tick(
        &mut self,
        tick: u64,
        update: TickUpdate,
        belief: &BeliefState,
        agent: Point,
        adversary: Point,
    ) {
        info!(
            "tick: {}, agent: ({:.1}, {:.1}), adversary: ({:.1}, {:.1}), update: {:?}",
            tick, agent.x, agent.y, adversary.x, adversary.y, update,
        );
        debug!(
            peak = ?belief.peak_cell(),
            mass_at_adversary = belief.probability_at(&adversary),
            "Belief summary"
        );
    }

    fn on_action_selected(&mut self, tick: u64, action: Option<Label>, target: Option<Point>) {
        match (action, target) {
            (Some(label), Some(point)) => {
                info!("tick: {}, target landmark {} at ({:.1}, {:.1})", tick, label, point.x, point.y)
            }
            _ => warn!("tick: {}, planner returned no action", tick),
        }
    }

    fn on_belief_reset(&mut self, tick: u64) {
        warn!("tick: {}, belief lost all mass and was reset to uniform", tick);
    }

    fn on_episode_finished(&mut self, summary: &EpisodeSummary) {
        info!(
            "Episode finished: captured: {}, ticks: {}, sightings: {}",
            summary.captured, summary.ticks, summary.sightings
        );
        info!("Final distance: {:.2}", summary.final_distance);
    }
}
