use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::SeedableRng;

use crate::config::EngineConfig;
use crate::infra::{EpisodeObserver, Point, Polygon, PursuitError, Result, Steps};
use crate::planners::mcts::{BeliefReward, MctsPlanner};
use crate::state::{
    ArenaGrid, BeliefState, DiffusionComponent, Label, LandmarkGraph, PredictionComponent,
    TickUpdate,
};

/// Rays cast when tracing the agent's field of view.
const VIEW_RAYS: usize = 48;

#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeSummary {
    pub seed: u64,
    pub ticks: u64,
    pub captured: bool,
    /// Ticks on which the adversary was in direct sight.
    pub sightings: u64,
    pub final_distance: f64,
}

/// Adversary wandering the waypoint lattice at random.
struct Wanderer {
    position: Point,
    target: Label,
    speed: f64,
}

impl Wanderer {
    fn advance(&mut self, lattice: &LandmarkGraph, rng: &mut StdRng) {
        let mut budget = self.speed;
        while budget > 0.0 {
            let Some(goal) = lattice.point(self.target) else {
                return;
            };
            let gap = self.position.distance(&goal);
            if gap > budget {
                self.position = self.position.toward(&goal, budget);
                return;
            }
            self.position = goal;
            budget -= gap;

            let neighbors: Vec<Label> = lattice.neighbors(self.target).map(|(n, _)| n).collect();
            match neighbors.choose(rng) {
                Some(&next) => self.target = next,
                None => return,
            }
        }
    }
}

/// Synchronous pursuit simulation around one belief state and one planner.
///
/// The arena is a square with a wall in the middle. A waypoint lattice over
/// free space stands in for recorded landmarks and is reduced to the
/// sharpest-boundary landmarks for planning. Each tick the adversary moves,
/// the agent observes, the belief ticks, the planner picks a landmark and the
/// agent steps toward it.
pub struct Episode {
    config: EngineConfig,
    observer: Box<dyn EpisodeObserver>,
}

impl Episode {
    pub fn new(config: EngineConfig, observer: impl EpisodeObserver + 'static) -> Self {
        Self {
            config,
            observer: Box::new(observer),
        }
    }

    pub fn run(&mut self) -> Result<EpisodeSummary> {
        self.config.validate()?;
        let config = self.config.clone();
        let mut rng = StdRng::seed_from_u64(config.seed);

        let size = config.arena_size;
        let arena = Polygon::rectangle(Point::new(0.0, 0.0), Point::new(size, size));
        let wall = Polygon::rectangle(
            Point::new(0.45 * size, 0.2 * size),
            Point::new(0.55 * size, 0.8 * size),
        );
        let grid = ArenaGrid::new(arena, vec![wall], config.definition);

        let lattice =
            LandmarkGraph::lattice(grid.bounds(), config.lattice_spacing, |p| grid.is_free(p));
        if lattice.is_empty() {
            return Err(PursuitError::EmptyGraph);
        }
        let landmarks = lattice.get_lppo(config.landmark_count, config.centrality_depth)?;
        let graph = lattice.get_subgraph(&landmarks)?;

        self.observer.on_episode_start(config.seed, &grid, &graph);

        let components: Vec<Box<dyn PredictionComponent>> =
            vec![Box::new(DiffusionComponent::new(config.diffusion.clone()))];
        let mut belief = BeliefState::new(grid, config.belief.clone(), components)?;
        let mut planner = MctsPlanner::new(config.planner.clone())?;

        let start = lattice.get_nearest(&Point::new(0.1 * size, 0.1 * size))?;
        let mut agent = lattice.point(start).unwrap_or_default();

        let labels: Vec<Label> = lattice.labels().collect();
        let far_away: Vec<Label> = labels
            .iter()
            .copied()
            .filter(|&l| lattice.point(l).is_some_and(|p| p.distance(&agent) > size / 2.0))
            .collect();
        let spawn = far_away
            .choose(&mut rng)
            .or_else(|| labels.last())
            .copied()
            .ok_or(PursuitError::EmptyGraph)?;
        let mut adversary = Wanderer {
            position: lattice.point(spawn).unwrap_or_default(),
            target: spawn,
            speed: config.diffusion.speed,
        };

        let mut sightings = 0;
        let mut captured = false;
        let mut tick = 0;

        while tick < config.max_ticks {
            adversary.advance(&lattice, &mut rng);

            belief.update_self_location(agent);
            if agent.distance(&adversary.position) <= config.view_radius
                && line_of_sight(belief.grid(), agent, adversary.position)
            {
                sightings += 1;
                belief.update_other_location(adversary.position);
            } else {
                belief.update_visibility(field_of_view(belief.grid(), agent, config.view_radius));
            }

            let update = match belief.tick() {
                Ok(update) => update,
                Err(PursuitError::DegenerateDistribution { .. }) => {
                    self.observer.on_belief_reset(tick);
                    belief.reset_uniform()?;
                    TickUpdate::Unchanged
                }
                Err(err) => return Err(err),
            };
            self.observer
                .on_tick(tick, update, &belief, agent, adversary.position);

            let mut frames = vec![belief.probability_distribution().clone()];
            for frame in belief.predict(config.lookahead) {
                match frame {
                    Ok(frame) => frames.push(frame),
                    Err(err) => {
                        tracing::debug!(tick, %err, "Lookahead cut short");
                        break;
                    }
                }
            }
            let reward = BeliefReward::new(belief.grid(), &frames, &config.reward);
            let action = planner.get_action(&graph, agent, &reward)?;
            let target = action.and_then(|label| graph.point(label));
            self.observer.on_action_selected(tick, action, target);

            if let Some(label) = action {
                agent = step_toward(&graph, agent, label, config.agent_speed)?;
            }

            tick += 1;
            if agent.distance(&adversary.position) <= config.capture_radius {
                captured = true;
                break;
            }
        }

        let summary = EpisodeSummary {
            seed: config.seed,
            ticks: tick,
            captured,
            sightings,
            final_distance: agent.distance(&adversary.position),
        };
        self.observer.on_episode_finished(&summary);
        Ok(summary)
    }
}

/// One move of `speed` along the edge from the agent's nearest landmark to
/// `label`, the same route the planner scored.
fn step_toward(graph: &LandmarkGraph, agent: Point, label: Label, speed: f64) -> Result<Point> {
    let anchor = graph.get_nearest(&agent)?;
    let stops = match graph.edge(anchor, label) {
        Some(edge) => edge.points.clone(),
        None => vec![graph.point(label).ok_or(PursuitError::UnknownLabel(label))?],
    };
    Ok(Steps::new(agent, stops, speed).next().unwrap_or(agent))
}

/// True when the straight segment between `a` and `b` stays in free space.
fn line_of_sight(grid: &ArenaGrid, a: Point, b: Point) -> bool {
    let probe = (grid.granularity() / 2.0).max(f64::EPSILON);
    Steps::new(a, vec![b], probe).all(|p| grid.is_free(&p))
}

/// Star-shaped visibility polygon: each ray runs until it leaves free space
/// or reaches `radius`.
fn field_of_view(grid: &ArenaGrid, center: Point, radius: f64) -> Polygon {
    let probe = (grid.granularity() / 2.0).max(f64::EPSILON);
    let outline = Polygon::regular(center, radius, VIEW_RAYS);
    let vertices = outline
        .vertices()
        .iter()
        .map(|&rim| {
            let mut reach = center;
            for p in Steps::new(center, vec![rim], probe) {
                if !grid.is_free(&p) {
                    break;
                }
                reach = p;
            }
            reach
        })
        .collect();
    Polygon::new(vertices)
}
