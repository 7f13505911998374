use crate::infra::{Point, Result, Steps};
use crate::planners::mcts::{NodeId, PlannerConfig, RewardFunction, Rollout, SearchTree};
use crate::state::{Label, LandmarkGraph};

/// Picks the next landmark to move toward by searching the landmark graph.
///
/// Each call builds a fresh [`SearchTree`] rooted at the agent's position,
/// runs `budget` iterations of select / walk / backpropagate and returns the
/// root child with the best mean value. The chosen label is remembered and
/// forced as the first selection of the next call.
#[derive(Debug)]
pub struct MctsPlanner {
    config: PlannerConfig,
    last_action: Option<Label>,
}

impl MctsPlanner {
    pub fn new(config: PlannerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            last_action: None,
        })
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn last_action(&self) -> Option<Label> {
        self.last_action
    }

    /// Overrides the label re-committed to on the next call.
    pub fn set_last_action(&mut self, label: Option<Label>) {
        self.last_action = label;
    }

    /// Next landmark to move toward from `point`, or `None` when the nearest
    /// landmark has no edges.
    #[tracing::instrument(level = "trace", skip(self, graph, reward), fields(x = point.x, y = point.y))]
    pub fn get_action<R>(&mut self, graph: &LandmarkGraph, point: Point, reward: &R) -> Result<Option<Label>>
    where
        R: RewardFunction + ?Sized,
    {
        let tree = self.search(graph, point, reward)?;

        let Some(best) = tree.select_child(NodeId::ROOT, 0.0) else {
            tracing::warn!(x = point.x, y = point.y, "Nearest landmark is isolated, no action");
            self.last_action = None;
            return Ok(None);
        };

        let chosen = tree.get(best);
        tracing::debug!(
            action = ?chosen.label,
            visits = chosen.visits,
            mean_value = chosen.mean_value(),
            tree_size = tree.len(),
            "Planner selected action"
        );
        self.last_action = chosen.label;
        Ok(chosen.label)
    }

    /// Runs the iteration budget and returns the resulting tree.
    pub fn search<R>(&self, graph: &LandmarkGraph, point: Point, reward: &R) -> Result<SearchTree>
    where
        R: RewardFunction + ?Sized,
    {
        let anchor = graph.get_nearest(&point)?;
        let mut tree = SearchTree::new(point);
        tree.expand_root(graph, anchor);

        if tree.root().children.is_empty() {
            return Ok(tree);
        }

        let mut sticky = self.last_action;
        for iteration in 0..self.config.budget {
            let total = self.iterate(&mut tree, graph, reward, sticky.take());
            tracing::trace!(iteration, total, "Iteration finished");
        }
        Ok(tree)
    }

    fn iterate<R>(
        &self,
        tree: &mut SearchTree,
        graph: &LandmarkGraph,
        reward: &R,
        mut forced: Option<Label>,
    ) -> f64
    where
        R: RewardFunction + ?Sized,
    {
        let depth = self.config.depth;
        let mut visited = vec![NodeId::ROOT];
        let mut current = NodeId::ROOT;
        let mut total = 0.0;
        let mut steps = 0;

        // Every positive-length edge takes at least one step, so hops are
        // bounded by depth too; this also stops zero-length edge cycles.
        while steps < depth && visited.len() <= depth {
            tree.expand(current, graph);

            let forced_child = forced
                .take()
                .and_then(|label| tree.child_with_label(current, label));
            let Some(child) =
                forced_child.or_else(|| tree.select_child(current, self.config.exploration))
            else {
                break;
            };

            let rollout = match tree.get(child).rollout {
                Some(cached) => cached,
                None => {
                    let fresh = self.walk(tree, graph, child, steps, reward);
                    tree.get_mut(child).rollout = Some(fresh);
                    fresh
                }
            };

            total += rollout.reward;
            steps += rollout.steps;
            visited.push(child);
            current = child;

            if rollout.terminal {
                break;
            }
        }

        self.backpropagate(tree, &visited, total);
        total
    }

    /// Samples the reward at every step along the edge into `child`.
    fn walk<R>(
        &self,
        tree: &SearchTree,
        graph: &LandmarkGraph,
        child: NodeId,
        steps_before: usize,
        reward: &R,
    ) -> Rollout
    where
        R: RewardFunction + ?Sized,
    {
        let node = tree.get(child);
        let start = node.parent.map_or(node.point, |parent| tree.get(parent).point);
        let stops = match (node.edge_src, node.label) {
            (Some(src), Some(dst)) => graph
                .edge(src, dst)
                .map(|edge| edge.points.clone())
                .unwrap_or_else(|| vec![node.point]),
            _ => vec![node.point],
        };

        let mut rollout = Rollout::default();
        for point in Steps::new(start, stops, self.config.step_length) {
            let sample = reward.sample(point, steps_before + rollout.steps);
            rollout.steps += 1;
            rollout.reward += sample.value;
            if sample.terminal {
                rollout.terminal = true;
                break;
            }
            if steps_before + rollout.steps >= self.config.depth {
                break;
            }
        }
        rollout
    }

    /// Pushes the iteration's reward from the deepest node back to the root.
    ///
    /// A node adds the reward when it beats the node's own cached step reward
    /// or the node is unvisited; otherwise its accumulated value doubles. The
    /// reward shrinks by `discount` per level.
    fn backpropagate(&self, tree: &mut SearchTree, visited: &[NodeId], total: f64) {
        let mut reward = total;
        for &id in visited.iter().rev() {
            let node = tree.get_mut(id);
            if node.visits == 0 || reward > node.step_reward() {
                node.value += reward;
            } else {
                node.value = (node.value * 2.0).clamp(f64::MIN, f64::MAX);
            }
            node.visits += 1;
            reward *= 1.0 - self.config.discount;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planners::mcts::StepReward;

    fn star() -> LandmarkGraph {
        let mut graph = LandmarkGraph::new();
        let center = graph.add_node(Point::new(0.0, 0.0), None).unwrap();
        for (x, y) in [(1.0, 0.0), (-1.0, 0.0), (0.0, 1.0)] {
            let leaf = graph.add_node(Point::new(x, y), None).unwrap();
            graph.connect(center, leaf, None).unwrap();
        }
        graph
    }

    fn reward_at(goal: Point) -> impl Fn(Point, usize) -> StepReward {
        move |p: Point, _step: usize| {
            if p.distance(&goal) < 1e-6 {
                StepReward::terminal(1.0)
            } else {
                StepReward::new(0.0)
            }
        }
    }

    fn planner(budget: usize, depth: usize) -> MctsPlanner {
        MctsPlanner::new(PlannerConfig {
            budget,
            depth,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = PlannerConfig {
            step_length: -1.0,
            ..Default::default()
        };
        assert!(MctsPlanner::new(config).is_err());
    }

    #[test]
    fn test_isolated_node_yields_no_action() {
        let mut graph = LandmarkGraph::new();
        graph.add_node(Point::new(0.0, 0.0), None).unwrap();
        let mut planner = planner(10, 5);
        planner.set_last_action(Some(7));

        let action = planner
            .get_action(&graph, Point::new(0.1, 0.0), &reward_at(Point::new(5.0, 5.0)))
            .unwrap();
        assert_eq!(action, None);
        assert_eq!(planner.last_action(), None);
    }

    #[test]
    fn test_empty_graph_is_error() {
        let mut planner = planner(10, 5);
        let graph = LandmarkGraph::new();
        assert!(planner
            .get_action(&graph, Point::new(0.0, 0.0), &reward_at(Point::new(1.0, 0.0)))
            .is_err());
    }

    #[test]
    fn test_zero_budget_returns_first_child() {
        let graph = star();
        let mut planner = planner(0, 5);
        let action = planner
            .get_action(&graph, Point::new(0.0, 0.0), &reward_at(Point::new(0.0, 1.0)))
            .unwrap();
        assert_eq!(action, Some(1));
    }

    #[test]
    fn test_picks_rewarding_leaf() {
        let graph = star();
        let mut planner = planner(30, 1);
        let action = planner
            .get_action(&graph, Point::new(0.0, 0.0), &reward_at(Point::new(0.0, 1.0)))
            .unwrap();
        assert_eq!(action, Some(3));
        assert_eq!(planner.last_action(), Some(3));
    }

    #[test]
    fn test_sticky_action_is_recommitted() {
        let graph = star();
        let nothing = |_: Point, _: usize| StepReward::new(0.0);

        let mut fresh = planner(1, 1);
        assert_eq!(
            fresh.get_action(&graph, Point::new(0.0, 0.0), &nothing).unwrap(),
            Some(1)
        );

        let mut sticky = planner(1, 1);
        sticky.set_last_action(Some(2));
        assert_eq!(
            sticky.get_action(&graph, Point::new(0.0, 0.0), &nothing).unwrap(),
            Some(2)
        );
    }

    #[test]
    fn test_first_visit_reward_is_cached() {
        let graph = star();
        let planner = planner(12, 1);
        let calls = std::cell::Cell::new(0usize);
        let counting = |_: Point, _: usize| {
            calls.set(calls.get() + 1);
            StepReward::new(0.5)
        };

        let tree = planner.search(&graph, Point::new(0.0, 0.0), &counting).unwrap();
        // One sample per root child: each unit edge is a single step
        assert_eq!(calls.get(), 3);
        let visits: u32 = tree
            .root()
            .children
            .iter()
            .map(|&c| tree.get(c).visits)
            .sum();
        assert_eq!(visits, 12);
        assert_eq!(tree.root().visits, 12);
    }

    #[test]
    fn test_backpropagation_discounts_toward_root() {
        let graph = star();
        let planner = MctsPlanner::new(PlannerConfig {
            budget: 1,
            depth: 2,
            discount: 0.5,
            ..Default::default()
        })
        .unwrap();
        // Rewards the centre: child 1 (step 1) then back to 0 (step 2)
        let tree = planner
            .search(&graph, Point::new(0.0, 0.0), &reward_at(Point::new(0.0, 0.0)))
            .unwrap();

        let child = tree.root().children[0];
        let grandchild = tree.get(child).children[0];
        assert_eq!(tree.get(grandchild).label, Some(0));
        assert_eq!(tree.get(grandchild).value, 1.0);
        assert_eq!(tree.get(child).value, 0.5);
        assert_eq!(tree.root().value, 0.25);
    }
}
