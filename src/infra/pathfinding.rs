use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

use crate::infra::{PursuitError, Result};
use crate::state::{Label, LandmarkGraph};

#[derive(Clone, PartialEq)]
struct Node {
    label: Label,
    f_score: f64,
    seq: u64, // Push order, earlier entries win ties
}

impl Eq for Node {}

impl Ord for Node {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap on f_score, then on insertion order
        other
            .f_score
            .total_cmp(&self.f_score)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Node {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

pub struct AStar;

impl AStar {
    /// Shortest hop sequence `[start, .., goal]` over the landmark graph.
    ///
    /// Edge weights are the precomputed edge costs, the heuristic is the
    /// straight-line distance to `goal`. Returns an empty path when `goal`
    /// cannot be reached from `start`.
    #[tracing::instrument(level = "trace", skip(graph))]
    pub fn find_path(graph: &LandmarkGraph, start: Label, goal: Label) -> Result<Vec<Label>> {
        let goal_point = graph.point(goal).ok_or(PursuitError::UnknownLabel(goal))?;
        let start_point = graph.point(start).ok_or(PursuitError::UnknownLabel(start))?;

        if start == goal {
            return Ok(vec![start]);
        }

        let mut open_set = BinaryHeap::new();
        let mut came_from: HashMap<Label, Label> = HashMap::new();
        let mut g_score: HashMap<Label, f64> = HashMap::new();
        let mut closed_set: HashSet<Label> = HashSet::new();
        let mut seq = 0u64;

        g_score.insert(start, 0.0);
        open_set.push(Node {
            label: start,
            f_score: start_point.distance(&goal_point),
            seq,
        });

        let mut expansions = 0usize;

        while let Some(Node { label: current, .. }) = open_set.pop() {
            if current == goal {
                tracing::trace!(expansions, "Path found");
                return Ok(reconstruct_path(&came_from, current));
            }

            if !closed_set.insert(current) {
                continue;
            }
            expansions += 1;

            let current_g = g_score.get(&current).copied().unwrap_or(f64::INFINITY);

            for (neighbor, cost) in graph.neighbors(current) {
                if closed_set.contains(&neighbor) {
                    continue;
                }

                let tentative_g = current_g + cost;
                if tentative_g < g_score.get(&neighbor).copied().unwrap_or(f64::INFINITY) {
                    came_from.insert(neighbor, current);
                    g_score.insert(neighbor, tentative_g);
                    let h = graph
                        .point(neighbor)
                        .map(|p| p.distance(&goal_point))
                        .unwrap_or(0.0);
                    seq += 1;
                    open_set.push(Node {
                        label: neighbor,
                        f_score: tentative_g + h,
                        seq,
                    });
                }
            }
        }

        tracing::trace!(expansions, "No path found");
        Ok(Vec::new())
    }
}

fn reconstruct_path(came_from: &HashMap<Label, Label>, mut current: Label) -> Vec<Label> {
    let mut path = vec![current];
    while let Some(&prev) = came_from.get(&current) {
        path.push(prev);
        current = prev;
    }
    path.reverse();
    path
}
