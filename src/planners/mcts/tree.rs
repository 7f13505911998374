//! Arena-allocated search tree.
//!
//! Tree nodes refer to each other and to landmark graph nodes by index, never
//! by pointer, so the tree can be rebuilt per planning call without fighting
//! the graph's ownership.

use crate::infra::Point;
use crate::state::{Label, LandmarkGraph};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub usize);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);
}

/// Result of walking the path into a node, cached on its first visit.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rollout {
    pub reward: f64,
    pub steps: usize,
    pub terminal: bool,
}

#[derive(Debug, Clone)]
pub struct TreeNode {
    /// Graph node this tree node stands on. `None` only for the root.
    pub label: Option<Label>,
    pub point: Point,
    /// Graph node whose edge leads here.
    pub edge_src: Option<Label>,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub expanded: bool,
    pub visits: u32,
    pub value: f64,
    pub rollout: Option<Rollout>,
}

impl TreeNode {
    fn root(point: Point) -> Self {
        Self {
            label: None,
            point,
            edge_src: None,
            parent: None,
            children: Vec::new(),
            expanded: false,
            visits: 0,
            value: 0.0,
            rollout: None,
        }
    }

    fn child(parent: NodeId, edge_src: Label, label: Label, point: Point) -> Self {
        Self {
            label: Some(label),
            point,
            edge_src: Some(edge_src),
            parent: Some(parent),
            ..Self::root(point)
        }
    }

    /// Reward cached on the first visit, 0 before that.
    pub fn step_reward(&self) -> f64 {
        self.rollout.map_or(0.0, |r| r.reward)
    }

    pub fn mean_value(&self) -> f64 {
        if self.visits == 0 {
            0.0
        } else {
            self.value / self.visits as f64
        }
    }

    /// UCB1 score seen from a parent with `parent_visits` visits.
    ///
    /// Unvisited nodes score +inf while exploring. Unlike plain UCB1, they
    /// score -inf when `c == 0`, so pure exploitation (the final action pick)
    /// never prefers an untried child over a tried one.
    pub fn ucb1(&self, parent_visits: u32, c: f64) -> f64 {
        if self.visits == 0 {
            return if c > 0.0 {
                f64::INFINITY
            } else {
                f64::NEG_INFINITY
            };
        }
        let visits = self.visits as f64;
        let exploration = (2.0 * (parent_visits.max(1) as f64).ln() / visits).sqrt();
        self.value / visits + c * exploration
    }
}

#[derive(Debug)]
pub struct SearchTree {
    nodes: Vec<TreeNode>,
}

impl SearchTree {
    /// Tree whose root sits at an arbitrary continuous position.
    pub fn new(root: Point) -> Self {
        Self {
            nodes: vec![TreeNode::root(root)],
        }
    }

    pub fn get(&self, id: NodeId) -> &TreeNode {
        &self.nodes[id.0]
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut TreeNode {
        &mut self.nodes[id.0]
    }

    pub fn root(&self) -> &TreeNode {
        self.get(NodeId::ROOT)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn add(&mut self, node: TreeNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    /// Gives the root one child per edge of `anchor`, the graph node nearest
    /// to the root position.
    pub fn expand_root(&mut self, graph: &LandmarkGraph, anchor: Label) {
        self.attach_children(NodeId::ROOT, graph, anchor);
    }

    /// Adds one child per incident graph edge. No-op once expanded.
    pub fn expand(&mut self, id: NodeId, graph: &LandmarkGraph) {
        if let Some(label) = self.get(id).label {
            self.attach_children(id, graph, label);
        }
    }

    fn attach_children(&mut self, id: NodeId, graph: &LandmarkGraph, from: Label) {
        if self.get(id).expanded {
            return;
        }
        let children: Vec<TreeNode> = graph
            .edges_from(from)
            .map(|(dst, edge)| {
                let point = graph
                    .point(dst)
                    .or_else(|| edge.points.last().copied())
                    .unwrap_or_default();
                TreeNode::child(id, from, dst, point)
            })
            .collect();

        let ids: Vec<NodeId> = children.into_iter().map(|child| self.add(child)).collect();
        let node = self.get_mut(id);
        node.children = ids;
        node.expanded = true;
    }

    /// Child with the highest UCB1 score; the first one wins ties.
    pub fn select_child(&self, id: NodeId, c: f64) -> Option<NodeId> {
        let node = self.get(id);
        let mut best: Option<(NodeId, f64)> = None;
        for &child in &node.children {
            let score = self.get(child).ucb1(node.visits, c);
            match best {
                Some((_, best_score)) if score <= best_score => {}
                _ => best = Some((child, score)),
            }
        }
        best.map(|(child, _)| child)
    }

    pub fn child_with_label(&self, id: NodeId, label: Label) -> Option<NodeId> {
        self.get(id)
            .children
            .iter()
            .copied()
            .find(|&child| self.get(child).label == Some(label))
    }
}
