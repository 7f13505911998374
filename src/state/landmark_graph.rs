use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::infra::{AStar, Bounds, Point, PursuitError, Result};

/// Integer node label. Labels are unique within a graph.
pub type Label = usize;

/// Directed edge between two landmarks.
///
/// `path` lists every waypoint label from source to destination inclusive and
/// `points` holds the matching coordinates, so an edge stays walkable even in
/// a subgraph that dropped the intermediate waypoints.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub path: Vec<Label>,
    pub points: Vec<Point>,
    pub cost: f64,
}

impl Edge {
    fn new(path: Vec<Label>, points: Vec<Point>) -> Self {
        let cost = polyline_length(&points);
        Self { path, points, cost }
    }

    fn reversed(&self) -> Self {
        Self {
            path: self.path.iter().rev().copied().collect(),
            points: self.points.iter().rev().copied().collect(),
            cost: self.cost,
        }
    }
}

fn polyline_length(points: &[Point]) -> f64 {
    points.windows(2).map(|w| w[0].distance(&w[1])).sum()
}

/// Sparse waypoint graph with symmetric, precomputed edge paths.
#[derive(Debug, Clone, Default)]
pub struct LandmarkGraph {
    nodes: BTreeMap<Label, Point>,
    adjacency: BTreeMap<Label, Vec<Label>>,
    edges: HashMap<(Label, Label), Edge>,
    next_label: Label,
}

impl LandmarkGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// 4-connected lattice of waypoints over the free part of `bounds`.
    ///
    /// Waypoints sit at cell centres `spacing` apart. Two neighbours are
    /// joined when both ends and the midpoint are free.
    pub fn lattice<F>(bounds: Bounds, spacing: f64, is_free: F) -> Self
    where
        F: Fn(&Point) -> bool,
    {
        let mut graph = Self::new();
        if spacing.is_nan() || spacing <= 0.0 {
            return graph;
        }

        let columns = (bounds.width() / spacing).floor() as usize;
        let rows = (bounds.height() / spacing).floor() as usize;
        let mut labels: HashMap<(usize, usize), Label> = HashMap::new();

        for row in 0..rows {
            for column in 0..columns {
                let point = Point::new(
                    bounds.min_x + (column as f64 + 0.5) * spacing,
                    bounds.min_y + (row as f64 + 0.5) * spacing,
                );
                if is_free(&point) {
                    match graph.insert_node(point) {
                        Ok(label) => {
                            labels.insert((row, column), label);
                        }
                        Err(err) => {
                            tracing::warn!(%err, "Lattice truncated");
                            break;
                        }
                    }
                }
            }
        }

        for row in 0..rows {
            for column in 0..columns {
                let Some(&here) = labels.get(&(row, column)) else {
                    continue;
                };
                for neighbor in [(row, column + 1), (row + 1, column)] {
                    let Some(&there) = labels.get(&neighbor) else {
                        continue;
                    };
                    let a = graph.nodes[&here];
                    let b = graph.nodes[&there];
                    let mid = Point::new((a.x + b.x) / 2.0, (a.y + b.y) / 2.0);
                    if is_free(&mid) {
                        graph.insert_edge(here, there, Edge::new(vec![here, there], vec![a, b]));
                    }
                }
            }
        }

        tracing::debug!(
            nodes = graph.len(),
            edges = graph.edges.len() / 2,
            "Built lattice graph"
        );
        graph
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, label: Label) -> bool {
        self.nodes.contains_key(&label)
    }

    pub fn labels(&self) -> impl Iterator<Item = Label> + '_ {
        self.nodes.keys().copied()
    }

    pub fn point(&self, label: Label) -> Option<Point> {
        self.nodes.get(&label).copied()
    }

    pub fn edge(&self, src: Label, dst: Label) -> Option<&Edge> {
        self.edges.get(&(src, dst))
    }

    /// Outgoing edges of `label` in insertion order.
    pub fn edges_from(&self, label: Label) -> impl Iterator<Item = (Label, &Edge)> + '_ {
        self.adjacency
            .get(&label)
            .into_iter()
            .flatten()
            .filter_map(move |&dst| self.edges.get(&(label, dst)).map(|edge| (dst, edge)))
    }

    /// Neighbour labels of `label` with the cost of reaching them.
    pub fn neighbors(&self, label: Label) -> impl Iterator<Item = (Label, f64)> + '_ {
        self.edges_from(label).map(|(dst, edge)| (dst, edge.cost))
    }

    pub fn degree(&self, label: Label) -> usize {
        self.adjacency.get(&label).map_or(0, Vec::len)
    }

    /// Adds a node, assigning the next unused label unless one is supplied.
    pub fn add_node(&mut self, point: Point, label: Option<Label>) -> Result<Label> {
        match label {
            Some(label) if self.nodes.contains_key(&label) => {
                Err(PursuitError::DuplicateLabel(label))
            }
            Some(label) => {
                self.nodes.insert(label, point);
                self.next_label = self.next_label.max(label.saturating_add(1));
                Ok(label)
            }
            None => self.insert_node(point),
        }
    }

    fn insert_node(&mut self, point: Point) -> Result<Label> {
        let mut label = self.next_label;
        while self.nodes.contains_key(&label) {
            label = label.checked_add(1).ok_or(PursuitError::LabelsExhausted)?;
        }
        self.nodes.insert(label, point);
        self.next_label = label.saturating_add(1);
        Ok(label)
    }

    /// Connects `src` and `dst` in both directions.
    ///
    /// `path` defaults to the direct hop `[src, dst]`. An explicit path is a
    /// waypoint sequence that must start at `src` and end at `dst`; the
    /// waypoints in between need not be adjacent in the graph. The cost is
    /// the length of the polyline through the path's waypoints. An existing
    /// edge is kept as is.
    pub fn connect(&mut self, src: Label, dst: Label, path: Option<Vec<Label>>) -> Result<()> {
        self.require(src)?;
        self.require(dst)?;

        if src == dst || self.edges.contains_key(&(src, dst)) {
            return Ok(());
        }

        let path = path.unwrap_or_else(|| vec![src, dst]);
        if path.first() != Some(&src) || path.last() != Some(&dst) {
            return Err(PursuitError::InvalidPath { src, dst });
        }
        let points = path
            .iter()
            .map(|&label| self.point(label).ok_or(PursuitError::UnknownLabel(label)))
            .collect::<Result<Vec<_>>>()?;

        self.insert_edge(src, dst, Edge::new(path, points));
        Ok(())
    }

    fn insert_edge(&mut self, src: Label, dst: Label, edge: Edge) {
        if self.edges.contains_key(&(src, dst)) {
            return;
        }
        let reversed = edge.reversed();
        self.edges.insert((src, dst), edge);
        self.edges.insert((dst, src), reversed);
        self.adjacency.entry(src).or_default().push(dst);
        self.adjacency.entry(dst).or_default().push(src);
    }

    fn require(&self, label: Label) -> Result<Point> {
        self.point(label).ok_or(PursuitError::UnknownLabel(label))
    }

    /// Cheap eigenvector-style centrality.
    ///
    /// Every node starts at 1.0; each round a node's score becomes its own
    /// previous score plus its neighbours' previous scores. The result sums
    /// to 1. Rescaling between rounds keeps large depths finite without
    /// changing the normalised outcome.
    pub fn get_centrality(&self, depth: usize) -> Result<BTreeMap<Label, f64>> {
        if self.is_empty() {
            return Err(PursuitError::EmptyGraph);
        }

        let mut scores: BTreeMap<Label, f64> = self.labels().map(|label| (label, 1.0)).collect();
        for _ in 0..depth {
            let mut next: BTreeMap<Label, f64> = scores
                .iter()
                .map(|(&label, &score)| {
                    let spread: f64 = self
                        .adjacency
                        .get(&label)
                        .into_iter()
                        .flatten()
                        .map(|neighbor| scores.get(neighbor).copied().unwrap_or(0.0))
                        .sum();
                    (label, score + spread)
                })
                .collect();
            normalize_scores(&mut next);
            scores = next;
        }
        normalize_scores(&mut scores);
        Ok(scores)
    }

    /// Selects the `n` nodes sitting on the sharpest centrality boundaries.
    ///
    /// A node scores the largest absolute centrality gap to any neighbour,
    /// divided by its own centrality. Ties keep label order.
    pub fn get_lppo(&self, n: usize, depth: usize) -> Result<Vec<Label>> {
        let centrality = self.get_centrality(depth)?;

        let mut ranked: Vec<(Label, f64)> = centrality
            .iter()
            .map(|(&label, &own)| {
                let sharpest = self
                    .adjacency
                    .get(&label)
                    .into_iter()
                    .flatten()
                    .filter_map(|neighbor| centrality.get(neighbor))
                    .map(|other| (own - other).abs())
                    .fold(0.0, f64::max);
                let score = if own > 0.0 { sharpest / own } else { 0.0 };
                (label, score)
            })
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

        Ok(ranked.into_iter().take(n).map(|(label, _)| label).collect())
    }

    /// Shortest hop sequence `[src, .., dst]`; empty when unreachable.
    pub fn get_shortest_path(&self, src: Label, dst: Label) -> Result<Vec<Label>> {
        AStar::find_path(self, src, dst)
    }

    /// Sum of edge costs along consecutive hops.
    pub fn path_cost(&self, hops: &[Label]) -> Result<f64> {
        hops.windows(2)
            .map(|w| {
                self.edge(w[0], w[1])
                    .map(|edge| edge.cost)
                    .ok_or(PursuitError::InvalidPath { src: w[0], dst: w[1] })
            })
            .sum()
    }

    /// Concatenates the edge paths along `hops` into one waypoint polyline.
    pub fn expand_path(&self, hops: &[Label]) -> Result<(Vec<Label>, Vec<Point>)> {
        let Some(&first) = hops.first() else {
            return Ok((Vec::new(), Vec::new()));
        };
        let mut labels = vec![first];
        let mut points = vec![self.require(first)?];

        for w in hops.windows(2) {
            let edge = self
                .edge(w[0], w[1])
                .ok_or(PursuitError::InvalidPath { src: w[0], dst: w[1] })?;
            labels.extend(edge.path.iter().skip(1));
            points.extend(edge.points.iter().skip(1));
        }
        Ok((labels, points))
    }

    /// Reduced graph over `labels`.
    ///
    /// Two selected nodes are joined when the full-graph shortest path between
    /// them passes through no other selected node. The joining edge carries
    /// that shortest path's waypoints and cost.
    pub fn get_subgraph(&self, labels: &[Label]) -> Result<LandmarkGraph> {
        let mut selected: Vec<Label> = Vec::new();
        for &label in labels {
            self.require(label)?;
            if !selected.contains(&label) {
                selected.push(label);
            }
        }
        let selected_set: BTreeSet<Label> = selected.iter().copied().collect();

        let mut subgraph = LandmarkGraph::new();
        for &label in &selected {
            subgraph.add_node(self.require(label)?, Some(label))?;
        }

        for (i, &a) in selected.iter().enumerate() {
            for &b in &selected[i + 1..] {
                let hops = self.get_shortest_path(a, b)?;
                if hops.is_empty() {
                    continue;
                }
                let (path, points) = self.expand_path(&hops)?;
                let passes_other = path[1..path.len() - 1]
                    .iter()
                    .any(|label| selected_set.contains(label));
                if !passes_other {
                    subgraph.insert_edge(a, b, Edge::new(path, points));
                }
            }
        }

        tracing::debug!(
            nodes = subgraph.len(),
            edges = subgraph.edges.len() / 2,
            "Extracted subgraph"
        );
        Ok(subgraph)
    }

    /// Node whose point is closest to `point`.
    pub fn get_nearest(&self, point: &Point) -> Result<Label> {
        self.nodes
            .iter()
            .min_by(|a, b| a.1.distance(point).total_cmp(&b.1.distance(point)))
            .map(|(&label, _)| label)
            .ok_or(PursuitError::EmptyGraph)
    }
}

fn normalize_scores(scores: &mut BTreeMap<Label, f64>) {
    let total: f64 = scores.values().sum();
    if total > 0.0 {
        scores.values_mut().for_each(|score| *score /= total);
    }
}
