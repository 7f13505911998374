//! End-to-end scenarios across the belief state, landmark graph and planner.

use pursuit::planners::mcts::{BeliefRewardConfig, StepReward};
use pursuit::state::TickUpdate;
use pursuit::{
    ArenaGrid, BeliefReward, BeliefState, DiffusionComponent, LandmarkGraph, MctsPlanner,
    PlannerConfig, Point, Polygon, PursuitError,
};

fn open_grid(size: f64, definition: usize) -> ArenaGrid {
    ArenaGrid::new(
        Polygon::rectangle(Point::new(0.0, 0.0), Point::new(size, size)),
        Vec::new(),
        definition,
    )
}

fn assert_normalised(belief: &BeliefState) {
    let dist = belief.probability_distribution();
    assert!((dist.sum() - 1.0).abs() < 1e-9, "mass {}", dist.sum());
    for (cell, &mass) in dist.indexed_iter() {
        if !belief.grid().is_navigable(cell) {
            assert_eq!(mass, 0.0, "mass on blocked cell {cell:?}");
        }
    }
}

#[test]
fn test_repeated_center_sighting_keeps_peak() {
    let mut belief = BeliefState::new(open_grid(5.0, 5), Default::default(), Vec::new()).unwrap();

    for _ in 0..5 {
        belief.update_other_location(Point::new(2.5, 2.5));
        let update = belief.tick().unwrap();
        assert_eq!(update, TickUpdate::Observed((2, 2)));
        assert_eq!(belief.peak_cell(), Some((2, 2)));
        assert_normalised(&belief);
    }
    assert_eq!(belief.time_step(), 5);
}

#[test]
fn test_visibility_clears_cells_in_view() {
    let grid = ArenaGrid::new(
        Polygon::rectangle(Point::new(0.0, 0.0), Point::new(10.0, 10.0)),
        vec![Polygon::rectangle(Point::new(7.0, 7.0), Point::new(9.0, 9.0))],
        10,
    );
    let view = Polygon::rectangle(Point::new(2.0, 2.0), Point::new(6.0, 6.0));
    let in_view = grid.polygon_mask(&view);
    let mut belief = BeliefState::new(grid, Default::default(), Vec::new()).unwrap();

    belief.update_visibility(view);
    assert_eq!(belief.tick().unwrap(), TickUpdate::ClearedView);

    for (cell, &seen) in in_view.indexed_iter() {
        if seen > 0.0 {
            assert_eq!(belief.probability_distribution()[cell], 0.0);
        }
    }
    assert_normalised(&belief);
}

#[test]
fn test_sighting_next_to_occlusion_stays_off_walls() {
    let grid = ArenaGrid::new(
        Polygon::rectangle(Point::new(0.0, 0.0), Point::new(10.0, 10.0)),
        vec![Polygon::rectangle(Point::new(4.0, 0.0), Point::new(6.0, 6.0))],
        10,
    );
    let components: Vec<Box<dyn pursuit::state::PredictionComponent>> =
        vec![Box::new(DiffusionComponent::new(Default::default()))];
    let mut belief = BeliefState::new(grid, Default::default(), components).unwrap();

    belief.update_self_location(Point::new(9.5, 9.5));
    belief.update_other_location(Point::new(3.5, 3.5));
    belief.tick().unwrap();
    assert_eq!(belief.peak_cell(), Some((3, 3)));
    assert_normalised(&belief);

    for frame in belief.lookahead(4).unwrap() {
        assert!((frame.sum() - 1.0).abs() < 1e-9);
        assert_eq!(frame[(2, 4)], 0.0);
    }
}

#[test]
fn test_whole_arena_in_view_is_degenerate() {
    let mut belief = BeliefState::new(open_grid(5.0, 5), Default::default(), Vec::new()).unwrap();
    let before = belief.probability_distribution().clone();

    belief.update_visibility(Polygon::rectangle(
        Point::new(-1.0, -1.0),
        Point::new(6.0, 6.0),
    ));
    let err = belief.tick().unwrap_err();
    assert!(matches!(err, PursuitError::DegenerateDistribution { .. }));
    assert_eq!(belief.probability_distribution(), &before);
    assert_eq!(belief.time_step(), 0);

    // Inputs were consumed, so the next tick carries over cleanly
    assert_eq!(belief.tick().unwrap(), TickUpdate::Unchanged);
}

#[test]
fn test_square_shortest_path_goes_around() {
    let mut graph = LandmarkGraph::new();
    let a = graph.add_node(Point::new(0.0, 0.0), None).unwrap();
    let b = graph.add_node(Point::new(1.0, 0.0), None).unwrap();
    let c = graph.add_node(Point::new(1.0, 1.0), None).unwrap();
    let d = graph.add_node(Point::new(0.0, 1.0), None).unwrap();
    for (src, dst) in [(a, b), (b, c), (c, d), (d, a)] {
        graph.connect(src, dst, None).unwrap();
    }

    let path = graph.get_shortest_path(a, c).unwrap();
    assert_eq!(path.len(), 3);
    assert!(path[1] == b || path[1] == d);
    assert!((graph.path_cost(&path).unwrap() - 2.0).abs() < 1e-12);
}

#[test]
fn test_trivial_and_disconnected_paths() {
    let mut graph = LandmarkGraph::new();
    let a = graph.add_node(Point::new(0.0, 0.0), None).unwrap();
    let b = graph.add_node(Point::new(1.0, 0.0), None).unwrap();
    let c = graph.add_node(Point::new(5.0, 0.0), None).unwrap();
    graph.connect(a, b, None).unwrap();

    assert_eq!(graph.get_shortest_path(a, a).unwrap(), vec![a]);
    assert!(graph.get_shortest_path(a, c).unwrap().is_empty());
    assert!(matches!(
        graph.get_shortest_path(a, 42),
        Err(PursuitError::UnknownLabel(42))
    ));
}

#[test]
fn test_path_centre_is_most_central() {
    let mut graph = LandmarkGraph::new();
    let a = graph.add_node(Point::new(0.0, 0.0), None).unwrap();
    let b = graph.add_node(Point::new(1.0, 0.0), None).unwrap();
    let c = graph.add_node(Point::new(2.0, 0.0), None).unwrap();
    graph.connect(a, b, None).unwrap();
    graph.connect(b, c, None).unwrap();

    let centrality = graph.get_centrality(3).unwrap();
    assert!(centrality[&b] > centrality[&a]);
    assert!(centrality[&b] > centrality[&c]);
    assert!((centrality.values().sum::<f64>() - 1.0).abs() < 1e-12);
}

#[test]
fn test_planner_heads_for_target() {
    // Decoy branch 0 -> 4 -> 5 on the left, target 3 three hops right
    let mut graph = LandmarkGraph::new();
    for x in [0.0, 1.0, 2.0, 3.0, -1.0, -2.0] {
        graph.add_node(Point::new(x, 0.0), None).unwrap();
    }
    for (src, dst) in [(0, 1), (1, 2), (2, 3), (0, 4), (4, 5)] {
        graph.connect(src, dst, None).unwrap();
    }

    let target = Point::new(3.0, 0.0);
    let reward = move |p: Point, _step: usize| {
        if p.distance(&target) < 1e-6 {
            StepReward::terminal(1.0)
        } else {
            StepReward::new(0.0)
        }
    };

    let mut planner = MctsPlanner::new(PlannerConfig {
        budget: 200,
        depth: 3,
        ..Default::default()
    })
    .unwrap();
    let action = planner.get_action(&graph, Point::new(0.0, 0.0), &reward).unwrap();
    assert_eq!(action, Some(1));
}

#[test]
fn test_planner_chases_belief_mass() {
    let grid = open_grid(10.0, 10);
    let mut belief = BeliefState::new(grid, Default::default(), Vec::new()).unwrap();
    belief.update_other_location(Point::new(8.5, 1.5));
    belief.tick().unwrap();

    let mut graph = LandmarkGraph::new();
    let centre = graph.add_node(Point::new(5.0, 5.0), None).unwrap();
    let toward = graph.add_node(Point::new(8.0, 2.0), None).unwrap();
    let away = graph.add_node(Point::new(2.0, 8.0), None).unwrap();
    graph.connect(centre, away, None).unwrap();
    graph.connect(centre, toward, None).unwrap();

    let frames = belief.lookahead(2).unwrap();
    let reward = BeliefReward::new(belief.grid(), &frames, &BeliefRewardConfig::default());
    let mut planner = MctsPlanner::new(PlannerConfig {
        budget: 50,
        depth: 6,
        ..Default::default()
    })
    .unwrap();

    let action = planner.get_action(&graph, Point::new(5.0, 5.0), &reward).unwrap();
    assert_eq!(action, Some(toward));
}
