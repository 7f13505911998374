//! Reward sampling along rollout paths.

use ndarray::Array2;

use crate::infra::Point;
use crate::state::{ArenaGrid, Cell};

/// Reward for one sampled step point.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StepReward {
    pub value: f64,
    /// Ends the rollout after this step.
    pub terminal: bool,
}

impl StepReward {
    pub fn new(value: f64) -> Self {
        Self {
            value,
            terminal: false,
        }
    }

    pub fn terminal(value: f64) -> Self {
        Self {
            value,
            terminal: true,
        }
    }
}

/// Scores a point reached `step` steps into a rollout.
pub trait RewardFunction {
    fn sample(&self, point: Point, step: usize) -> StepReward;
}

impl<F> RewardFunction for F
where
    F: Fn(Point, usize) -> StepReward,
{
    fn sample(&self, point: Point, step: usize) -> StepReward {
        self(point, step)
    }
}

/// Circular weighting mask over neighbouring cells.
#[derive(Debug, Clone)]
pub struct StencilKernel {
    offsets: Vec<(isize, isize)>,
}

impl StencilKernel {
    /// All cells within `radius` cells (Euclidean) of the centre, weight 1.
    pub fn circular(radius: usize) -> Self {
        let r = radius as isize;
        let offsets = (-r..=r)
            .flat_map(|dr| (-r..=r).map(move |dc| (dr, dc)))
            .filter(|&(dr, dc)| dr * dr + dc * dc <= r * r)
            .collect();
        Self { offsets }
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Mass captured by the kernel centred on `cell`.
    pub fn sample(&self, distribution: &Array2<f64>, (row, column): Cell) -> f64 {
        self.offsets
            .iter()
            .filter_map(|&(dr, dc)| {
                let r = row.checked_add_signed(dr)?;
                let c = column.checked_add_signed(dc)?;
                distribution.get((r, c)).copied()
            })
            .sum()
    }
}

#[derive(Debug, Clone)]
pub struct BeliefRewardConfig {
    /// Kernel radius in cells.
    pub stencil_radius: usize,
    /// Captured mass at or above which a rollout ends.
    pub capture_threshold: Option<f64>,
}

impl Default for BeliefRewardConfig {
    fn default() -> Self {
        Self {
            stencil_radius: 1,
            capture_threshold: None,
        }
    }
}

/// Rewards a step by the belief mass near it.
///
/// Step `k` reads frame `min(k, len - 1)`: frame 0 is the current belief,
/// later frames come from lookahead prediction.
#[derive(Debug, Clone)]
pub struct BeliefReward<'a> {
    grid: &'a ArenaGrid,
    frames: &'a [Array2<f64>],
    kernel: StencilKernel,
    capture_threshold: Option<f64>,
}

impl<'a> BeliefReward<'a> {
    pub fn new(grid: &'a ArenaGrid, frames: &'a [Array2<f64>], config: &BeliefRewardConfig) -> Self {
        Self {
            grid,
            frames,
            kernel: StencilKernel::circular(config.stencil_radius),
            capture_threshold: config.capture_threshold,
        }
    }
}

impl RewardFunction for BeliefReward<'_> {
    fn sample(&self, point: Point, step: usize) -> StepReward {
        let Some(last) = self.frames.len().checked_sub(1) else {
            return StepReward::default();
        };
        let Some(cell) = self.grid.cell_of(&point) else {
            return StepReward::default();
        };

        let mass = self.kernel.sample(&self.frames[step.min(last)], cell);
        match self.capture_threshold {
            Some(threshold) if mass >= threshold => StepReward::terminal(mass),
            _ => StepReward::new(mass),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::Polygon;

    fn grid() -> ArenaGrid {
        ArenaGrid::new(
            Polygon::rectangle(Point::new(0.0, 0.0), Point::new(5.0, 5.0)),
            Vec::new(),
            5,
        )
    }

    #[test]
    fn test_circular_kernel_sizes() {
        assert_eq!(StencilKernel::circular(0).len(), 1);
        assert_eq!(StencilKernel::circular(1).len(), 5);
        assert_eq!(StencilKernel::circular(2).len(), 13);
    }

    #[test]
    fn test_kernel_clips_at_grid_edge() {
        let distribution = Array2::from_elem((5, 5), 1.0);
        let kernel = StencilKernel::circular(1);
        assert_eq!(kernel.sample(&distribution, (2, 2)), 5.0);
        assert_eq!(kernel.sample(&distribution, (0, 0)), 3.0);
    }

    #[test]
    fn test_belief_reward_reads_frame_by_step() {
        let grid = grid();
        let mut near = Array2::zeros((5, 5));
        near[(0, 0)] = 1.0;
        let mut far = Array2::zeros((5, 5));
        far[(4, 4)] = 1.0;
        let frames = vec![near, far];

        let reward = BeliefReward::new(&grid, &frames, &BeliefRewardConfig::default());
        let corner = Point::new(0.5, 0.5);
        assert_eq!(reward.sample(corner, 0).value, 1.0);
        assert_eq!(reward.sample(corner, 1).value, 0.0);
        // Past the last frame the final one is reused
        assert_eq!(reward.sample(Point::new(4.5, 4.5), 9).value, 1.0);
    }

    #[test]
    fn test_capture_threshold_terminates() {
        let grid = grid();
        let mut distribution = Array2::zeros((5, 5));
        distribution[(2, 2)] = 0.6;
        distribution[(2, 3)] = 0.4;
        let frames = vec![distribution];
        let config = BeliefRewardConfig {
            stencil_radius: 1,
            capture_threshold: Some(0.9),
        };
        let reward = BeliefReward::new(&grid, &frames, &config);

        let hit = reward.sample(Point::new(2.5, 2.5), 0);
        assert!(hit.terminal);
        assert!((hit.value - 1.0).abs() < 1e-12);

        let miss = reward.sample(Point::new(0.5, 0.5), 0);
        assert!(!miss.terminal);
    }

    #[test]
    fn test_no_frames_gives_zero() {
        let grid = grid();
        let reward = BeliefReward::new(&grid, &[], &BeliefRewardConfig::default());
        assert_eq!(reward.sample(Point::new(1.0, 1.0), 0), StepReward::default());
    }

    #[test]
    fn test_closures_are_reward_functions() {
        let goal = Point::new(1.0, 0.0);
        let reward = |p: Point, _step: usize| {
            if p.distance(&goal) < 1e-9 {
                StepReward::terminal(1.0)
            } else {
                StepReward::new(0.0)
            }
        };
        assert!(reward.sample(goal, 0).terminal);
        assert!(!reward.sample(Point::new(0.0, 0.0), 0).terminal);
    }
}
