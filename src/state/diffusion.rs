use ndarray::Array2;

use crate::state::{PredictionComponent, TickContext};

#[derive(Debug, Clone)]
pub struct DiffusionConfig {
    /// Adversary speed in arena units per tick.
    pub speed: f64,
    /// Longest window, in ticks, a single sighting keeps the drift active.
    pub max_ticks: u64,
}

impl Default for DiffusionConfig {
    fn default() -> Self {
        Self {
            speed: 1.0,
            max_ticks: 20,
        }
    }
}

/// Lookahead drift toward the agent.
///
/// When the adversary is seen, records a per-tick shift (in cells) pointing
/// from its cell to the agent's cell, sized to `speed`, plus the window of
/// ticks it takes to close that gap. `predict` moves the predicted mass by
/// that shift while inside the window and does nothing outside it. The
/// authoritative belief is never touched.
#[derive(Debug, Clone)]
pub struct DiffusionComponent {
    config: DiffusionConfig,
    shift: (f64, f64),
    window: Option<(u64, u64)>,
}

impl DiffusionComponent {
    pub fn new(config: DiffusionConfig) -> Self {
        Self {
            config,
            shift: (0.0, 0.0),
            window: None,
        }
    }

    /// Per-tick (row, column) shift in cells.
    pub fn shift(&self) -> (f64, f64) {
        self.shift
    }

    /// Inclusive `[start_tick, end_tick]` during which `predict` is active.
    pub fn window(&self) -> Option<(u64, u64)> {
        self.window
    }

    fn is_active(&self, time_step: u64) -> bool {
        self.window
            .is_some_and(|(start, end)| (start..=end).contains(&time_step))
    }
}

impl PredictionComponent for DiffusionComponent {
    fn name(&self) -> &'static str {
        "diffusion"
    }

    fn on_tick(&mut self, context: &TickContext<'_>, _distribution: &mut Array2<f64>) {
        let (Some(other), Some(me)) = (context.other_location, context.self_location) else {
            return;
        };
        let (Some(other_cell), Some(self_cell)) =
            (context.grid.cell_of(&other), context.grid.cell_of(&me))
        else {
            return;
        };

        let d_row = self_cell.0 as f64 - other_cell.0 as f64;
        let d_column = self_cell.1 as f64 - other_cell.1 as f64;
        let gap = d_row.hypot(d_column);
        let cells_per_tick = self.config.speed / context.grid.granularity();

        if gap == 0.0 || !(cells_per_tick.is_finite() && cells_per_tick > 0.0) {
            self.window = None;
            self.shift = (0.0, 0.0);
            return;
        }

        self.shift = (
            d_row / gap * cells_per_tick,
            d_column / gap * cells_per_tick,
        );
        let ticks = ((gap / cells_per_tick).ceil() as u64).min(self.config.max_ticks);
        self.window = Some((context.time_step, context.time_step + ticks));

        tracing::debug!(
            shift_row = self.shift.0,
            shift_column = self.shift.1,
            start = context.time_step,
            end = context.time_step + ticks,
            "Diffusion window recorded"
        );
    }

    fn predict(&self, distribution: &mut Array2<f64>, time_step: u64) {
        if self.is_active(time_step) {
            *distribution = shift_mass(distribution, self.shift);
        }
    }
}

/// Moves every cell's mass by a fractional (row, column) offset, splitting it
/// bilinearly over the four cells around the target. Mass leaving the grid is
/// dropped.
fn shift_mass(distribution: &Array2<f64>, (d_row, d_column): (f64, f64)) -> Array2<f64> {
    let (rows, columns) = distribution.dim();
    let mut shifted = Array2::zeros((rows, columns));

    for ((row, column), &mass) in distribution.indexed_iter() {
        if mass == 0.0 {
            continue;
        }
        let target_row = row as f64 + d_row;
        let target_column = column as f64 + d_column;
        let base_row = target_row.floor();
        let base_column = target_column.floor();
        let frac_row = target_row - base_row;
        let frac_column = target_column - base_column;

        for (r, w_row) in [(base_row, 1.0 - frac_row), (base_row + 1.0, frac_row)] {
            for (c, w_column) in [(base_column, 1.0 - frac_column), (base_column + 1.0, frac_column)] {
                let weight = w_row * w_column;
                if weight <= 0.0 || r < 0.0 || c < 0.0 {
                    continue;
                }
                let (r, c) = (r as usize, c as usize);
                if r < rows && c < columns {
                    shifted[(r, c)] += mass * weight;
                }
            }
        }
    }
    shifted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::{Point, Polygon};
    use crate::state::ArenaGrid;

    fn grid() -> ArenaGrid {
        ArenaGrid::new(
            Polygon::rectangle(Point::new(0.0, 0.0), Point::new(20.0, 20.0)),
            Vec::new(),
            20,
        )
    }

    fn context<'a>(grid: &'a ArenaGrid, other: Point, me: Point) -> TickContext<'a> {
        TickContext {
            grid,
            time_step: 3,
            self_location: Some(me),
            other_location: Some(other),
            visibility: None,
        }
    }

    #[test]
    fn test_sighting_records_step_and_window() {
        let grid = grid();
        let mut component = DiffusionComponent::new(DiffusionConfig {
            speed: 2.0,
            max_ticks: 20,
        });
        let mut scratch = Array2::zeros(grid.shape());
        component.on_tick(
            &context(&grid, Point::new(2.5, 10.5), Point::new(17.5, 10.5)),
            &mut scratch,
        );

        let (d_row, d_column) = component.shift();
        assert!(d_row.abs() < 1e-12);
        assert!((d_column - 2.0).abs() < 1e-12);
        assert_eq!(component.window(), Some((3, 11)));
    }

    #[test]
    fn test_window_is_capped() {
        let grid = grid();
        let mut component = DiffusionComponent::new(DiffusionConfig {
            speed: 1.0,
            max_ticks: 4,
        });
        let mut scratch = Array2::zeros(grid.shape());
        component.on_tick(
            &context(&grid, Point::new(0.5, 0.5), Point::new(19.5, 0.5)),
            &mut scratch,
        );
        assert_eq!(component.window(), Some((3, 7)));
    }

    #[test]
    fn test_no_sighting_keeps_previous_window() {
        let grid = grid();
        let mut component = DiffusionComponent::new(DiffusionConfig::default());
        let mut scratch = Array2::zeros(grid.shape());
        let quiet = TickContext {
            grid: &grid,
            time_step: 0,
            self_location: Some(Point::new(1.0, 1.0)),
            other_location: None,
            visibility: None,
        };
        component.on_tick(&quiet, &mut scratch);
        assert_eq!(component.window(), None);
    }

    #[test]
    fn test_predict_is_noop_outside_window() {
        let component = DiffusionComponent::new(DiffusionConfig::default());
        let mut distribution = Array2::zeros((3, 3));
        distribution[(1, 1)] = 1.0;
        let before = distribution.clone();
        component.predict(&mut distribution, 5);
        assert_eq!(distribution, before);
    }

    #[test]
    fn test_shift_mass_splits_fractional_offsets() {
        let mut distribution = Array2::zeros((3, 3));
        distribution[(1, 0)] = 1.0;
        let shifted = shift_mass(&distribution, (0.0, 0.25));
        assert!((shifted[(1, 0)] - 0.75).abs() < 1e-12);
        assert!((shifted[(1, 1)] - 0.25).abs() < 1e-12);

        let off_grid = shift_mass(&distribution, (0.0, -1.0));
        assert_eq!(off_grid.sum(), 0.0);
    }
}
