use ndarray::{Array2, Zip};

use crate::infra::{Point, Polygon, PursuitError, Result};
use crate::state::{ArenaGrid, Cell, PredictionComponent, TickContext};

#[derive(Debug, Clone, Default)]
pub struct BeliefConfig {
    /// Standard deviation, in cells, of the bump placed on a direct sighting.
    /// `None` picks `max(definition / 40, 2)`.
    pub other_size: Option<f64>,
}

/// Which observation branch a tick applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickUpdate {
    /// Direct sighting: distribution collapsed onto the observed cell.
    Observed(Cell),
    /// No sighting: mass inside the field of view was cleared.
    ClearedView,
    /// No input: distribution carried over.
    Unchanged,
}

/// Probability mass over where the unseen adversary may be.
///
/// Mass is zero on non-navigable cells and sums to 1 after every tick and
/// every lookahead step.
#[derive(Debug)]
pub struct BeliefState {
    grid: ArenaGrid,
    other_size: f64,
    probability_distribution: Array2<f64>,
    time_step: u64,
    self_location: Option<Point>,
    other_location: Option<Point>,
    visibility_polygon: Option<Polygon>,
    components: Vec<Box<dyn PredictionComponent>>,
}

impl BeliefState {
    /// Starts from a uniform belief over the navigable cells.
    pub fn new(
        grid: ArenaGrid,
        config: BeliefConfig,
        components: Vec<Box<dyn PredictionComponent>>,
    ) -> Result<Self> {
        let other_size = match config.other_size {
            Some(size) if size > 0.0 && size.is_finite() => size,
            Some(size) => {
                return Err(PursuitError::InvalidConfig(format!(
                    "other_size must be positive, got {size}"
                )));
            }
            None => (grid.columns() as f64 / 40.0).max(2.0),
        };

        let mut probability_distribution = grid.navigable_mask().clone();
        normalize(&mut probability_distribution, grid.navigable_mask(), "initial belief")?;

        tracing::debug!(
            rows = grid.rows(),
            columns = grid.columns(),
            other_size,
            components = components.len(),
            "Belief state created"
        );

        Ok(Self {
            grid,
            other_size,
            probability_distribution,
            time_step: 0,
            self_location: None,
            other_location: None,
            visibility_polygon: None,
            components,
        })
    }

    pub fn grid(&self) -> &ArenaGrid {
        &self.grid
    }

    pub fn probability_distribution(&self) -> &Array2<f64> {
        &self.probability_distribution
    }

    pub fn time_step(&self) -> u64 {
        self.time_step
    }

    pub fn other_size(&self) -> f64 {
        self.other_size
    }

    pub fn components(&self) -> impl Iterator<Item = &dyn PredictionComponent> {
        self.components.iter().map(|c| c.as_ref())
    }

    /// Mass in the cell containing `point`.
    pub fn probability_at(&self, point: &Point) -> f64 {
        self.grid
            .cell_of(point)
            .and_then(|cell| self.probability_distribution.get(cell).copied())
            .unwrap_or(0.0)
    }

    /// Cell holding the most mass.
    pub fn peak_cell(&self) -> Option<Cell> {
        peak_cell(&self.probability_distribution)
    }

    /// Forgets everything: uniform mass over navigable cells again. The
    /// clock keeps running.
    pub fn reset_uniform(&mut self) -> Result<()> {
        let mut uniform = self.grid.navigable_mask().clone();
        normalize(&mut uniform, self.grid.navigable_mask(), "belief reset")?;
        self.probability_distribution = uniform;
        Ok(())
    }

    pub fn update_self_location(&mut self, location: Point) {
        self.self_location = Some(location);
    }

    pub fn update_other_location(&mut self, location: Point) {
        self.other_location = Some(location);
    }

    pub fn update_visibility(&mut self, polygon: Polygon) {
        self.visibility_polygon = Some(polygon);
    }

    /// Applies this tick's inputs and advances the clock.
    ///
    /// A direct sighting wins over a visibility polygon; with neither the
    /// distribution carries over. Component hooks run afterwards, each
    /// followed by mask and renormalise. Pending inputs are consumed either
    /// way; on error the distribution and clock are left as they were.
    #[tracing::instrument(level = "trace", skip(self), fields(time_step = self.time_step))]
    pub fn tick(&mut self) -> Result<TickUpdate> {
        let self_location = self.self_location.take();
        let other_location = self.other_location.take();
        let visibility = self.visibility_polygon.take();

        let mut working = self.probability_distribution.clone();
        let mask = self.grid.navigable_mask();

        let update = match (other_location, &visibility) {
            (Some(location), _) => {
                let cell = self
                    .grid
                    .cell_of(&location)
                    .ok_or(PursuitError::DegenerateDistribution { context: "empty grid" })?;
                working = gaussian_bump(self.grid.shape(), cell, self.other_size);
                normalize(&mut working, mask, "direct observation")?;
                TickUpdate::Observed(cell)
            }
            (None, Some(polygon)) => {
                let in_view = self.grid.polygon_mask(polygon);
                Zip::from(&mut working)
                    .and(&in_view)
                    .for_each(|p, &seen| {
                        if seen > 0.0 {
                            *p = 0.0;
                        }
                    });
                normalize(&mut working, mask, "visibility update")?;
                TickUpdate::ClearedView
            }
            (None, None) => TickUpdate::Unchanged,
        };

        let context = TickContext {
            grid: &self.grid,
            time_step: self.time_step,
            self_location,
            other_location,
            visibility: visibility.as_ref(),
        };
        for component in self.components.iter_mut() {
            component.on_tick(&context, &mut working);
            normalize(&mut working, mask, component.name())?;
        }

        self.probability_distribution = working;
        self.time_step += 1;

        tracing::debug!(time_step = self.time_step, update = ?update, "Belief tick");
        Ok(update)
    }

    /// Lookahead of `n` successive distributions with no new observations.
    ///
    /// Each step runs every component's `predict` hook on a working copy,
    /// then masks and renormalises. The authoritative distribution is not
    /// touched. The sequence stops after the first error.
    pub fn predict(&self, n: usize) -> Prediction<'_> {
        Prediction {
            belief: self,
            working: self.probability_distribution.clone(),
            time_step: self.time_step,
            remaining: n,
        }
    }

    /// Current distribution followed by `n` predicted ones.
    pub fn lookahead(&self, n: usize) -> Result<Vec<Array2<f64>>> {
        std::iter::once(Ok(self.probability_distribution.clone()))
            .chain(self.predict(n))
            .collect()
    }
}

/// Iterator returned by [`BeliefState::predict`].
pub struct Prediction<'a> {
    belief: &'a BeliefState,
    working: Array2<f64>,
    time_step: u64,
    remaining: usize,
}

impl Iterator for Prediction<'_> {
    type Item = Result<Array2<f64>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let mask = self.belief.grid.navigable_mask();
        for component in &self.belief.components {
            component.predict(&mut self.working, self.time_step);
            if let Err(err) = normalize(&mut self.working, mask, component.name()) {
                self.remaining = 0;
                return Some(Err(err));
            }
        }
        self.time_step += 1;
        Some(Ok(self.working.clone()))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining))
    }
}

/// Zeroes non-navigable cells and scales the rest to sum 1.
fn normalize(
    distribution: &mut Array2<f64>,
    mask: &Array2<f64>,
    context: &'static str,
) -> Result<()> {
    *distribution *= mask;
    let total = distribution.sum();
    if !(total.is_finite() && total > 0.0) {
        tracing::warn!(context, total, "Renormalisation found no mass");
        return Err(PursuitError::DegenerateDistribution { context });
    }
    *distribution /= total;
    Ok(())
}

fn gaussian_bump(shape: (usize, usize), (center_row, center_column): Cell, sigma: f64) -> Array2<f64> {
    let denominator = 2.0 * sigma * sigma;
    Array2::from_shape_fn(shape, |(row, column)| {
        let dr = row as f64 - center_row as f64;
        let dc = column as f64 - center_column as f64;
        (-(dr * dr + dc * dc) / denominator).exp()
    })
}

pub(crate) fn peak_cell(distribution: &Array2<f64>) -> Option<Cell> {
    distribution
        .indexed_iter()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(cell, _)| cell)
}
