use ndarray::Array2;

use crate::infra::{Bounds, Point, Polygon};

/// Row/column index of a grid cell.
pub type Cell = (usize, usize);

/// Regular cell grid laid over a polygonal arena.
///
/// The grid spans the arena's bounding box with `definition` columns of edge
/// length `granularity`; rows follow from the box height. A cell is navigable
/// when its centre lies inside the arena and outside every occlusion.
/// Immutable once built.
#[derive(Debug, Clone)]
pub struct ArenaGrid {
    arena: Polygon,
    occlusions: Vec<Polygon>,
    bounds: Bounds,
    granularity: f64,
    rows: usize,
    columns: usize,
    navigable_mask: Array2<f64>,
}

impl ArenaGrid {
    /// Builds the grid. Degenerate arenas produce an empty or all-zero mask
    /// rather than an error; belief normalisation reports them later.
    pub fn new(arena: Polygon, occlusions: Vec<Polygon>, definition: usize) -> Self {
        let bounds = arena.bounds();
        let granularity = if definition > 0 {
            bounds.width() / definition as f64
        } else {
            0.0
        };

        let (rows, columns) = if granularity.is_finite() && granularity > 0.0 {
            ((bounds.height() / granularity).floor() as usize, definition)
        } else {
            tracing::warn!(definition, width = bounds.width(), "Degenerate arena grid");
            (0, 0)
        };

        let mut grid = Self {
            arena,
            occlusions,
            bounds,
            granularity,
            rows,
            columns,
            navigable_mask: Array2::zeros((rows, columns)),
        };
        grid.navigable_mask = Array2::from_shape_fn((rows, columns), |(row, column)| {
            if grid.is_free(&grid.cell_center(row, column)) {
                1.0
            } else {
                0.0
            }
        });

        tracing::debug!(
            rows,
            columns,
            granularity,
            navigable = grid.navigable_count(),
            "Built arena grid"
        );
        grid
    }

    pub fn arena(&self) -> &Polygon {
        &self.arena
    }

    pub fn occlusions(&self) -> &[Polygon] {
        &self.occlusions
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn granularity(&self) -> f64 {
        self.granularity
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Column count, the `definition` the grid was built with.
    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.columns)
    }

    pub fn navigable_mask(&self) -> &Array2<f64> {
        &self.navigable_mask
    }

    pub fn navigable_count(&self) -> usize {
        self.navigable_mask.iter().filter(|&&v| v > 0.0).count()
    }

    pub fn is_navigable(&self, cell: Cell) -> bool {
        self.navigable_mask.get(cell).is_some_and(|&v| v > 0.0)
    }

    /// Inside the arena and outside every occlusion.
    pub fn is_free(&self, point: &Point) -> bool {
        self.arena.contains(point) && !self.occlusions.iter().any(|o| o.contains(point))
    }

    pub fn cell_center(&self, row: usize, column: usize) -> Point {
        Point::new(
            self.bounds.min_x + (column as f64 + 0.5) * self.granularity,
            self.bounds.min_y + (row as f64 + 0.5) * self.granularity,
        )
    }

    /// Cell containing `point`, clamped onto the grid. `None` for an empty grid.
    pub fn cell_of(&self, point: &Point) -> Option<Cell> {
        if self.rows == 0 || self.columns == 0 {
            return None;
        }
        let column = ((point.x - self.bounds.min_x) / self.granularity).floor();
        let row = ((point.y - self.bounds.min_y) / self.granularity).floor();
        Some((
            clamp_index(row, self.rows),
            clamp_index(column, self.columns),
        ))
    }

    /// 1.0 for every cell whose centre lies inside `polygon`.
    pub fn polygon_mask(&self, polygon: &Polygon) -> Array2<f64> {
        Array2::from_shape_fn(self.shape(), |(row, column)| {
            if polygon.contains(&self.cell_center(row, column)) {
                1.0
            } else {
                0.0
            }
        })
    }
}

fn clamp_index(value: f64, len: usize) -> usize {
    if value.is_nan() || value < 0.0 {
        0
    } else {
        (value as usize).min(len - 1)
    }
}
