use std::f64::consts::TAU;

/// A point in continuous arena coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Point `distance` units from `self` on the way to `target`.
    /// Returns `target` when the two points coincide.
    pub fn toward(&self, target: &Point, distance: f64) -> Point {
        let length = self.distance(target);
        if length <= f64::EPSILON {
            return *target;
        }
        let t = distance / length;
        Point::new(
            self.x + (target.x - self.x) * t,
            self.y + (target.y - self.y) * t,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl Bounds {
    pub fn new(min_x: f64, max_x: f64, min_y: f64, max_y: f64) -> Self {
        Self {
            min_x,
            max_x,
            min_y,
            max_y,
        }
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn contains(&self, point: &Point) -> bool {
        point.x >= self.min_x
            && point.x <= self.max_x
            && point.y >= self.min_y
            && point.y <= self.max_y
    }
}

/// Closed polygon given by its vertices in order. The closing edge is implicit.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Polygon {
    vertices: Vec<Point>,
}

impl Polygon {
    pub fn new(vertices: Vec<Point>) -> Self {
        Self { vertices }
    }

    /// Axis-aligned rectangle spanning the two corners.
    pub fn rectangle(min: Point, max: Point) -> Self {
        Self::new(vec![
            Point::new(min.x, min.y),
            Point::new(max.x, min.y),
            Point::new(max.x, max.y),
            Point::new(min.x, max.y),
        ])
    }

    /// Regular polygon inscribed in the circle of `radius` around `center`.
    pub fn regular(center: Point, radius: f64, sides: usize) -> Self {
        let sides = sides.max(3);
        let vertices = (0..sides)
            .map(|k| {
                let angle = TAU * k as f64 / sides as f64;
                Point::new(
                    center.x + radius * angle.cos(),
                    center.y + radius * angle.sin(),
                )
            })
            .collect();
        Self::new(vertices)
    }

    pub fn vertices(&self) -> &[Point] {
        &self.vertices
    }

    /// Bounding box of the vertices. An empty polygon yields an all-zero box.
    pub fn bounds(&self) -> Bounds {
        if self.vertices.is_empty() {
            return Bounds::new(0.0, 0.0, 0.0, 0.0);
        }
        self.vertices.iter().fold(
            Bounds::new(f64::INFINITY, f64::NEG_INFINITY, f64::INFINITY, f64::NEG_INFINITY),
            |b, p| Bounds::new(b.min_x.min(p.x), b.max_x.max(p.x), b.min_y.min(p.y), b.max_y.max(p.y)),
        )
    }

    /// Shoelace area, positive regardless of winding order.
    pub fn area(&self) -> f64 {
        let n = self.vertices.len();
        if n < 3 {
            return 0.0;
        }
        let mut twice_area = 0.0;
        for i in 0..n {
            let a = self.vertices[i];
            let b = self.vertices[(i + 1) % n];
            twice_area += a.x * b.y - b.x * a.y;
        }
        twice_area.abs() / 2.0
    }

    /// Ray-casting point-in-polygon test. Degenerate polygons contain nothing.
    pub fn contains(&self, point: &Point) -> bool {
        let n = self.vertices.len();
        if n < 3 {
            return false;
        }
        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let vi = self.vertices[i];
            let vj = self.vertices[j];
            if (vi.y > point.y) != (vj.y > point.y) {
                let crossing_x = (vj.x - vi.x) * (point.y - vi.y) / (vj.y - vi.y) + vi.x;
                if point.x < crossing_x {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }
}
