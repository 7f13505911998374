use crate::infra::Point;

/// Walks a polyline in fixed-length steps.
///
/// Starting at `start`, yields points spaced exactly `step_length` apart along
/// the polyline through `stops`. Distance left over at the end of one segment
/// carries into the next so spacing stays exact across corners. The final
/// point lands on the last stop and may be closer than `step_length` to its
/// predecessor.
///
/// The iterator is single-pass; build a new one to walk again. A
/// non-positive `step_length` degrades to yielding each distinct stop.
#[derive(Debug, Clone)]
pub struct Steps {
    current: Point,
    stops: Vec<Point>,
    next_stop: usize,
    step_length: f64,
    pending: f64,
}

impl Steps {
    pub fn new(start: Point, stops: Vec<Point>, step_length: f64) -> Self {
        Self {
            current: start,
            stops,
            next_stop: 0,
            step_length,
            pending: 0.0,
        }
    }
}

/// Fraction of `step_length` below which a leftover distance counts as zero.
const RESIDUE: f64 = 1e-9;

impl Iterator for Steps {
    type Item = Point;

    fn next(&mut self) -> Option<Point> {
        loop {
            let target = *self.stops.get(self.next_stop)?;
            let mut segment = self.current.distance(&target);

            if self.step_length > 0.0 {
                // Rounding residue after landing on a stop must not become a step
                let tolerance = RESIDUE * self.step_length;
                if segment <= tolerance {
                    segment = 0.0;
                }
                let needed = self.step_length - self.pending;
                if segment > 0.0 && segment + tolerance >= needed {
                    self.current = self.current.toward(&target, needed.min(segment));
                    self.pending = 0.0;
                    return Some(self.current);
                }
                self.pending += segment;
            } else if segment > 0.0 {
                self.pending += segment;
            }

            self.current = target;
            self.next_stop += 1;

            let is_last = self.next_stop == self.stops.len();
            if (is_last || self.step_length <= 0.0) && self.pending > 0.0 {
                self.pending = 0.0;
                return Some(self.current);
            }
        }
    }
}
