use std::fmt;

use ndarray::Array2;

use crate::infra::{Point, Polygon};
use crate::state::ArenaGrid;

/// Inputs a component sees during an authoritative belief tick.
#[derive(Debug, Clone, Copy)]
pub struct TickContext<'a> {
    pub grid: &'a ArenaGrid,
    /// Tick being processed, before the counter advances.
    pub time_step: u64,
    pub self_location: Option<Point>,
    pub other_location: Option<Point>,
    pub visibility: Option<&'a Polygon>,
}

/// Plug-in hooks run by [`BeliefState`](crate::state::BeliefState).
///
/// `on_tick` runs after the observation update of every tick and may adjust
/// the authoritative distribution. `predict` runs once per lookahead step on
/// a working copy only. The belief state masks and renormalises after every
/// hook.
pub trait PredictionComponent: fmt::Debug {
    fn name(&self) -> &'static str;

    fn on_tick(&mut self, context: &TickContext<'_>, distribution: &mut Array2<f64>);

    fn predict(&self, distribution: &mut Array2<f64>, time_step: u64);
}
