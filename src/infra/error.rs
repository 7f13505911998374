use thiserror::Error;

use crate::state::Label;

/// Errors surfaced by the belief, graph and planning layers.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PursuitError {
    /// Renormalisation found no probability mass left to scale.
    #[error("Degenerate distribution: no probability mass remains ({context})")]
    DegenerateDistribution { context: &'static str },

    #[error("Unknown node label: {0}")]
    UnknownLabel(Label),

    #[error("Duplicate node label: {0}")]
    DuplicateLabel(Label),

    /// An explicit edge path must start at `src` and end at `dst`.
    #[error("Invalid path between {src} and {dst}")]
    InvalidPath { src: Label, dst: Label },

    #[error("No free node label left")]
    LabelsExhausted,

    #[error("Graph has no nodes")]
    EmptyGraph,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, PursuitError>;
