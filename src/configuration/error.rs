//! Errors raised while turning a scenario configuration into a simulator

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Time step negative, NaN or infinite
    #[error("invalid time step {dt}: must be finite and non-negative")]
    InvalidTimeStep { dt: f64 },

    #[error("invalid viscous drag {drag}: must be finite and non-negative")]
    NegativeDrag { drag: f64 },

    /// A shape that could never report a collision
    #[error("geometry #{index} ({kind}) is degenerate")]
    DegenerateGeometry { index: usize, kind: &'static str },

    #[error("object #{index}: triangle refers to vertex {vertex}, only {count} vertices given")]
    InvalidObject { index: usize, vertex: usize, count: usize },

    #[error("{which} emitter: {reason}")]
    InvalidEmitter { which: &'static str, reason: String },

    #[error("agent #{index}: {reason}")]
    InvalidAgent { index: usize, reason: String },
}
