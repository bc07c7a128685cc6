//! Configuration errors
//!
//! Every invariant the engine depends on is checked once, when the
//! simulation is built. Nothing in the tick loop returns an error.

use thiserror::Error;

use super::types::Axis;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("tick duration must be positive and finite, got {0}")]
    TickDuration(f32),

    #[error("light pair ({a}, {b}) must start with exactly one GREEN, found {greens}")]
    PairInitialPhase { a: usize, b: usize, greens: usize },

    #[error("light pair ({a}, {b}) must govern perpendicular axes, both control {axis}")]
    PairSameAxis { a: usize, b: usize, axis: Axis },

    #[error("light {0} appears in more than one pair")]
    LightPairedTwice(usize),

    #[error("light index {index} out of range ({count} lights configured)")]
    UnknownLight { index: usize, count: usize },

    #[error("gate {gate} gates {gate_axis} traffic but its light {light} controls {light_axis}")]
    GateAxisMismatch {
        gate: usize,
        gate_axis: Axis,
        light: usize,
        light_axis: Axis,
    },

    #[error("vehicle class {class}: {field} must be positive, got {value}")]
    VehicleProfile {
        class: &'static str,
        field: &'static str,
        value: f32,
    },

    #[error("{name} must be a probability in [0, 1], got {value}")]
    Probability { name: &'static str, value: f64 },

    #[error("light {light} timing: {reason}")]
    LightTiming { light: usize, reason: String },

    #[error("geometry error: {0}")]
    Geometry(String),

    #[error("pedestrian settings: {0}")]
    Pedestrian(String),
}

/// Shorthand result type for configuration checks
pub type ConfigResult<T> = Result<T, ConfigError>;
