// meridian_core/src/types.rs

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

// --- Core Identifier ---
/// A generic, framework-agnostic identifier for a sub-state.
/// It can be a simple integer. On a real robot, this might be a hardware ID
/// or the bits of an ECS entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct StateId(pub u64);

/// Perturbation convention for states living on a matrix Lie group.
///
/// `Right` composes a tangent update from the right (`x ∘ Exp(dx)`), `Left`
/// from the left (`Exp(dx) ∘ x`). The convention is fixed per state instance
/// at construction and propagates to every Jacobian touching that state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    Right,
    Left,
}

/// An exogenous input sample (e.g. an interoceptive sensor reading used as a
/// process-model input), bundled with the time it was taken.
#[derive(Debug, Clone)]
pub struct StampedValue {
    /// The raw input vector `u`.
    pub value: DVector<f64>,
    /// The timestamp of the sample, if known.
    pub stamp: Option<f64>,
}

impl StampedValue {
    pub fn new(value: DVector<f64>, stamp: Option<f64>) -> Self {
        Self { value, stamp }
    }

    /// Convenience constructor for an un-stamped input.
    pub fn from_vec(value: Vec<f64>) -> Self {
        Self {
            value: DVector::from_vec(value),
            stamp: None,
        }
    }
}
