// meridian_core/src/models/mod.rs

use crate::errors::{Error, Result};
use crate::states::{CompositeState, MatrixLieGroupState, State, VectorState};
use crate::types::StampedValue;
use dyn_clone::DynClone;
use nalgebra::{DMatrix, DVector};
use std::fmt::Debug;

pub mod measurement;
pub mod process;

// --- PROCESS MODEL TRAIT ---
// The mathematical model of the system's motion: `x_k = f(x_k-1, u, dt) + w`.
//
// Models are stateless policy objects holding only their own fixed parameters
// (noise matrices, offsets, referenced sub-state identifiers); they never own
// the states they operate on.
pub trait ProcessModel: Debug + DynClone + Send + Sync {
    /// The expected length of the input vector `u`.
    fn input_dim(&self) -> usize;

    /// Propagates the state forward by `dt` given the input `u`, mutating
    /// `x` in place. The exclusive borrow is the ownership contract: a caller
    /// needing the prior value must `clone` the state first.
    fn evaluate(&self, x: &mut dyn State, u: &StampedValue, dt: f64) -> Result<()>;

    /// The derivative of the retraction coordinates of `evaluate`'s output
    /// with respect to the retraction coordinates of the input state, size
    /// `dof x dof`.
    fn jacobian(&self, x: &dyn State, u: &StampedValue, dt: f64) -> Result<DMatrix<f64>>;

    /// Process-noise covariance pushed into output tangent coordinates, size
    /// `dof x dof`, symmetric positive semi-definite.
    fn covariance(&self, x: &dyn State, u: &StampedValue, dt: f64) -> Result<DMatrix<f64>>;
}

// --- MEASUREMENT MODEL TRAIT ---
// The mathematical model of a sensor: `y = g(x) + v`.
pub trait MeasurementModel: Debug + DynClone + Send + Sync {
    /// Number of rows of the measurement vector `y`.
    fn measurement_dim(&self) -> usize;

    /// Predicts the ideal measurement `y_hat = g(x)`.
    fn evaluate(&self, x: &dyn State) -> Result<DVector<f64>>;

    /// The measurement Jacobian with respect to the state's retraction
    /// coordinates, size `measurement_dim x dof`.
    fn jacobian(&self, x: &dyn State) -> Result<DMatrix<f64>>;

    /// Measurement-noise covariance, size `measurement_dim x measurement_dim`.
    fn covariance(&self, x: &dyn State) -> Result<DMatrix<f64>>;
}

dyn_clone::clone_trait_object!(ProcessModel);
dyn_clone::clone_trait_object!(MeasurementModel);

// --- Downcast helpers shared by the concrete models ---

pub(crate) fn expect_vector(x: &dyn State) -> Result<&VectorState> {
    x.as_any()
        .downcast_ref()
        .ok_or(Error::StateTypeMismatch("VectorState"))
}

pub(crate) fn expect_vector_mut(x: &mut dyn State) -> Result<&mut VectorState> {
    x.as_any_mut()
        .downcast_mut()
        .ok_or(Error::StateTypeMismatch("VectorState"))
}

pub(crate) fn expect_lie_group(x: &dyn State) -> Result<&MatrixLieGroupState> {
    x.as_any()
        .downcast_ref()
        .ok_or(Error::StateTypeMismatch("MatrixLieGroupState"))
}

pub(crate) fn expect_lie_group_mut(x: &mut dyn State) -> Result<&mut MatrixLieGroupState> {
    x.as_any_mut()
        .downcast_mut()
        .ok_or(Error::StateTypeMismatch("MatrixLieGroupState"))
}

pub(crate) fn expect_composite(x: &dyn State) -> Result<&CompositeState> {
    x.as_any()
        .downcast_ref()
        .ok_or(Error::StateTypeMismatch("CompositeState"))
}

pub(crate) fn expect_composite_mut(x: &mut dyn State) -> Result<&mut CompositeState> {
    x.as_any_mut()
        .downcast_mut()
        .ok_or(Error::StateTypeMismatch("CompositeState"))
}

pub(crate) fn check_input_dim(context: &'static str, u: &StampedValue, expected: usize) -> Result<()> {
    if u.value.len() != expected {
        return Err(Error::DimensionMismatch {
            context,
            expected,
            actual: u.value.len(),
        });
    }
    Ok(())
}
