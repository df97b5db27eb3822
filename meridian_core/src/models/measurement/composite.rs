// meridian_core/src/models/measurement/composite.rs

use crate::errors::Result;
use crate::models::{expect_composite, MeasurementModel};
use crate::states::State;
use crate::types::StateId;
use nalgebra::{DMatrix, DVector};

/// Assigns a single-substate measurement model to a specific sub-state
/// (referenced by `state_id`) inside a [`crate::states::CompositeState`].
///
/// `evaluate` and `covariance` delegate directly to the wrapped model on the
/// addressed sub-state; `jacobian` scatters the wrapped model's native
/// Jacobian into the addressed slice of a zero-initialized full-width
/// Jacobian. This is the general mechanism behind measurements that touch
/// only part of a composite state.
#[derive(Debug, Clone)]
pub struct CompositeMeasurementModel {
    model: Box<dyn MeasurementModel>,
    state_id: StateId,
}

impl CompositeMeasurementModel {
    pub fn new(model: Box<dyn MeasurementModel>, state_id: StateId) -> Self {
        Self { model, state_id }
    }

    /// The identifier of the addressed sub-state.
    pub fn target(&self) -> StateId {
        self.state_id
    }
}

impl MeasurementModel for CompositeMeasurementModel {
    fn measurement_dim(&self) -> usize {
        self.model.measurement_dim()
    }

    fn evaluate(&self, x: &dyn State) -> Result<DVector<f64>> {
        let x = expect_composite(x)?;
        self.model.evaluate(x.get_state_by_id(self.state_id)?)
    }

    fn jacobian(&self, x: &dyn State) -> Result<DMatrix<f64>> {
        let x = expect_composite(x)?;
        let sub = x.get_state_by_id(self.state_id)?;
        let jac_sub = self.model.jacobian(sub)?;
        let slice = x.get_slice_by_id(self.state_id)?;
        let mut jac = DMatrix::zeros(jac_sub.nrows(), x.dof());
        jac.view_mut((0, slice.start), (jac_sub.nrows(), slice.len()))
            .copy_from(&jac_sub);
        Ok(jac)
    }

    fn covariance(&self, x: &dyn State) -> Result<DMatrix<f64>> {
        let x = expect_composite(x)?;
        self.model.covariance(x.get_state_by_id(self.state_id)?)
    }
}
