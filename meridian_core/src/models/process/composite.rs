// meridian_core/src/models/process/composite.rs

use crate::errors::{Error, Result};
use crate::models::{check_input_dim, expect_composite, expect_composite_mut, ProcessModel};
use crate::states::State;
use crate::types::StampedValue;
use crate::utils::block_diag;
use nalgebra::DMatrix;

/// Applies one process model per sub-state of a [`crate::states::CompositeState`],
/// matched by list position. The stacked input vector is split among the
/// sub-models according to their `input_dim`s, in order.
///
/// The sub-states are assumed uncoupled by this model: the composite Jacobian
/// and covariance are block-diagonal by construction.
#[derive(Debug, Clone)]
pub struct CompositeProcessModel {
    models: Vec<Box<dyn ProcessModel>>,
}

impl CompositeProcessModel {
    pub fn new(models: Vec<Box<dyn ProcessModel>>) -> Self {
        Self { models }
    }

    fn check_arity(&self, x: &dyn State) -> Result<()> {
        let x = expect_composite(x)?;
        if x.len() != self.models.len() {
            return Err(Error::IncompatibleStates(
                "CompositeProcessModel: one sub-model per sub-state required",
            ));
        }
        Ok(())
    }

    /// Splits the stacked input by sub-model `input_dim`, in list order.
    fn split_input(&self, u: &StampedValue) -> Result<Vec<StampedValue>> {
        check_input_dim("CompositeProcessModel: input", u, self.input_dim())?;
        let mut subs = Vec::with_capacity(self.models.len());
        let mut offset = 0;
        for model in &self.models {
            let dim = model.input_dim();
            subs.push(StampedValue::new(
                u.value.rows(offset, dim).into_owned(),
                u.stamp,
            ));
            offset += dim;
        }
        Ok(subs)
    }
}

impl ProcessModel for CompositeProcessModel {
    fn input_dim(&self) -> usize {
        self.models.iter().map(|m| m.input_dim()).sum()
    }

    fn evaluate(&self, x: &mut dyn State, u: &StampedValue, dt: f64) -> Result<()> {
        self.check_arity(x)?;
        let subs = self.split_input(u)?;
        let x = expect_composite_mut(x)?;
        for (i, (model, sub_u)) in self.models.iter().zip(&subs).enumerate() {
            // Arity was checked above; every index is in range.
            let sub_state = x.state_mut(i).ok_or(Error::IncompatibleStates(
                "CompositeProcessModel: sub-state missing",
            ))?;
            model.evaluate(sub_state, sub_u, dt)?;
        }
        Ok(())
    }

    fn jacobian(&self, x: &dyn State, u: &StampedValue, dt: f64) -> Result<DMatrix<f64>> {
        self.check_arity(x)?;
        let subs = self.split_input(u)?;
        let x = expect_composite(x)?;
        let blocks = self
            .models
            .iter()
            .zip(x.states())
            .zip(&subs)
            .map(|((model, sub_state), sub_u)| model.jacobian(sub_state.as_ref(), sub_u, dt))
            .collect::<Result<Vec<_>>>()?;
        Ok(block_diag(&blocks))
    }

    fn covariance(&self, x: &dyn State, u: &StampedValue, dt: f64) -> Result<DMatrix<f64>> {
        self.check_arity(x)?;
        let subs = self.split_input(u)?;
        let x = expect_composite(x)?;
        let blocks = self
            .models
            .iter()
            .zip(x.states())
            .zip(&subs)
            .map(|((model, sub_state), sub_u)| model.covariance(sub_state.as_ref(), sub_u, dt))
            .collect::<Result<Vec<_>>>()?;
        Ok(block_diag(&blocks))
    }
}
