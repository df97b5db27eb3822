// meridian_core/src/models/process/integrator.rs

use crate::errors::{Error, Result};
use crate::models::{check_input_dim, expect_vector, expect_vector_mut, ProcessModel};
use crate::states::State;
use crate::types::StampedValue;
use nalgebra::DMatrix;

/// The single-integrator process model, `x_dot = u`, discretized as
/// `x ← x + dt·u`. Operates on a [`crate::states::VectorState`].
#[derive(Debug, Clone)]
pub struct SingleIntegrator {
    q: DMatrix<f64>,
}

impl SingleIntegrator {
    /// `q` is the continuous-time input noise covariance; it must be square
    /// and sized like the state.
    pub fn new(q: DMatrix<f64>) -> Result<Self> {
        if !q.is_square() {
            return Err(Error::InvalidParameter(
                "SingleIntegrator: Q must be an n x n matrix".into(),
            ));
        }
        Ok(Self { q })
    }

    fn dim(&self) -> usize {
        self.q.nrows()
    }

    fn check_state(&self, x: &dyn State) -> Result<()> {
        if x.dof() != self.dim() {
            return Err(Error::DimensionMismatch {
                context: "SingleIntegrator: state dof",
                expected: self.dim(),
                actual: x.dof(),
            });
        }
        Ok(())
    }
}

impl ProcessModel for SingleIntegrator {
    fn input_dim(&self) -> usize {
        self.dim()
    }

    fn evaluate(&self, x: &mut dyn State, u: &StampedValue, dt: f64) -> Result<()> {
        self.check_state(x)?;
        check_input_dim("SingleIntegrator: input", u, self.dim())?;
        let x = expect_vector_mut(x)?;
        x.value += &u.value * dt;
        Ok(())
    }

    fn jacobian(&self, x: &dyn State, _u: &StampedValue, _dt: f64) -> Result<DMatrix<f64>> {
        expect_vector(x)?;
        self.check_state(x)?;
        Ok(DMatrix::identity(self.dim(), self.dim()))
    }

    fn covariance(&self, x: &dyn State, _u: &StampedValue, dt: f64) -> Result<DMatrix<f64>> {
        expect_vector(x)?;
        self.check_state(x)?;
        Ok(&self.q * (dt * dt))
    }
}
