// meridian_core/src/states/vector.rs

use crate::errors::{Error, Result};
use crate::states::State;
use crate::types::StateId;
use nalgebra::DVector;
use std::any::Any;

/// A standard vector-space state. The retraction is ordinary vector
/// addition, so `dof` equals the length of the value.
#[derive(Debug, Clone)]
pub struct VectorState {
    pub value: DVector<f64>,
    stamp: Option<f64>,
    state_id: Option<StateId>,
}

impl VectorState {
    pub fn new(value: DVector<f64>, stamp: Option<f64>, state_id: Option<StateId>) -> Self {
        Self {
            value,
            stamp,
            state_id,
        }
    }

    pub fn zeros(dof: usize) -> Self {
        Self::new(DVector::zeros(dof), None, None)
    }
}

impl State for VectorState {
    fn dof(&self) -> usize {
        self.value.len()
    }

    fn stamp(&self) -> Option<f64> {
        self.stamp
    }

    fn set_stamp(&mut self, stamp: Option<f64>) {
        self.stamp = stamp;
    }

    fn state_id(&self) -> Option<StateId> {
        self.state_id
    }

    fn set_state_id(&mut self, state_id: Option<StateId>) {
        self.state_id = state_id;
    }

    fn plus(&mut self, dx: &DVector<f64>) -> Result<()> {
        if dx.len() != self.value.len() {
            return Err(Error::DimensionMismatch {
                context: "VectorState::plus",
                expected: self.value.len(),
                actual: dx.len(),
            });
        }
        self.value += dx;
        Ok(())
    }

    fn minus(&self, other: &dyn State) -> Result<DVector<f64>> {
        let other = other
            .as_any()
            .downcast_ref::<VectorState>()
            .ok_or(Error::StateTypeMismatch("VectorState"))?;
        if other.value.len() != self.value.len() {
            return Err(Error::DimensionMismatch {
                context: "VectorState::minus",
                expected: self.value.len(),
                actual: other.value.len(),
            });
        }
        Ok(&self.value - &other.value)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn plus_minus_are_inverse() {
        let x = VectorState::new(DVector::from_vec(vec![1.0, -2.0, 3.0]), None, None);
        let mut y = VectorState::new(DVector::from_vec(vec![0.5, 0.5, 0.5]), None, None);
        let dx = x.minus(&y).unwrap();
        y.plus(&dx).unwrap();
        assert_abs_diff_eq!(y.value, x.value, epsilon = 1e-14);
        assert_abs_diff_eq!(x.minus(&x).unwrap(), DVector::zeros(3), epsilon = 1e-14);
    }

    #[test]
    fn plus_rejects_wrong_length() {
        let mut x = VectorState::zeros(3);
        let err = x.plus(&DVector::zeros(2)).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { .. }));
    }

    #[test]
    fn boxed_clone_is_deep() {
        let x = VectorState::new(DVector::from_vec(vec![1.0, 2.0]), Some(0.5), None);
        let boxed: Box<dyn State> = Box::new(x);
        let mut copy = boxed.clone();
        copy.plus(&DVector::from_vec(vec![1.0, 1.0])).unwrap();
        let original = boxed.as_any().downcast_ref::<VectorState>().unwrap();
        assert_abs_diff_eq!(original.value, DVector::from_vec(vec![1.0, 2.0]));
    }
}
