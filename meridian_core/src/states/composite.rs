// meridian_core/src/states/composite.rs

use crate::errors::{Error, Result};
use crate::states::State;
use crate::types::StateId;
use nalgebra::{DMatrix, DVector};
use std::any::Any;
use std::collections::HashMap;
use std::ops::Range;

/// An ordered stack of heterogeneous sub-states treated as a single state.
///
/// The composite tangent space is the concatenation of the sub-state tangent
/// spaces, in list order. A slice table over `[0, dof)` is computed once at
/// construction; since every sub-state's `dof` is immutable, the table never
/// changes afterwards.
///
/// Sub-states are addressed both by list position and by `state_id`.
/// Identifier lookup is a linear scan; callers must keep identifiers unique
/// within one composite, otherwise the first match wins.
#[derive(Debug, Clone)]
pub struct CompositeState {
    states: Vec<Box<dyn State>>,
    slices: Vec<Range<usize>>,
    stamp: Option<f64>,
    state_id: Option<StateId>,
}

impl CompositeState {
    pub fn new(
        states: Vec<Box<dyn State>>,
        stamp: Option<f64>,
        state_id: Option<StateId>,
    ) -> Self {
        let mut slices = Vec::with_capacity(states.len());
        let mut counter = 0;
        for state in &states {
            slices.push(counter..counter + state.dof());
            counter += state.dof();
        }
        Self {
            states,
            slices,
            stamp,
            state_id,
        }
    }

    /// Number of sub-states.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn states(&self) -> &[Box<dyn State>] {
        &self.states
    }

    /// Consumes the composite and returns the sub-state list.
    pub fn into_states(self) -> Vec<Box<dyn State>> {
        self.states
    }

    /// The tangent-space slice table, in sub-state list order.
    pub fn slices(&self) -> &[Range<usize>] {
        &self.slices
    }

    pub fn state(&self, index: usize) -> Option<&dyn State> {
        self.states.get(index).map(|s| s.as_ref())
    }

    /// Mutable access to a sub-state. The sub-state's `dof` must not change
    /// through this handle; the slice table is fixed at construction.
    pub fn state_mut(&mut self, index: usize) -> Option<&mut dyn State> {
        self.states.get_mut(index).map(|s| &mut **s as &mut dyn State)
    }

    /// List position of the sub-state carrying `state_id`.
    pub fn get_index_by_id(&self, state_id: StateId) -> Result<usize> {
        self.states
            .iter()
            .position(|s| s.state_id() == Some(state_id))
            .ok_or(Error::StateNotFound(state_id))
    }

    /// Tangent-space slice of the sub-state carrying `state_id`.
    pub fn get_slice_by_id(&self, state_id: StateId) -> Result<Range<usize>> {
        let idx = self.get_index_by_id(state_id)?;
        Ok(self.slices[idx].clone())
    }

    pub fn get_state_by_id(&self, state_id: StateId) -> Result<&dyn State> {
        let idx = self.get_index_by_id(state_id)?;
        Ok(self.states[idx].as_ref())
    }

    pub fn get_state_by_id_mut(&mut self, state_id: StateId) -> Result<&mut dyn State> {
        let idx = self.get_index_by_id(state_id)?;
        Ok(self.states[idx].as_mut())
    }

    pub fn get_dof_by_id(&self, state_id: StateId) -> Result<usize> {
        Ok(self.get_state_by_id(state_id)?.dof())
    }

    pub fn get_stamp_by_id(&self, state_id: StateId) -> Result<Option<f64>> {
        Ok(self.get_state_by_id(state_id)?.stamp())
    }

    pub fn set_stamp_by_id(&mut self, stamp: Option<f64>, state_id: StateId) -> Result<()> {
        self.get_state_by_id_mut(state_id)?.set_stamp(stamp);
        Ok(())
    }

    /// Sets the timestamp of every sub-state.
    pub fn set_stamp_for_all(&mut self, stamp: Option<f64>) {
        for state in &mut self.states {
            state.set_stamp(stamp);
        }
    }

    /// Updates a single sub-state by identifier with a tangent vector of that
    /// sub-state's `dof`.
    pub fn plus_by_id(
        &mut self,
        dx: &DVector<f64>,
        state_id: StateId,
        new_stamp: Option<f64>,
    ) -> Result<()> {
        let state = self.get_state_by_id_mut(state_id)?;
        state.plus(dx)?;
        if new_stamp.is_some() {
            state.set_stamp(new_stamp);
        }
        Ok(())
    }

    /// `plus` with an optional new timestamp applied uniformly to every
    /// sub-state after the update.
    pub fn plus_with_stamp(&mut self, dx: &DVector<f64>, new_stamp: Option<f64>) -> Result<()> {
        if dx.len() != self.dof() {
            return Err(Error::DimensionMismatch {
                context: "CompositeState::plus",
                expected: self.dof(),
                actual: dx.len(),
            });
        }
        for (state, slice) in self.states.iter_mut().zip(&self.slices) {
            let sub_dx = dx.rows(slice.start, slice.len()).into_owned();
            state.plus(&sub_dx)?;
        }
        if new_stamp.is_some() {
            self.set_stamp_for_all(new_stamp);
        }
        Ok(())
    }

    /// Assembles the Jacobian of the entire composite from blocks associated
    /// with some of the sub-states, keyed by sub-state identifier. Blocks are
    /// scattered into each owner's slice of a zero-initialized full-width
    /// Jacobian, so a measurement touching one or two sub-states still yields
    /// a Jacobian over the whole composite tangent space.
    ///
    /// The row count is taken from the first block the map yields and every
    /// other block must match it; iteration order therefore does not matter.
    pub fn jacobian_from_blocks(
        &self,
        blocks: &HashMap<StateId, DMatrix<f64>>,
    ) -> Result<DMatrix<f64>> {
        let rows = blocks
            .values()
            .next()
            .map(|b| b.nrows())
            .ok_or_else(|| {
                Error::InvalidParameter("jacobian_from_blocks requires at least one block".into())
            })?;
        let mut jac = DMatrix::zeros(rows, self.dof());
        for (&state_id, block) in blocks {
            if block.nrows() != rows {
                return Err(Error::DimensionMismatch {
                    context: "CompositeState::jacobian_from_blocks: row count",
                    expected: rows,
                    actual: block.nrows(),
                });
            }
            let slice = self.get_slice_by_id(state_id)?;
            if block.ncols() != slice.len() {
                return Err(Error::DimensionMismatch {
                    context: "CompositeState::jacobian_from_blocks: column count",
                    expected: slice.len(),
                    actual: block.ncols(),
                });
            }
            jac.view_mut((0, slice.start), (rows, slice.len()))
                .copy_from(block);
        }
        Ok(jac)
    }
}

impl State for CompositeState {
    fn dof(&self) -> usize {
        self.slices.last().map_or(0, |s| s.end)
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
        self.plus_with_stamp(dx, None)
    }

    fn minus(&self, other: &dyn State) -> Result<DVector<f64>> {
        let other = other
            .as_any()
            .downcast_ref::<CompositeState>()
            .ok_or(Error::StateTypeMismatch("CompositeState"))?;
        if other.len() != self.len() {
            return Err(Error::IncompatibleStates("sub-state counts differ"));
        }
        let mut dx = DVector::zeros(self.dof());
        for ((ours, theirs), slice) in self
            .states
            .iter()
            .zip(&other.states)
            .zip(&self.slices)
        {
            let sub_dx = ours.minus(theirs.as_ref())?;
            dx.rows_mut(slice.start, slice.len()).copy_from(&sub_dx);
        }
        Ok(dx)
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
    use crate::lie::MatrixLieGroup;
    use crate::states::{MatrixLieGroupState, VectorState};
    use crate::types::Direction;
    use approx::assert_abs_diff_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn sample_composite(rng: &mut StdRng) -> CompositeState {
        let mut pose = MatrixLieGroupState::from_exp(
            MatrixLieGroup::SE3,
            &DVector::from_fn(6, |_, _| rng.gen_range(-1.0..1.0)),
            Direction::Right,
        );
        pose.set_state_id(Some(StateId(1)));
        let mut bias = VectorState::new(
            DVector::from_fn(3, |_, _| rng.gen_range(-1.0..1.0)),
            None,
            None,
        );
        bias.set_state_id(Some(StateId(2)));
        let mut heading = MatrixLieGroupState::from_exp(
            MatrixLieGroup::SO2,
            &DVector::from_fn(1, |_, _| rng.gen_range(-1.0..1.0)),
            Direction::Right,
        );
        heading.set_state_id(Some(StateId(3)));
        CompositeState::new(
            vec![Box::new(pose), Box::new(bias), Box::new(heading)],
            None,
            None,
        )
    }

    #[test]
    fn slice_table_partitions_tangent_space() {
        let mut rng = StdRng::seed_from_u64(20);
        let x = sample_composite(&mut rng);
        assert_eq!(x.dof(), 10);
        let mut expected_start = 0;
        for (slice, state) in x.slices().iter().zip(x.states()) {
            assert_eq!(slice.start, expected_start);
            assert_eq!(slice.len(), state.dof());
            expected_start = slice.end;
        }
        assert_eq!(expected_start, x.dof());
    }

    #[test]
    fn addressing_by_id() {
        let mut rng = StdRng::seed_from_u64(21);
        let x = sample_composite(&mut rng);
        assert_eq!(x.get_index_by_id(StateId(2)).unwrap(), 1);
        assert_eq!(x.get_slice_by_id(StateId(2)).unwrap(), 6..9);
        assert_eq!(x.get_dof_by_id(StateId(3)).unwrap(), 1);
        assert!(matches!(
            x.get_index_by_id(StateId(99)),
            Err(Error::StateNotFound(StateId(99)))
        ));
    }

    #[test]
    fn plus_minus_round_trip() {
        let mut rng = StdRng::seed_from_u64(22);
        let x = sample_composite(&mut rng);
        let dx = DVector::from_fn(x.dof(), |_, _| rng.gen_range(-0.5..0.5));
        let mut moved = x.clone();
        moved.plus(&dx).unwrap();
        assert_abs_diff_eq!(moved.minus(&x).unwrap(), dx, epsilon = 1e-9);
    }

    #[test]
    fn plus_with_stamp_restamps_every_substate() {
        let mut rng = StdRng::seed_from_u64(23);
        let mut x = sample_composite(&mut rng);
        let dx = DVector::zeros(x.dof());
        x.plus_with_stamp(&dx, Some(4.2)).unwrap();
        for state in x.states() {
            assert_eq!(state.stamp(), Some(4.2));
        }
    }

    #[test]
    fn jacobian_from_blocks_scatters_at_slices() {
        let mut rng = StdRng::seed_from_u64(24);
        let x = sample_composite(&mut rng);
        let mut blocks = HashMap::new();
        blocks.insert(StateId(2), DMatrix::from_element(2, 3, 1.5));
        let jac = x.jacobian_from_blocks(&blocks).unwrap();
        assert_eq!(jac.shape(), (2, 10));
        assert_abs_diff_eq!(
            jac.view((0, 6), (2, 3)).into_owned(),
            DMatrix::from_element(2, 3, 1.5)
        );
        assert_abs_diff_eq!(jac.view((0, 0), (2, 6)).into_owned(), DMatrix::zeros(2, 6));
        assert_abs_diff_eq!(jac.view((0, 9), (2, 1)).into_owned(), DMatrix::zeros(2, 1));
    }

    #[test]
    fn minus_rejects_layout_mismatch() {
        let mut rng = StdRng::seed_from_u64(25);
        let x = sample_composite(&mut rng);
        let y = CompositeState::new(vec![Box::new(VectorState::zeros(3))], None, None);
        assert!(matches!(
            x.minus(&y),
            Err(Error::IncompatibleStates(_))
        ));
    }
}
