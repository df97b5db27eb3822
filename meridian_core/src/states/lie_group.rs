// meridian_core/src/states/lie_group.rs

use crate::errors::{Error, Result};
use crate::lie::MatrixLieGroup;
use crate::states::State;
use crate::types::{Direction, StateId};
use nalgebra::{DMatrix, DVector};
use std::any::Any;

/// A state whose value is a matrix Lie group element.
///
/// The `group` tag fixes the tangent dimension and block structure of the
/// value; `direction` fixes the perturbation convention for the lifetime of
/// the state and propagates to every Jacobian computed against it.
#[derive(Debug, Clone)]
pub struct MatrixLieGroupState {
    value: DMatrix<f64>,
    group: MatrixLieGroup,
    direction: Direction,
    stamp: Option<f64>,
    state_id: Option<StateId>,
}

impl MatrixLieGroupState {
    /// Wraps an existing group element. Fails if the matrix does not have the
    /// embedding shape of `group`.
    pub fn new(
        value: DMatrix<f64>,
        group: MatrixLieGroup,
        direction: Direction,
        stamp: Option<f64>,
        state_id: Option<StateId>,
    ) -> Result<Self> {
        let n = group.matrix_dim();
        if value.nrows() != n || value.ncols() != n {
            return Err(Error::DimensionMismatch {
                context: "MatrixLieGroupState::new",
                expected: n,
                actual: value.nrows().max(value.ncols()),
            });
        }
        Ok(Self {
            value,
            group,
            direction,
            stamp,
            state_id,
        })
    }

    /// The identity element of `group`.
    pub fn identity(group: MatrixLieGroup, direction: Direction) -> Self {
        Self {
            value: group.identity(),
            group,
            direction,
            stamp: None,
            state_id: None,
        }
    }

    /// Builds a state from exponential coordinates.
    pub fn from_exp(group: MatrixLieGroup, xi: &DVector<f64>, direction: Direction) -> Self {
        Self {
            value: group.exp(xi),
            group,
            direction,
            stamp: None,
            state_id: None,
        }
    }

    // Per-group constructors, the closed family of specializations.
    pub fn so2(value: DMatrix<f64>, direction: Direction) -> Result<Self> {
        Self::new(value, MatrixLieGroup::SO2, direction, None, None)
    }

    pub fn so3(value: DMatrix<f64>, direction: Direction) -> Result<Self> {
        Self::new(value, MatrixLieGroup::SO3, direction, None, None)
    }

    pub fn se2(value: DMatrix<f64>, direction: Direction) -> Result<Self> {
        Self::new(value, MatrixLieGroup::SE2, direction, None, None)
    }

    pub fn se3(value: DMatrix<f64>, direction: Direction) -> Result<Self> {
        Self::new(value, MatrixLieGroup::SE3, direction, None, None)
    }

    pub fn se23(value: DMatrix<f64>, direction: Direction) -> Result<Self> {
        Self::new(value, MatrixLieGroup::SE23, direction, None, None)
    }

    pub fn value(&self) -> &DMatrix<f64> {
        &self.value
    }

    /// Replaces the group element. The shape (and therefore `dof`) cannot
    /// change.
    pub fn set_value(&mut self, value: DMatrix<f64>) -> Result<()> {
        let n = self.group.matrix_dim();
        if value.nrows() != n || value.ncols() != n {
            return Err(Error::DimensionMismatch {
                context: "MatrixLieGroupState::set_value",
                expected: n,
                actual: value.nrows().max(value.ncols()),
            });
        }
        self.value = value;
        Ok(())
    }

    pub fn group(&self) -> MatrixLieGroup {
        self.group
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// The rotation subgroup of this state's group (SO(2) or SO(3)).
    pub fn attitude_group(&self) -> MatrixLieGroup {
        self.group.attitude_group()
    }

    fn rot_dim(&self) -> usize {
        self.group.attitude_group().matrix_dim()
    }

    /// Column index of the position block, for pose groups.
    fn position_col(&self) -> Result<usize> {
        match self.group {
            MatrixLieGroup::SE2 => Ok(2),
            MatrixLieGroup::SE3 => Ok(3),
            MatrixLieGroup::SE23 => Ok(4),
            group => Err(Error::UnsupportedGroup {
                op: "position",
                group,
            }),
        }
    }

    /// The rotation block of the value. Defined for every supported group
    /// (for SO(2)/SO(3) it is the whole value).
    pub fn attitude(&self) -> DMatrix<f64> {
        let d = self.rot_dim();
        self.value.view((0, 0), (d, d)).into_owned()
    }

    pub fn set_attitude(&mut self, c: &DMatrix<f64>) -> Result<()> {
        let d = self.rot_dim();
        if c.nrows() != d || c.ncols() != d {
            return Err(Error::DimensionMismatch {
                context: "MatrixLieGroupState::set_attitude",
                expected: d,
                actual: c.nrows().max(c.ncols()),
            });
        }
        self.value.view_mut((0, 0), (d, d)).copy_from(c);
        Ok(())
    }

    /// The translation block, for pose groups.
    pub fn position(&self) -> Result<DVector<f64>> {
        let col = self.position_col()?;
        let d = self.rot_dim();
        Ok(self.value.view((0, col), (d, 1)).column(0).into_owned())
    }

    pub fn set_position(&mut self, r: &DVector<f64>) -> Result<()> {
        let col = self.position_col()?;
        let d = self.rot_dim();
        if r.len() != d {
            return Err(Error::DimensionMismatch {
                context: "MatrixLieGroupState::set_position",
                expected: d,
                actual: r.len(),
            });
        }
        self.value.view_mut((0, col), (d, 1)).copy_from(r);
        Ok(())
    }

    /// The velocity block, for the extended pose only.
    pub fn velocity(&self) -> Result<DVector<f64>> {
        match self.group {
            MatrixLieGroup::SE23 => Ok(self.value.view((0, 3), (3, 1)).column(0).into_owned()),
            group => Err(Error::UnsupportedGroup {
                op: "velocity",
                group,
            }),
        }
    }

    pub fn set_velocity(&mut self, v: &DVector<f64>) -> Result<()> {
        match self.group {
            MatrixLieGroup::SE23 => {
                if v.len() != 3 {
                    return Err(Error::DimensionMismatch {
                        context: "MatrixLieGroupState::set_velocity",
                        expected: 3,
                        actual: v.len(),
                    });
                }
                self.value.view_mut((0, 3), (3, 1)).copy_from(v);
                Ok(())
            }
            group => Err(Error::UnsupportedGroup {
                op: "velocity",
                group,
            }),
        }
    }

    /// Assembles a Jacobian over the full `dof` from named partial blocks,
    /// zero-filling the blocks that were not provided and concatenating in
    /// the group's canonical tangent ordering.
    ///
    /// All provided blocks must share a row count; each block's column count
    /// must equal the dimension of the tangent sub-block it targets.
    pub fn jacobian_from_blocks(&self, blocks: JacobianBlocks) -> Result<DMatrix<f64>> {
        let att_cols = self.group.attitude_group().dof();
        let pos_cols = match self.group {
            MatrixLieGroup::SO2 | MatrixLieGroup::SO3 => 0,
            MatrixLieGroup::SE2 => 2,
            MatrixLieGroup::SE3 | MatrixLieGroup::SE23 => 3,
        };
        let vel_cols = match self.group {
            MatrixLieGroup::SE23 => 3,
            _ => 0,
        };
        if blocks.position.is_some() && pos_cols == 0 {
            return Err(Error::UnsupportedGroup {
                op: "position Jacobian block",
                group: self.group,
            });
        }
        if blocks.velocity.is_some() && vel_cols == 0 {
            return Err(Error::UnsupportedGroup {
                op: "velocity Jacobian block",
                group: self.group,
            });
        }

        let rows = blocks
            .attitude
            .as_ref()
            .or(blocks.velocity.as_ref())
            .or(blocks.position.as_ref())
            .map(|jac| jac.nrows())
            .ok_or_else(|| {
                Error::InvalidParameter("jacobian_from_blocks requires at least one block".into())
            })?;

        let mut jac = DMatrix::zeros(rows, self.dof());
        // Canonical ordering: attitude, then velocity (SE_2(3) only), then
        // position.
        let mut offset = 0;
        for (block, cols) in [
            (blocks.attitude, att_cols),
            (blocks.velocity, vel_cols),
            (blocks.position, pos_cols),
        ] {
            if let Some(b) = block {
                if b.nrows() != rows {
                    return Err(Error::DimensionMismatch {
                        context: "jacobian_from_blocks: block row count",
                        expected: rows,
                        actual: b.nrows(),
                    });
                }
                if b.ncols() != cols {
                    return Err(Error::DimensionMismatch {
                        context: "jacobian_from_blocks: block column count",
                        expected: cols,
                        actual: b.ncols(),
                    });
                }
                jac.view_mut((0, offset), (rows, cols)).copy_from(&b);
            }
            offset += cols;
        }
        Ok(jac)
    }
}

/// Named partial Jacobian blocks for [`MatrixLieGroupState::jacobian_from_blocks`].
#[derive(Debug, Clone, Default)]
pub struct JacobianBlocks {
    pub attitude: Option<DMatrix<f64>>,
    pub velocity: Option<DMatrix<f64>>,
    pub position: Option<DMatrix<f64>>,
}

impl JacobianBlocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attitude(mut self, jac: DMatrix<f64>) -> Self {
        self.attitude = Some(jac);
        self
    }

    pub fn velocity(mut self, jac: DMatrix<f64>) -> Self {
        self.velocity = Some(jac);
        self
    }

    pub fn position(mut self, jac: DMatrix<f64>) -> Self {
        self.position = Some(jac);
        self
    }
}

impl State for MatrixLieGroupState {
    fn dof(&self) -> usize {
        self.group.dof()
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
        if dx.len() != self.dof() {
            return Err(Error::DimensionMismatch {
                context: "MatrixLieGroupState::plus",
                expected: self.dof(),
                actual: dx.len(),
            });
        }
        self.value = match self.direction {
            Direction::Right => &self.value * self.group.exp(dx),
            Direction::Left => self.group.exp(dx) * &self.value,
        };
        Ok(())
    }

    fn minus(&self, other: &dyn State) -> Result<DVector<f64>> {
        let other = other
            .as_any()
            .downcast_ref::<MatrixLieGroupState>()
            .ok_or(Error::StateTypeMismatch("MatrixLieGroupState"))?;
        if other.group != self.group {
            return Err(Error::IncompatibleStates("Lie groups differ"));
        }
        if other.direction != self.direction {
            return Err(Error::IncompatibleStates("perturbation directions differ"));
        }
        Ok(match self.direction {
            Direction::Right => self.group.log(&(self.group.inverse(&other.value) * &self.value)),
            Direction::Left => self.group.log(&(&self.value * self.group.inverse(&other.value))),
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
