// meridian_core/src/models/measurement/position.rs

use crate::errors::{Error, Result};
use crate::lie::MatrixLieGroup;
use crate::models::{expect_lie_group, MeasurementModel};
use crate::states::{JacobianBlocks, MatrixLieGroupState, State};
use crate::types::Direction;
use nalgebra::{DMatrix, DVector};

/// Standard gravity, in m/s².
pub const GRAVITY: f64 = 9.80665;

/// Global, world-frame ("absolute") position measurement of a pose state.
///
/// Derived for both perturbation conventions.
#[derive(Debug, Clone)]
pub struct GlobalPosition {
    r: DMatrix<f64>,
}

impl GlobalPosition {
    /// `r` is the measurement noise covariance, sized like the position.
    pub fn new(r: DMatrix<f64>) -> Result<Self> {
        if !r.is_square() {
            return Err(Error::InvalidParameter(
                "GlobalPosition: R must be an n x n matrix".into(),
            ));
        }
        Ok(Self { r })
    }

    fn position(&self, x: &MatrixLieGroupState) -> Result<DVector<f64>> {
        let p = x.position()?;
        if p.len() != self.r.nrows() {
            return Err(Error::DimensionMismatch {
                context: "GlobalPosition: position dimension",
                expected: self.r.nrows(),
                actual: p.len(),
            });
        }
        Ok(p)
    }
}

impl MeasurementModel for GlobalPosition {
    fn measurement_dim(&self) -> usize {
        self.r.nrows()
    }

    fn evaluate(&self, x: &dyn State) -> Result<DVector<f64>> {
        self.position(expect_lie_group(x)?)
    }

    fn jacobian(&self, x: &dyn State) -> Result<DMatrix<f64>> {
        let x = expect_lie_group(x)?;
        match x.direction() {
            Direction::Right => {
                x.jacobian_from_blocks(JacobianBlocks::new().position(x.attitude()))
            }
            Direction::Left => {
                let p = self.position(x)?;
                x.jacobian_from_blocks(
                    JacobianBlocks::new()
                        .attitude(x.attitude_group().odot(&p)?)
                        .position(DMatrix::identity(p.len(), p.len())),
                )
            }
        }
    }

    fn covariance(&self, _x: &dyn State) -> Result<DMatrix<f64>> {
        Ok(self.r.clone())
    }
}

/// Altitude: the third component of a 3-D pose's world-frame position.
///
/// Derived for both perturbation conventions.
#[derive(Debug, Clone)]
pub struct Altitude {
    r: f64,
}

impl Altitude {
    pub fn new(r: f64) -> Result<Self> {
        if r < 0.0 {
            return Err(Error::InvalidParameter(
                "Altitude: variance must be non-negative".into(),
            ));
        }
        Ok(Self { r })
    }

    fn position(&self, x: &MatrixLieGroupState) -> Result<DVector<f64>> {
        let p = x.position()?;
        if p.len() != 3 {
            return Err(Error::UnsupportedGroup {
                op: "altitude",
                group: x.group(),
            });
        }
        Ok(p)
    }
}

impl MeasurementModel for Altitude {
    fn measurement_dim(&self) -> usize {
        1
    }

    fn evaluate(&self, x: &dyn State) -> Result<DVector<f64>> {
        let p = self.position(expect_lie_group(x)?)?;
        Ok(DVector::from_vec(vec![p[2]]))
    }

    fn jacobian(&self, x: &dyn State) -> Result<DMatrix<f64>> {
        let x = expect_lie_group(x)?;
        let p = self.position(x)?;
        match x.direction() {
            Direction::Right => {
                let c = x.attitude();
                x.jacobian_from_blocks(
                    JacobianBlocks::new().position(c.rows(2, 1).into_owned()),
                )
            }
            Direction::Left => {
                let odot_p = x.attitude_group().odot(&p)?;
                x.jacobian_from_blocks(
                    JacobianBlocks::new()
                        .attitude(odot_p.rows(2, 1).into_owned())
                        .position(DMatrix::from_row_slice(1, 3, &[0.0, 0.0, 1.0])),
                )
            }
        }
    }

    fn covariance(&self, _x: &dyn State) -> Result<DMatrix<f64>> {
        Ok(DMatrix::from_element(1, 1, self.r))
    }
}

/// Gravity-direction measurement: the known world-frame gravity vector
/// resolved in the body frame, `y = Cᵀ·g`, as observed by an accelerometer
/// at rest. Requires a 3-D attitude.
///
/// Derived for both perturbation conventions.
#[derive(Debug, Clone)]
pub struct Gravity {
    r: DMatrix<f64>,
    g: DVector<f64>,
}

impl Gravity {
    /// Uses the standard gravity vector `[0, 0, -9.80665]`.
    pub fn new(r: DMatrix<f64>) -> Result<Self> {
        Self::with_gravity_vec(r, DVector::from_vec(vec![0.0, 0.0, -GRAVITY]))
    }

    pub fn with_gravity_vec(r: DMatrix<f64>, gravity_vec: DVector<f64>) -> Result<Self> {
        if r.nrows() != 3 || r.ncols() != 3 {
            return Err(Error::InvalidParameter(
                "Gravity: R must be a 3 x 3 matrix".into(),
            ));
        }
        if gravity_vec.len() != 3 {
            return Err(Error::InvalidParameter(
                "Gravity: gravity vector must be 3-D".into(),
            ));
        }
        Ok(Self { r, g: gravity_vec })
    }

    fn check_attitude(&self, x: &MatrixLieGroupState) -> Result<()> {
        if x.attitude_group() != MatrixLieGroup::SO3 {
            return Err(Error::UnsupportedGroup {
                op: "gravity direction",
                group: x.group(),
            });
        }
        Ok(())
    }
}

impl MeasurementModel for Gravity {
    fn measurement_dim(&self) -> usize {
        3
    }

    fn evaluate(&self, x: &dyn State) -> Result<DVector<f64>> {
        let x = expect_lie_group(x)?;
        self.check_attitude(x)?;
        Ok(x.attitude().transpose() * &self.g)
    }

    fn jacobian(&self, x: &dyn State) -> Result<DMatrix<f64>> {
        let x = expect_lie_group(x)?;
        self.check_attitude(x)?;
        let so3 = MatrixLieGroup::SO3;
        let att = match x.direction() {
            Direction::Right => {
                let body_g = x.attitude().transpose() * &self.g;
                -so3.odot(&body_g)?
            }
            Direction::Left => -(x.attitude().transpose() * so3.odot(&self.g)?),
        };
        x.jacobian_from_blocks(JacobianBlocks::new().attitude(att))
    }

    fn covariance(&self, _x: &dyn State) -> Result<DMatrix<f64>> {
        Ok(self.r.clone())
    }
}
