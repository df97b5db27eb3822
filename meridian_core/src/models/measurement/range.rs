// meridian_core/src/models/measurement/range.rs

use crate::errors::{Error, Result};
use crate::models::measurement::{row, CompositeMeasurementModel};
use crate::models::{expect_composite, expect_lie_group, expect_vector, MeasurementModel};
use crate::states::{JacobianBlocks, MatrixLieGroupState, State};
use crate::types::{Direction, StateId};
use nalgebra::{DMatrix, DVector};
use std::collections::HashMap;

fn check_variance(model: &'static str, r: f64) -> Result<()> {
    if r < 0.0 {
        return Err(Error::InvalidParameter(format!(
            "{model}: variance must be non-negative"
        )));
    }
    Ok(())
}

/// Range (Euclidean distance) from a point state to a fixed anchor point.
#[derive(Debug, Clone)]
pub struct RangePointToAnchor {
    anchor: DVector<f64>,
    r: f64,
}

impl RangePointToAnchor {
    pub fn new(anchor: DVector<f64>, r: f64) -> Result<Self> {
        check_variance("RangePointToAnchor", r)?;
        Ok(Self { anchor, r })
    }
}

impl MeasurementModel for RangePointToAnchor {
    fn measurement_dim(&self) -> usize {
        1
    }

    fn evaluate(&self, x: &dyn State) -> Result<DVector<f64>> {
        let x = expect_vector(x)?;
        if x.value.len() != self.anchor.len() {
            return Err(Error::DimensionMismatch {
                context: "RangePointToAnchor: state dof",
                expected: self.anchor.len(),
                actual: x.value.len(),
            });
        }
        Ok(DVector::from_vec(vec![(&self.anchor - &x.value).norm()]))
    }

    fn jacobian(&self, x: &dyn State) -> Result<DMatrix<f64>> {
        let y = self.evaluate(x)?[0];
        let x = expect_vector(x)?;
        // The unit line-of-sight vector from the anchor to the point.
        let los = (&x.value - &self.anchor) / y;
        Ok(row(&los))
    }

    fn covariance(&self, _x: &dyn State) -> Result<DMatrix<f64>> {
        Ok(DMatrix::from_element(1, 1, self.r))
    }
}

/// Range from a body-fixed tag on a pose state to a fixed anchor point. The
/// tag is offset from the pose origin by a fixed body-frame vector.
///
/// Only the right perturbation convention is implemented.
#[derive(Debug, Clone)]
pub struct RangePoseToAnchor {
    anchor: DVector<f64>,
    tag: DVector<f64>,
    r: f64,
}

impl RangePoseToAnchor {
    pub fn new(anchor: DVector<f64>, tag_body_position: DVector<f64>, r: f64) -> Result<Self> {
        check_variance("RangePoseToAnchor", r)?;
        if anchor.len() != tag_body_position.len() || !(2..=3).contains(&anchor.len()) {
            return Err(Error::InvalidParameter(
                "RangePoseToAnchor: anchor and tag must both be 2-D or 3-D".into(),
            ));
        }
        Ok(Self {
            anchor,
            tag: tag_body_position,
            r,
        })
    }

    /// World-frame position of the tag.
    fn tag_position(&self, x: &MatrixLieGroupState) -> Result<DVector<f64>> {
        let p = x.position()?;
        if p.len() != self.anchor.len() {
            return Err(Error::DimensionMismatch {
                context: "RangePoseToAnchor: position dimension",
                expected: self.anchor.len(),
                actual: p.len(),
            });
        }
        Ok(x.attitude() * &self.tag + p)
    }
}

impl MeasurementModel for RangePoseToAnchor {
    fn measurement_dim(&self) -> usize {
        1
    }

    fn evaluate(&self, x: &dyn State) -> Result<DVector<f64>> {
        let x = expect_lie_group(x)?;
        let r_tc = self.tag_position(x)? - &self.anchor;
        Ok(DVector::from_vec(vec![r_tc.norm()]))
    }

    fn jacobian(&self, x: &dyn State) -> Result<DMatrix<f64>> {
        let x = expect_lie_group(x)?;
        match x.direction() {
            Direction::Right => {
                let r_tc = self.tag_position(x)? - &self.anchor;
                let rho = row(&(&r_tc / r_tc.norm()));
                let c = x.attitude();
                let att = &rho * &c * x.attitude_group().odot(&self.tag)?;
                let pos = &rho * &c;
                x.jacobian_from_blocks(JacobianBlocks::new().attitude(att).position(pos))
            }
            direction => Err(Error::UnsupportedDirection {
                model: "RangePoseToAnchor",
                direction,
            }),
        }
    }

    fn covariance(&self, _x: &dyn State) -> Result<DMatrix<f64>> {
        Ok(DMatrix::from_element(1, 1, self.r))
    }
}

/// Range between two body-fixed tags carried by two independently-posed
/// rigid bodies living inside one composite state.
///
/// Only the right perturbation convention is implemented.
#[derive(Debug, Clone)]
pub struct RangePoseToPose {
    tag1: DVector<f64>,
    tag2: DVector<f64>,
    id1: StateId,
    id2: StateId,
    r: f64,
}

impl RangePoseToPose {
    pub fn new(
        tag_body_position1: DVector<f64>,
        tag_body_position2: DVector<f64>,
        state_id1: StateId,
        state_id2: StateId,
        r: f64,
    ) -> Result<Self> {
        check_variance("RangePoseToPose", r)?;
        if tag_body_position1.len() != tag_body_position2.len()
            || !(2..=3).contains(&tag_body_position1.len())
        {
            return Err(Error::InvalidParameter(
                "RangePoseToPose: tags must both be 2-D or 3-D".into(),
            ));
        }
        Ok(Self {
            tag1: tag_body_position1,
            tag2: tag_body_position2,
            id1: state_id1,
            id2: state_id2,
            r,
        })
    }

    fn poses<'a>(
        &self,
        x: &'a dyn State,
    ) -> Result<(&'a MatrixLieGroupState, &'a MatrixLieGroupState)> {
        let x = expect_composite(x)?;
        let x1 = expect_lie_group(x.get_state_by_id(self.id1)?)?;
        let x2 = expect_lie_group(x.get_state_by_id(self.id2)?)?;
        Ok((x1, x2))
    }

    /// World-frame vector from tag 2 to tag 1.
    fn tag_separation(
        &self,
        x1: &MatrixLieGroupState,
        x2: &MatrixLieGroupState,
    ) -> Result<DVector<f64>> {
        let t1 = x1.attitude() * &self.tag1 + x1.position()?;
        let t2 = x2.attitude() * &self.tag2 + x2.position()?;
        Ok(t1 - t2)
    }
}

impl MeasurementModel for RangePoseToPose {
    fn measurement_dim(&self) -> usize {
        1
    }

    fn evaluate(&self, x: &dyn State) -> Result<DVector<f64>> {
        let (x1, x2) = self.poses(x)?;
        Ok(DVector::from_vec(vec![self.tag_separation(x1, x2)?.norm()]))
    }

    fn jacobian(&self, x: &dyn State) -> Result<DMatrix<f64>> {
        let (x1, x2) = self.poses(x)?;
        if x1.direction() != Direction::Right || x2.direction() != Direction::Right {
            return Err(Error::UnsupportedDirection {
                model: "RangePoseToPose",
                direction: Direction::Left,
            });
        }
        let sep = self.tag_separation(x1, x2)?;
        let rho = row(&(&sep / sep.norm()));
        let c1 = x1.attitude();
        let c2 = x2.attitude();
        let jac1 = x1.jacobian_from_blocks(
            JacobianBlocks::new()
                .attitude(&rho * &c1 * x1.attitude_group().odot(&self.tag1)?)
                .position(&rho * &c1),
        )?;
        let jac2 = x2.jacobian_from_blocks(
            JacobianBlocks::new()
                .attitude(-(&rho * &c2 * x2.attitude_group().odot(&self.tag2)?))
                .position(-(&rho * &c2)),
        )?;
        let composite = expect_composite(x)?;
        let mut blocks = HashMap::new();
        blocks.insert(self.id1, jac1);
        blocks.insert(self.id2, jac2);
        composite.jacobian_from_blocks(&blocks)
    }

    fn covariance(&self, _x: &dyn State) -> Result<DMatrix<f64>> {
        Ok(DMatrix::from_element(1, 1, self.r))
    }
}

/// Range from a body-fixed tag to a tag on another body whose pose is
/// tracked *relative* to the current one: the relative pose sub-state plays
/// the role of the neighbor, and the own tag plays the role of the anchor.
#[derive(Debug, Clone)]
pub struct RangeRelativePose {
    inner: CompositeMeasurementModel,
}

impl RangeRelativePose {
    pub fn new(
        tag_body_position: DVector<f64>,
        nb_tag_body_position: DVector<f64>,
        nb_state_id: StateId,
        r: f64,
    ) -> Result<Self> {
        let model = RangePoseToAnchor::new(tag_body_position, nb_tag_body_position, r)?;
        Ok(Self {
            inner: CompositeMeasurementModel::new(Box::new(model), nb_state_id),
        })
    }
}

impl MeasurementModel for RangeRelativePose {
    fn measurement_dim(&self) -> usize {
        self.inner.measurement_dim()
    }

    fn evaluate(&self, x: &dyn State) -> Result<DVector<f64>> {
        self.inner.evaluate(x)
    }

    fn jacobian(&self, x: &dyn State) -> Result<DMatrix<f64>> {
        self.inner.jacobian(x)
    }

    fn covariance(&self, x: &dyn State) -> Result<DMatrix<f64>> {
        self.inner.covariance(x)
    }
}
