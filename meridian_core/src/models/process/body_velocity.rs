// meridian_core/src/models/process/body_velocity.rs

use crate::errors::{Error, Result};
use crate::models::{check_input_dim, expect_lie_group, expect_lie_group_mut, ProcessModel};
use crate::states::State;
use crate::types::{Direction, StampedValue};
use nalgebra::{DMatrix, DVector};

/// Rigid-body kinematics driven by body-frame velocity measurements: the
/// input packs the translational and angular velocity twist, resolved in the
/// body frame, and the state evolves as `x ← x ∘ Exp(u·dt)`.
///
/// This is the usual process model for poses on SE(n). Jacobian and
/// covariance are derived for the right perturbation convention only.
#[derive(Debug, Clone)]
pub struct BodyFrameVelocity {
    q: DMatrix<f64>,
}

impl BodyFrameVelocity {
    /// `q` is the covariance of the twist measurement noise, sized
    /// `dof x dof` for the target group.
    pub fn new(q: DMatrix<f64>) -> Result<Self> {
        if !q.is_square() {
            return Err(Error::InvalidParameter(
                "BodyFrameVelocity: Q must be an n x n matrix".into(),
            ));
        }
        Ok(Self { q })
    }

    fn check_state(&self, x: &dyn State) -> Result<()> {
        if x.dof() != self.q.nrows() {
            return Err(Error::DimensionMismatch {
                context: "BodyFrameVelocity: state dof",
                expected: self.q.nrows(),
                actual: x.dof(),
            });
        }
        Ok(())
    }
}

impl ProcessModel for BodyFrameVelocity {
    fn input_dim(&self) -> usize {
        self.q.nrows()
    }

    fn evaluate(&self, x: &mut dyn State, u: &StampedValue, dt: f64) -> Result<()> {
        self.check_state(x)?;
        check_input_dim("BodyFrameVelocity: input", u, self.q.nrows())?;
        let x = expect_lie_group_mut(x)?;
        let group = x.group();
        let next = x.value() * group.exp(&(&u.value * dt));
        x.set_value(next)
    }

    fn jacobian(&self, x: &dyn State, u: &StampedValue, dt: f64) -> Result<DMatrix<f64>> {
        self.check_state(x)?;
        check_input_dim("BodyFrameVelocity: input", u, self.q.nrows())?;
        let x = expect_lie_group(x)?;
        match x.direction() {
            Direction::Right => {
                let group = x.group();
                Ok(group.adjoint(&group.exp(&(&u.value * -dt))))
            }
            direction => Err(Error::UnsupportedDirection {
                model: "BodyFrameVelocity",
                direction,
            }),
        }
    }

    fn covariance(&self, x: &dyn State, u: &StampedValue, dt: f64) -> Result<DMatrix<f64>> {
        self.check_state(x)?;
        check_input_dim("BodyFrameVelocity: input", u, self.q.nrows())?;
        let x = expect_lie_group(x)?;
        match x.direction() {
            Direction::Right => {
                let group = x.group();
                let l = group.left_jacobian(&(&u.value * -dt)) * dt;
                Ok(&l * &self.q * l.transpose())
            }
            direction => Err(Error::UnsupportedDirection {
                model: "BodyFrameVelocity",
                direction,
            }),
        }
    }
}

/// Rigid-body kinematics of a *relative* pose between two frames, each moving
/// with its own body-frame twist. The input stacks the two twists
/// `u = [u₁; u₂]` (own frame first, neighbor frame second) and the state
/// evolves as `x ← Exp(-u₁·dt) ∘ x ∘ Exp(u₂·dt)`.
///
/// Propagating the relative pose this way is algebraically identical to
/// propagating the two absolute poses independently and recomputing their
/// relative transform.
#[derive(Debug, Clone)]
pub struct RelativeBodyFrameVelocity {
    q1: DMatrix<f64>,
    q2: DMatrix<f64>,
}

impl RelativeBodyFrameVelocity {
    pub fn new(q1: DMatrix<f64>, q2: DMatrix<f64>) -> Result<Self> {
        if !q1.is_square() || !q2.is_square() || q1.nrows() != q2.nrows() {
            return Err(Error::InvalidParameter(
                "RelativeBodyFrameVelocity: Q1 and Q2 must be square and equally sized".into(),
            ));
        }
        Ok(Self { q1, q2 })
    }

    fn split(&self, u: &StampedValue) -> Result<(DVector<f64>, DVector<f64>)> {
        let n = self.q1.nrows();
        check_input_dim("RelativeBodyFrameVelocity: input", u, 2 * n)?;
        Ok((
            u.value.rows(0, n).into_owned(),
            u.value.rows(n, n).into_owned(),
        ))
    }

    fn check_state(&self, x: &dyn State) -> Result<()> {
        if x.dof() != self.q1.nrows() {
            return Err(Error::DimensionMismatch {
                context: "RelativeBodyFrameVelocity: state dof",
                expected: self.q1.nrows(),
                actual: x.dof(),
            });
        }
        Ok(())
    }
}

impl ProcessModel for RelativeBodyFrameVelocity {
    fn input_dim(&self) -> usize {
        2 * self.q1.nrows()
    }

    fn evaluate(&self, x: &mut dyn State, u: &StampedValue, dt: f64) -> Result<()> {
        self.check_state(x)?;
        let (u1, u2) = self.split(u)?;
        let x = expect_lie_group_mut(x)?;
        let group = x.group();
        let next = group.exp(&(u1 * -dt)) * x.value() * group.exp(&(u2 * dt));
        x.set_value(next)
    }

    fn jacobian(&self, x: &dyn State, u: &StampedValue, dt: f64) -> Result<DMatrix<f64>> {
        self.check_state(x)?;
        let (_, u2) = self.split(u)?;
        let x = expect_lie_group(x)?;
        match x.direction() {
            Direction::Right => {
                let group = x.group();
                Ok(group.adjoint(&group.exp(&(u2 * -dt))))
            }
            direction => Err(Error::UnsupportedDirection {
                model: "RelativeBodyFrameVelocity",
                direction,
            }),
        }
    }

    fn covariance(&self, x: &dyn State, u: &StampedValue, dt: f64) -> Result<DMatrix<f64>> {
        self.check_state(x)?;
        let (u1, u2) = self.split(u)?;
        let x = expect_lie_group(x)?;
        match x.direction() {
            Direction::Right => {
                let group = x.group();
                // Two independent noise sources, each pushed through its own
                // sensitivity block.
                let l1 = group.adjoint(&(x.value() * group.exp(&(&u2 * dt))))
                    * group.left_jacobian(&(u1 * dt))
                    * dt;
                let l2 = group.left_jacobian(&(u2 * -dt)) * dt;
                Ok(&l1 * &self.q1 * l1.transpose() + &l2 * &self.q2 * l2.transpose())
            }
            direction => Err(Error::UnsupportedDirection {
                model: "RelativeBodyFrameVelocity",
                direction,
            }),
        }
    }
}
