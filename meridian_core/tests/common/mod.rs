// meridian_core/tests/common/mod.rs
#![allow(dead_code)]

use meridian_core::prelude::*;
use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand::Rng;

pub fn random_vector(rng: &mut StdRng, n: usize) -> DVector<f64> {
    DVector::from_fn(n, |_, _| rng.gen_range(-1.0..1.0))
}

pub fn random_lie_state(
    rng: &mut StdRng,
    group: MatrixLieGroup,
    direction: Direction,
) -> MatrixLieGroupState {
    let xi = random_vector(rng, group.dof());
    MatrixLieGroupState::from_exp(group, &xi, direction)
}

/// Central finite-difference Jacobian of a measurement model, using the
/// state's retraction to perturb and plain subtraction on the output.
pub fn measurement_jacobian_fd<S: State + Clone>(
    model: &dyn MeasurementModel,
    x: &S,
    step: f64,
) -> DMatrix<f64> {
    let n = x.dof();
    let m = model.measurement_dim();
    let mut jac = DMatrix::zeros(m, n);
    for i in 0..n {
        let mut dx = DVector::zeros(n);
        dx[i] = step;
        let mut xp = x.clone();
        xp.plus(&dx).unwrap();
        dx[i] = -step;
        let mut xm = x.clone();
        xm.plus(&dx).unwrap();
        let col = (model.evaluate(&xp).unwrap() - model.evaluate(&xm).unwrap()) / (2.0 * step);
        jac.set_column(i, &col);
    }
    jac
}

/// Central finite-difference Jacobian of a process model: perturb the input
/// state along each tangent direction, propagate, and measure the output
/// difference in the propagated state's tangent space.
pub fn process_jacobian_fd<S: State + Clone>(
    model: &dyn ProcessModel,
    x: &S,
    u: &StampedValue,
    dt: f64,
    step: f64,
) -> DMatrix<f64> {
    let n = x.dof();
    let mut jac = DMatrix::zeros(n, n);
    for i in 0..n {
        let mut dx = DVector::zeros(n);
        dx[i] = step;
        let mut xp = x.clone();
        xp.plus(&dx).unwrap();
        model.evaluate(&mut xp, u, dt).unwrap();
        dx[i] = -step;
        let mut xm = x.clone();
        xm.plus(&dx).unwrap();
        model.evaluate(&mut xm, u, dt).unwrap();
        let col = xp.minus(&xm).unwrap() / (2.0 * step);
        jac.set_column(i, &col);
    }
    jac
}
