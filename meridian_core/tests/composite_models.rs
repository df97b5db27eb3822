// meridian_core/tests/composite_models.rs
//
// Behavioral tests for the composite state/model plumbing and for the
// relative-pose propagation identity.

mod common;

use approx::assert_abs_diff_eq;
use common::{random_lie_state, random_vector};
use meridian_core::prelude::*;
use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn three_part_state(rng: &mut StdRng) -> CompositeState {
    let mut bias1 = VectorState::new(random_vector(rng, 2), None, None);
    bias1.set_state_id(Some(StateId(1)));
    let mut pose = random_lie_state(rng, MatrixLieGroup::SE3, Direction::Right);
    pose.set_state_id(Some(StateId(2)));
    let mut bias2 = VectorState::new(random_vector(rng, 4), None, None);
    bias2.set_state_id(Some(StateId(3)));
    CompositeState::new(
        vec![Box::new(bias1), Box::new(pose), Box::new(bias2)],
        None,
        None,
    )
}

#[test]
fn composite_measurement_scatters_into_target_slice() {
    let mut rng = StdRng::seed_from_u64(200);
    let x = three_part_state(&mut rng);
    let native = GlobalPosition::new(DMatrix::identity(3, 3) * 0.1).unwrap();
    let model = CompositeMeasurementModel::new(Box::new(native.clone()), StateId(2));
    assert_eq!(model.target(), StateId(2));

    let pose = x.get_state_by_id(StateId(2)).unwrap();
    let expected_y = native.evaluate(pose).unwrap();
    assert_abs_diff_eq!(model.evaluate(&x).unwrap(), expected_y, epsilon = 1e-14);

    let jac = model.jacobian(&x).unwrap();
    assert_eq!(jac.shape(), (3, 12));
    // Zero outside the pose's slice, the native Jacobian inside it.
    assert_abs_diff_eq!(
        jac.view((0, 0), (3, 2)).into_owned(),
        DMatrix::zeros(3, 2),
        epsilon = 1e-14
    );
    assert_abs_diff_eq!(
        jac.view((0, 8), (3, 4)).into_owned(),
        DMatrix::zeros(3, 4),
        epsilon = 1e-14
    );
    assert_abs_diff_eq!(
        jac.view((0, 2), (3, 6)).into_owned(),
        native.jacobian(pose).unwrap(),
        epsilon = 1e-14
    );

    assert_abs_diff_eq!(
        model.covariance(&x).unwrap(),
        DMatrix::identity(3, 3) * 0.1,
        epsilon = 1e-14
    );
}

#[test]
fn composite_measurement_reports_missing_target() {
    let mut rng = StdRng::seed_from_u64(201);
    let x = three_part_state(&mut rng);
    let model = CompositeMeasurementModel::new(
        Box::new(GlobalPosition::new(DMatrix::identity(3, 3)).unwrap()),
        StateId(42),
    );
    assert!(matches!(
        model.evaluate(&x),
        Err(Error::StateNotFound(StateId(42)))
    ));
}

#[test]
fn composite_process_propagates_each_substate() {
    let mut rng = StdRng::seed_from_u64(202);
    let pose = random_lie_state(&mut rng, MatrixLieGroup::SE2, Direction::Right);
    let bias = VectorState::new(random_vector(&mut rng, 2), None, None);
    let mut x = CompositeState::new(
        vec![Box::new(pose.clone()), Box::new(bias.clone())],
        None,
        None,
    );

    let pose_model = BodyFrameVelocity::new(DMatrix::identity(3, 3) * 0.01).unwrap();
    let bias_model = SingleIntegrator::new(DMatrix::identity(2, 2) * 0.1).unwrap();
    let model = CompositeProcessModel::new(vec![
        Box::new(pose_model.clone()),
        Box::new(bias_model.clone()),
    ]);

    let u_pose = random_vector(&mut rng, 3);
    let u_bias = random_vector(&mut rng, 2);
    let mut stacked = DVector::zeros(5);
    stacked.rows_mut(0, 3).copy_from(&u_pose);
    stacked.rows_mut(3, 2).copy_from(&u_bias);
    let dt = 0.1;
    model
        .evaluate(&mut x, &StampedValue::new(stacked.clone(), Some(dt)), dt)
        .unwrap();

    let mut expected_pose = pose;
    pose_model
        .evaluate(&mut expected_pose, &StampedValue::new(u_pose, Some(dt)), dt)
        .unwrap();
    let mut expected_bias = bias;
    bias_model
        .evaluate(&mut expected_bias, &StampedValue::new(u_bias, Some(dt)), dt)
        .unwrap();

    let moved_pose = x
        .state(0)
        .unwrap()
        .as_any()
        .downcast_ref::<MatrixLieGroupState>()
        .unwrap();
    assert_abs_diff_eq!(moved_pose.value(), expected_pose.value(), epsilon = 1e-14);
    let moved_bias = x
        .state(1)
        .unwrap()
        .as_any()
        .downcast_ref::<VectorState>()
        .unwrap();
    assert_abs_diff_eq!(moved_bias.value, expected_bias.value, epsilon = 1e-14);
}

#[test]
fn composite_process_covariance_is_block_diagonal() {
    let mut rng = StdRng::seed_from_u64(203);
    let pose = random_lie_state(&mut rng, MatrixLieGroup::SE2, Direction::Right);
    let bias = VectorState::new(random_vector(&mut rng, 2), None, None);
    let x = CompositeState::new(vec![Box::new(pose), Box::new(bias)], None, None);

    let model = CompositeProcessModel::new(vec![
        Box::new(BodyFrameVelocity::new(DMatrix::identity(3, 3) * 0.01).unwrap()),
        Box::new(SingleIntegrator::new(DMatrix::identity(2, 2) * 0.1).unwrap()),
    ]);
    let u = StampedValue::new(random_vector(&mut rng, 5), None);
    let q = model.covariance(&x, &u, 0.1).unwrap();
    assert_eq!(q.shape(), (5, 5));
    assert_abs_diff_eq!(
        q.view((0, 3), (3, 2)).into_owned(),
        DMatrix::zeros(3, 2),
        epsilon = 1e-14
    );
    assert_abs_diff_eq!(
        q.view((3, 0), (2, 3)).into_owned(),
        DMatrix::zeros(2, 3),
        epsilon = 1e-14
    );
}

#[test]
fn composite_process_rejects_arity_mismatch() {
    let mut rng = StdRng::seed_from_u64(204);
    let mut x = three_part_state(&mut rng);
    let model = CompositeProcessModel::new(vec![Box::new(
        SingleIntegrator::new(DMatrix::identity(2, 2)).unwrap(),
    )]);
    let u = StampedValue::new(DVector::zeros(2), None);
    assert!(matches!(
        model.evaluate(&mut x, &u, 0.1),
        Err(Error::IncompatibleStates(_))
    ));
}

// Propagating the relative pose T₁₂ with the stacked-twist model must agree
// exactly with propagating the two absolute poses independently and
// recomputing T₁₂ = T₁⁻¹ T₂.
#[test]
fn relative_propagation_matches_absolute_poses() {
    let mut rng = StdRng::seed_from_u64(205);
    let group = MatrixLieGroup::SE3;
    let t1 = random_lie_state(&mut rng, group, Direction::Right);
    let t2 = random_lie_state(&mut rng, group, Direction::Right);
    let mut relative = MatrixLieGroupState::se3(
        group.inverse(t1.value()) * t2.value(),
        Direction::Right,
    )
    .unwrap();

    let u1 = random_vector(&mut rng, 6);
    let u2 = random_vector(&mut rng, 6);
    let dt = 0.1;

    let model =
        RelativeBodyFrameVelocity::new(DMatrix::identity(6, 6), DMatrix::identity(6, 6)).unwrap();
    let mut stacked = DVector::zeros(12);
    stacked.rows_mut(0, 6).copy_from(&u1);
    stacked.rows_mut(6, 6).copy_from(&u2);
    model
        .evaluate(&mut relative, &StampedValue::new(stacked, Some(dt)), dt)
        .unwrap();

    let single = BodyFrameVelocity::new(DMatrix::identity(6, 6)).unwrap();
    let mut t1_next = t1;
    single
        .evaluate(&mut t1_next, &StampedValue::new(u1, Some(dt)), dt)
        .unwrap();
    let mut t2_next = t2;
    single
        .evaluate(&mut t2_next, &StampedValue::new(u2, Some(dt)), dt)
        .unwrap();

    let expected = group.inverse(t1_next.value()) * t2_next.value();
    assert_abs_diff_eq!(relative.value(), &expected, epsilon = 1e-12);
}
