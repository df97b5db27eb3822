// meridian_core/src/lie.rs

use crate::errors::{Error, Result};
use nalgebra::{DMatrix, DVector, Matrix2, Matrix3, Vector2, Vector3};
use serde::{Deserialize, Serialize};

/// Angle threshold below which trigonometric coefficients switch to their
/// Taylor expansions.
const SMALL_ANGLE: f64 = 1e-6;

/// The closed family of matrix Lie groups supported by the library.
///
/// Group elements are stored as dense square matrices in their homogeneous
/// embedding: 2x2 for SO(2), 3x3 for SO(3) and SE(2), 4x4 for SE(3) and 5x5
/// for the extended pose SE_2(3).
///
/// Tangent-space orderings:
/// * SE(2):   `(θ, ρ)` — heading then translation.
/// * SE(3):   `(φ, ρ)` — rotation then translation.
/// * SE_2(3): `(φ, ν, ρ)` — rotation, velocity, translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatrixLieGroup {
    SO2,
    SO3,
    SE2,
    SE3,
    SE23,
}

impl MatrixLieGroup {
    /// Degrees of freedom: the dimension of the tangent space.
    pub fn dof(self) -> usize {
        match self {
            MatrixLieGroup::SO2 => 1,
            MatrixLieGroup::SO3 => 3,
            MatrixLieGroup::SE2 => 3,
            MatrixLieGroup::SE3 => 6,
            MatrixLieGroup::SE23 => 9,
        }
    }

    /// Side length of the square matrix embedding.
    pub fn matrix_dim(self) -> usize {
        match self {
            MatrixLieGroup::SO2 => 2,
            MatrixLieGroup::SO3 => 3,
            MatrixLieGroup::SE2 => 3,
            MatrixLieGroup::SE3 => 4,
            MatrixLieGroup::SE23 => 5,
        }
    }

    /// The rotation subgroup acting on this group's translational blocks.
    pub fn attitude_group(self) -> MatrixLieGroup {
        match self {
            MatrixLieGroup::SO2 | MatrixLieGroup::SE2 => MatrixLieGroup::SO2,
            _ => MatrixLieGroup::SO3,
        }
    }

    /// The identity element.
    pub fn identity(self) -> DMatrix<f64> {
        let n = self.matrix_dim();
        DMatrix::identity(n, n)
    }

    /// Exponential map: tangent vector (length `dof`) to group element.
    pub fn exp(self, xi: &DVector<f64>) -> DMatrix<f64> {
        assert_eq!(xi.len(), self.dof(), "exp: tangent vector length");
        match self {
            MatrixLieGroup::SO2 => dmat2(&rot2(xi[0])),
            MatrixLieGroup::SO3 => dmat3(&so3_exp(&vec3(xi, 0))),
            MatrixLieGroup::SE2 => {
                let theta = xi[0];
                let rho = Vector2::new(xi[1], xi[2]);
                let mut x = DMatrix::identity(3, 3);
                x.fixed_view_mut::<2, 2>(0, 0).copy_from(&rot2(theta));
                x.fixed_view_mut::<2, 1>(0, 2).copy_from(&(so2_v(theta) * rho));
                x
            }
            MatrixLieGroup::SE3 => {
                let phi = vec3(xi, 0);
                let rho = vec3(xi, 3);
                let mut x = DMatrix::identity(4, 4);
                x.fixed_view_mut::<3, 3>(0, 0).copy_from(&so3_exp(&phi));
                x.fixed_view_mut::<3, 1>(0, 3)
                    .copy_from(&(so3_left_jacobian(&phi) * rho));
                x
            }
            MatrixLieGroup::SE23 => {
                let phi = vec3(xi, 0);
                let nu = vec3(xi, 3);
                let rho = vec3(xi, 6);
                let j = so3_left_jacobian(&phi);
                let mut x = DMatrix::identity(5, 5);
                x.fixed_view_mut::<3, 3>(0, 0).copy_from(&so3_exp(&phi));
                x.fixed_view_mut::<3, 1>(0, 3).copy_from(&(&j * nu));
                x.fixed_view_mut::<3, 1>(0, 4).copy_from(&(&j * rho));
                x
            }
        }
    }

    /// Logarithmic map: group element to tangent vector (length `dof`).
    pub fn log(self, x: &DMatrix<f64>) -> DVector<f64> {
        self.check_shape(x);
        match self {
            MatrixLieGroup::SO2 => DVector::from_vec(vec![x[(1, 0)].atan2(x[(0, 0)])]),
            MatrixLieGroup::SO3 => {
                let phi = so3_log(&x.fixed_view::<3, 3>(0, 0).into_owned());
                DVector::from_column_slice(phi.as_slice())
            }
            MatrixLieGroup::SE2 => {
                let theta = x[(1, 0)].atan2(x[(0, 0)]);
                let r = x.fixed_view::<2, 1>(0, 2).into_owned();
                let rho = so2_v_inv(theta) * r;
                DVector::from_vec(vec![theta, rho[0], rho[1]])
            }
            MatrixLieGroup::SE3 => {
                let phi = so3_log(&x.fixed_view::<3, 3>(0, 0).into_owned());
                let j_inv = so3_left_jacobian_inv(&phi);
                let rho = j_inv * x.fixed_view::<3, 1>(0, 3).into_owned();
                let mut xi = DVector::zeros(6);
                xi.fixed_rows_mut::<3>(0).copy_from(&phi);
                xi.fixed_rows_mut::<3>(3).copy_from(&rho);
                xi
            }
            MatrixLieGroup::SE23 => {
                let phi = so3_log(&x.fixed_view::<3, 3>(0, 0).into_owned());
                let j_inv = so3_left_jacobian_inv(&phi);
                let nu = &j_inv * x.fixed_view::<3, 1>(0, 3).into_owned();
                let rho = &j_inv * x.fixed_view::<3, 1>(0, 4).into_owned();
                let mut xi = DVector::zeros(9);
                xi.fixed_rows_mut::<3>(0).copy_from(&phi);
                xi.fixed_rows_mut::<3>(3).copy_from(&nu);
                xi.fixed_rows_mut::<3>(6).copy_from(&rho);
                xi
            }
        }
    }

    /// Group inverse. Uses the block structure of the homogeneous embedding
    /// rather than a generic matrix inverse.
    pub fn inverse(self, x: &DMatrix<f64>) -> DMatrix<f64> {
        self.check_shape(x);
        match self {
            MatrixLieGroup::SO2 | MatrixLieGroup::SO3 => x.transpose(),
            MatrixLieGroup::SE2 => {
                let c_t = x.fixed_view::<2, 2>(0, 0).transpose();
                let r = x.fixed_view::<2, 1>(0, 2).into_owned();
                let mut inv = DMatrix::identity(3, 3);
                inv.fixed_view_mut::<2, 2>(0, 0).copy_from(&c_t);
                inv.fixed_view_mut::<2, 1>(0, 2).copy_from(&(-&c_t * r));
                inv
            }
            MatrixLieGroup::SE3 => {
                let c_t = x.fixed_view::<3, 3>(0, 0).transpose();
                let r = x.fixed_view::<3, 1>(0, 3).into_owned();
                let mut inv = DMatrix::identity(4, 4);
                inv.fixed_view_mut::<3, 3>(0, 0).copy_from(&c_t);
                inv.fixed_view_mut::<3, 1>(0, 3).copy_from(&(-&c_t * r));
                inv
            }
            MatrixLieGroup::SE23 => {
                let c_t = x.fixed_view::<3, 3>(0, 0).transpose();
                let v = x.fixed_view::<3, 1>(0, 3).into_owned();
                let r = x.fixed_view::<3, 1>(0, 4).into_owned();
                let mut inv = DMatrix::identity(5, 5);
                inv.fixed_view_mut::<3, 3>(0, 0).copy_from(&c_t);
                inv.fixed_view_mut::<3, 1>(0, 3).copy_from(&(-&c_t * v));
                inv.fixed_view_mut::<3, 1>(0, 4).copy_from(&(-&c_t * r));
                inv
            }
        }
    }

    /// Adjoint representation of a group element: the `dof x dof` linear map
    /// transporting tangent vectors between the two perturbation conventions,
    /// `x ∘ Exp(ξ) = Exp(Ad_x ξ) ∘ x`.
    pub fn adjoint(self, x: &DMatrix<f64>) -> DMatrix<f64> {
        self.check_shape(x);
        match self {
            MatrixLieGroup::SO2 => DMatrix::identity(1, 1),
            MatrixLieGroup::SO3 => x.clone(),
            MatrixLieGroup::SE2 => {
                let c = x.fixed_view::<2, 2>(0, 0).into_owned();
                let r = x.fixed_view::<2, 1>(0, 2).into_owned();
                let mut ad = DMatrix::zeros(3, 3);
                ad[(0, 0)] = 1.0;
                // -S r, with S the SO(2) generator.
                ad[(1, 0)] = r[1];
                ad[(2, 0)] = -r[0];
                ad.fixed_view_mut::<2, 2>(1, 1).copy_from(&c);
                ad
            }
            MatrixLieGroup::SE3 => {
                let c = x.fixed_view::<3, 3>(0, 0).into_owned();
                let r = x.fixed_view::<3, 1>(0, 3).into_owned();
                let mut ad = DMatrix::zeros(6, 6);
                ad.fixed_view_mut::<3, 3>(0, 0).copy_from(&c);
                ad.fixed_view_mut::<3, 3>(3, 0).copy_from(&(skew3(&r) * &c));
                ad.fixed_view_mut::<3, 3>(3, 3).copy_from(&c);
                ad
            }
            MatrixLieGroup::SE23 => {
                let c = x.fixed_view::<3, 3>(0, 0).into_owned();
                let v = x.fixed_view::<3, 1>(0, 3).into_owned();
                let r = x.fixed_view::<3, 1>(0, 4).into_owned();
                let mut ad = DMatrix::zeros(9, 9);
                ad.fixed_view_mut::<3, 3>(0, 0).copy_from(&c);
                ad.fixed_view_mut::<3, 3>(3, 0).copy_from(&(skew3(&v) * &c));
                ad.fixed_view_mut::<3, 3>(3, 3).copy_from(&c);
                ad.fixed_view_mut::<3, 3>(6, 0).copy_from(&(skew3(&r) * &c));
                ad.fixed_view_mut::<3, 3>(6, 6).copy_from(&c);
                ad
            }
        }
    }

    /// Left Jacobian of the exponential map, `J_l(ξ) = ∫ Ad(Exp(sξ)) ds`.
    pub fn left_jacobian(self, xi: &DVector<f64>) -> DMatrix<f64> {
        assert_eq!(xi.len(), self.dof(), "left_jacobian: tangent vector length");
        match self {
            MatrixLieGroup::SO2 => DMatrix::identity(1, 1),
            MatrixLieGroup::SO3 => dmat3(&so3_left_jacobian(&vec3(xi, 0))),
            MatrixLieGroup::SE2 => {
                let theta = xi[0];
                let rho = Vector2::new(xi[1], xi[2]);
                let theta2 = theta * theta;
                let (alpha, beta) = if theta.abs() < SMALL_ANGLE {
                    (0.5 - theta2 / 24.0, theta / 6.0 - theta * theta2 / 120.0)
                } else {
                    ((1.0 - theta.cos()) / theta2, (theta - theta.sin()) / theta2)
                };
                // Integral of s * V(sθ) over [0, 1], applied to ρ.
                let s = so2_gen();
                let b = -s * (Matrix2::identity() * alpha + s * beta) * rho;
                let mut jac = DMatrix::zeros(3, 3);
                jac[(0, 0)] = 1.0;
                jac[(1, 0)] = b[0];
                jac[(2, 0)] = b[1];
                jac.fixed_view_mut::<2, 2>(1, 1).copy_from(&so2_v(theta));
                jac
            }
            MatrixLieGroup::SE3 => {
                let phi = vec3(xi, 0);
                let rho = vec3(xi, 3);
                let j = so3_left_jacobian(&phi);
                let mut jac = DMatrix::zeros(6, 6);
                jac.fixed_view_mut::<3, 3>(0, 0).copy_from(&j);
                jac.fixed_view_mut::<3, 3>(3, 0).copy_from(&se3_q(&rho, &phi));
                jac.fixed_view_mut::<3, 3>(3, 3).copy_from(&j);
                jac
            }
            MatrixLieGroup::SE23 => {
                let phi = vec3(xi, 0);
                let nu = vec3(xi, 3);
                let rho = vec3(xi, 6);
                let j = so3_left_jacobian(&phi);
                let mut jac = DMatrix::zeros(9, 9);
                jac.fixed_view_mut::<3, 3>(0, 0).copy_from(&j);
                jac.fixed_view_mut::<3, 3>(3, 0).copy_from(&se3_q(&nu, &phi));
                jac.fixed_view_mut::<3, 3>(3, 3).copy_from(&j);
                jac.fixed_view_mut::<3, 3>(6, 0).copy_from(&se3_q(&rho, &phi));
                jac.fixed_view_mut::<3, 3>(6, 6).copy_from(&j);
                jac
            }
        }
    }

    /// Generator ("odot") operator of the rotation groups: the linear map
    /// satisfying `ξ^ b = odot(b) ξ` for a fixed vector `b`, i.e. the Jacobian
    /// of the group action on `b` with respect to a tangent perturbation.
    ///
    /// Only defined for SO(2) (2x1) and SO(3) (3x3).
    pub fn odot(self, b: &DVector<f64>) -> Result<DMatrix<f64>> {
        match self {
            MatrixLieGroup::SO2 => {
                if b.len() != 2 {
                    return Err(Error::DimensionMismatch {
                        context: "SO2 odot",
                        expected: 2,
                        actual: b.len(),
                    });
                }
                Ok(DMatrix::from_column_slice(2, 1, &[-b[1], b[0]]))
            }
            MatrixLieGroup::SO3 => {
                if b.len() != 3 {
                    return Err(Error::DimensionMismatch {
                        context: "SO3 odot",
                        expected: 3,
                        actual: b.len(),
                    });
                }
                Ok(dmat3(&(-skew3(&vec3(b, 0)))))
            }
            group => Err(Error::UnsupportedGroup { op: "odot", group }),
        }
    }

    fn check_shape(self, x: &DMatrix<f64>) {
        let n = self.matrix_dim();
        assert_eq!((x.nrows(), x.ncols()), (n, n), "group element shape");
    }
}

// --- Fixed-size helpers ---

fn vec3(v: &DVector<f64>, start: usize) -> Vector3<f64> {
    Vector3::new(v[start], v[start + 1], v[start + 2])
}

fn dmat2(m: &Matrix2<f64>) -> DMatrix<f64> {
    DMatrix::from_column_slice(2, 2, m.as_slice())
}

fn dmat3(m: &Matrix3<f64>) -> DMatrix<f64> {
    DMatrix::from_column_slice(3, 3, m.as_slice())
}

/// The SO(2) generator `S = [[0, -1], [1, 0]]`.
fn so2_gen() -> Matrix2<f64> {
    Matrix2::new(0.0, -1.0, 1.0, 0.0)
}

fn rot2(theta: f64) -> Matrix2<f64> {
    let (s, c) = theta.sin_cos();
    Matrix2::new(c, -s, s, c)
}

pub(crate) fn skew3(v: &Vector3<f64>) -> Matrix3<f64> {
    Matrix3::new(0.0, -v[2], v[1], v[2], 0.0, -v[0], -v[1], v[0], 0.0)
}

fn so3_exp(phi: &Vector3<f64>) -> Matrix3<f64> {
    let theta = phi.norm();
    let px = skew3(phi);
    if theta < SMALL_ANGLE {
        Matrix3::identity() + px + px * px * 0.5
    } else {
        let theta2 = theta * theta;
        Matrix3::identity() + px * (theta.sin() / theta) + px * px * ((1.0 - theta.cos()) / theta2)
    }
}

fn so3_log(c: &Matrix3<f64>) -> Vector3<f64> {
    let cos_theta = ((c.trace() - 1.0) * 0.5).clamp(-1.0, 1.0);
    let theta = cos_theta.acos();
    let vee = Vector3::new(
        c[(2, 1)] - c[(1, 2)],
        c[(0, 2)] - c[(2, 0)],
        c[(1, 0)] - c[(0, 1)],
    );
    if theta < SMALL_ANGLE {
        vee * 0.5
    } else if std::f64::consts::PI - theta < 1e-9 {
        // Near π the skew part vanishes; recover the axis from the diagonal.
        // Either sign of the axis is a valid logarithm here.
        let mut axis = Vector3::new(
            ((c[(0, 0)] + 1.0) * 0.5).max(0.0).sqrt(),
            ((c[(1, 1)] + 1.0) * 0.5).max(0.0).sqrt(),
            ((c[(2, 2)] + 1.0) * 0.5).max(0.0).sqrt(),
        );
        if axis[0] >= axis[1] && axis[0] >= axis[2] {
            axis[1] = axis[1].copysign(c[(0, 1)]);
            axis[2] = axis[2].copysign(c[(0, 2)]);
        } else if axis[1] >= axis[2] {
            axis[0] = axis[0].copysign(c[(0, 1)]);
            axis[2] = axis[2].copysign(c[(1, 2)]);
        } else {
            axis[0] = axis[0].copysign(c[(0, 2)]);
            axis[1] = axis[1].copysign(c[(1, 2)]);
        }
        axis.normalize() * theta
    } else {
        vee * (theta / (2.0 * theta.sin()))
    }
}

fn so3_left_jacobian(phi: &Vector3<f64>) -> Matrix3<f64> {
    let theta = phi.norm();
    let px = skew3(phi);
    let theta2 = theta * theta;
    let (c1, c2) = if theta < SMALL_ANGLE {
        (0.5 - theta2 / 24.0, 1.0 / 6.0 - theta2 / 120.0)
    } else {
        (
            (1.0 - theta.cos()) / theta2,
            (theta - theta.sin()) / (theta2 * theta),
        )
    };
    Matrix3::identity() + px * c1 + px * px * c2
}

fn so3_left_jacobian_inv(phi: &Vector3<f64>) -> Matrix3<f64> {
    let theta = phi.norm();
    let px = skew3(phi);
    let c = if theta < SMALL_ANGLE {
        1.0 / 12.0 + theta * theta / 720.0
    } else {
        1.0 / (theta * theta) - (1.0 + theta.cos()) / (2.0 * theta * theta.sin())
    };
    Matrix3::identity() - px * 0.5 + px * px * c
}

/// Left Jacobian of SO(2) applied to translations: `V(θ) = ∫ R(sθ) ds`.
fn so2_v(theta: f64) -> Matrix2<f64> {
    let (a, b) = if theta.abs() < SMALL_ANGLE {
        let theta2 = theta * theta;
        (1.0 - theta2 / 6.0, theta / 2.0 - theta * theta2 / 24.0)
    } else {
        (theta.sin() / theta, (1.0 - theta.cos()) / theta)
    };
    Matrix2::identity() * a + so2_gen() * b
}

fn so2_v_inv(theta: f64) -> Matrix2<f64> {
    let v = so2_v(theta);
    // V = aI + bS has inverse (aI - bS) / (a² + b²).
    let a = v[(0, 0)];
    let b = v[(1, 0)];
    (Matrix2::identity() * a - so2_gen() * b) / (a * a + b * b)
}

/// The Q block of the SE(3)-family left Jacobian (Barfoot, "State Estimation
/// for Robotics", eq. 7.86b).
fn se3_q(rho: &Vector3<f64>, phi: &Vector3<f64>) -> Matrix3<f64> {
    let rx = skew3(rho);
    let px = skew3(phi);
    let theta = phi.norm();
    let theta2 = theta * theta;
    let (m1, m2, m3) = if theta < SMALL_ANGLE {
        (
            1.0 / 6.0 - theta2 / 120.0,
            -1.0 / 24.0 + theta2 / 720.0,
            -1.0 / 120.0 + theta2 / 5040.0,
        )
    } else {
        let t3 = theta2 * theta;
        let t4 = theta2 * theta2;
        let t5 = t4 * theta;
        let (s, c) = theta.sin_cos();
        (
            (theta - s) / t3,
            (1.0 - theta2 / 2.0 - c) / t4,
            (theta - s - t3 / 6.0) / t5,
        )
    };
    rx * 0.5
        + (px * rx + rx * px + px * rx * px) * m1
        - (px * px * rx + rx * px * px - px * rx * px * 3.0) * m2
        - (px * rx * px * px + px * px * rx * px) * (0.5 * (m2 - 3.0 * m3))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const GROUPS: [MatrixLieGroup; 5] = [
        MatrixLieGroup::SO2,
        MatrixLieGroup::SO3,
        MatrixLieGroup::SE2,
        MatrixLieGroup::SE3,
        MatrixLieGroup::SE23,
    ];

    fn random_tangent(rng: &mut StdRng, dof: usize) -> DVector<f64> {
        DVector::from_fn(dof, |_, _| rng.gen_range(-1.0..1.0))
    }

    #[test]
    fn exp_log_round_trip() {
        let mut rng = StdRng::seed_from_u64(1);
        for group in GROUPS {
            for _ in 0..20 {
                let xi = random_tangent(&mut rng, group.dof());
                let x = group.exp(&xi);
                assert_abs_diff_eq!(group.log(&x), xi, epsilon = 1e-10);
            }
        }
    }

    #[test]
    fn inverse_composes_to_identity() {
        let mut rng = StdRng::seed_from_u64(2);
        for group in GROUPS {
            let x = group.exp(&random_tangent(&mut rng, group.dof()));
            assert_abs_diff_eq!(group.inverse(&x) * &x, group.identity(), epsilon = 1e-12);
        }
    }

    #[test]
    fn adjoint_matches_conjugation() {
        // x Exp(ξ) x⁻¹ = Exp(Ad_x ξ)
        let mut rng = StdRng::seed_from_u64(3);
        for group in GROUPS {
            let x = group.exp(&random_tangent(&mut rng, group.dof()));
            let xi = random_tangent(&mut rng, group.dof()) * 0.3;
            let lhs = &x * group.exp(&xi) * group.inverse(&x);
            let rhs = group.exp(&(group.adjoint(&x) * &xi));
            assert_abs_diff_eq!(lhs, rhs, epsilon = 1e-9);
        }
    }

    #[test]
    fn left_jacobian_matches_finite_difference() {
        // J_l(ξ) δ ≈ Log(Exp(ξ + εδ) Exp(ξ)⁻¹) / ε
        let mut rng = StdRng::seed_from_u64(4);
        let eps = 1e-6;
        for group in GROUPS {
            let dof = group.dof();
            let xi = random_tangent(&mut rng, dof);
            let jac = group.left_jacobian(&xi);
            let x_inv = group.inverse(&group.exp(&xi));
            for i in 0..dof {
                let mut xi_pert = xi.clone();
                xi_pert[i] += eps;
                let col = group.log(&(group.exp(&xi_pert) * &x_inv)) / eps;
                assert_abs_diff_eq!(jac.column(i).into_owned(), col, epsilon = 1e-5);
            }
        }
    }

    #[test]
    fn odot_is_action_derivative() {
        // d/dε [Exp(ε ξ) b] at ε = 0 equals odot(b) ξ.
        let mut rng = StdRng::seed_from_u64(5);
        let eps = 1e-7;
        for group in [MatrixLieGroup::SO2, MatrixLieGroup::SO3] {
            let n = group.matrix_dim();
            let b = DVector::from_fn(n, |_, _| rng.gen_range(-1.0..1.0));
            let xi = random_tangent(&mut rng, group.dof());
            let plus = group.exp(&(&xi * eps)) * &b;
            let minus = group.exp(&(&xi * -eps)) * &b;
            let fd = (plus - minus) / (2.0 * eps);
            let analytic = group.odot(&b).unwrap() * &xi;
            assert_abs_diff_eq!(fd, analytic, epsilon = 1e-6);
        }
    }

    #[test]
    fn odot_rejects_pose_groups() {
        let b = DVector::zeros(3);
        assert!(matches!(
            MatrixLieGroup::SE3.odot(&b),
            Err(Error::UnsupportedGroup { .. })
        ));
    }

    #[test]
    fn so3_log_handles_half_turn() {
        let phi = Vector3::new(0.0, 0.0, std::f64::consts::PI);
        let xi = DVector::from_column_slice(phi.as_slice());
        let c = MatrixLieGroup::SO3.exp(&xi);
        let back = MatrixLieGroup::SO3.log(&c);
        // A half turn has two valid logarithms; compare the rotations.
        assert_abs_diff_eq!(MatrixLieGroup::SO3.exp(&back), c, epsilon = 1e-9);
    }
}
