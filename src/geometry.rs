//! Rigid transforms and Euler angle conventions.
//!
//! Two conventions meet here:
//!
//! - the `szyz` static-frame Euler decomposition used by the row mapper
//!   ([`euler_matrix_szyz`], [`euler_from_matrix_szyz`]), angles in radians;
//! - the ZYZ rot/tilt/psi convention of STAR tables
//!   ([`euler_to_matrix`], [`matrix_to_euler`]), angles in degrees, used when
//!   turning engine pose vectors into table angles.

use nalgebra::{Matrix3, Matrix4, Rotation3, Vector3};

const EPS4: f64 = f64::EPSILON * 4.0;
const FLT_EPSILON: f64 = f32::EPSILON as f64;

/// A 4×4 homogeneous rigid transform
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    matrix: Matrix4<f64>,
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform {
    /// Identity transform
    pub fn identity() -> Self {
        Self {
            matrix: Matrix4::identity(),
        }
    }

    /// Wrap a homogeneous matrix
    pub fn from_matrix(matrix: Matrix4<f64>) -> Self {
        Self { matrix }
    }

    /// Build from a rotation and a translation
    pub fn from_parts(rotation: &Matrix3<f64>, translation: &Vector3<f64>) -> Self {
        let mut matrix = Matrix4::identity();
        matrix.fixed_view_mut::<3, 3>(0, 0).copy_from(rotation);
        matrix.fixed_view_mut::<3, 1>(0, 3).copy_from(translation);
        Self { matrix }
    }

    /// Homogeneous matrix
    pub fn matrix(&self) -> &Matrix4<f64> {
        &self.matrix
    }

    /// Upper-left 3×3 block
    pub fn rotation(&self) -> Matrix3<f64> {
        self.matrix.fixed_view::<3, 3>(0, 0).into_owned()
    }

    /// Translation column
    pub fn translation(&self) -> Vector3<f64> {
        self.matrix.fixed_view::<3, 1>(0, 3).into_owned()
    }

    /// Replace the translation column
    pub fn set_translation(&mut self, translation: &Vector3<f64>) {
        self.matrix.fixed_view_mut::<3, 1>(0, 3).copy_from(translation);
    }

    /// Inverse transform, `None` when the matrix is singular
    pub fn inverse(&self) -> Option<Transform> {
        self.matrix.try_inverse().map(Transform::from_matrix)
    }

    /// Whether the in-plane 2×2 block mirrors the image
    pub fn is_flipped_2d(&self) -> bool {
        let m = &self.matrix;
        m[(0, 0)] * m[(1, 1)] - m[(0, 1)] * m[(1, 0)] < 0.0
    }
}

/// Rotation matrix for static-frame `szyz` Euler angles (radians)
pub fn euler_matrix_szyz(ai: f64, aj: f64, ak: f64) -> Matrix3<f64> {
    // first axis z, odd parity, repeated: (i, j, k) = (2, 1, 0)
    let (i, j, k) = (2, 1, 0);
    let (ai, aj, ak) = (-ai, -aj, -ak);
    let (si, sj, sk) = (ai.sin(), aj.sin(), ak.sin());
    let (ci, cj, ck) = (ai.cos(), aj.cos(), ak.cos());
    let (cc, cs) = (ci * ck, ci * sk);
    let (sc, ss) = (si * ck, si * sk);

    let mut m = Matrix3::zeros();
    m[(i, i)] = cj;
    m[(i, j)] = sj * si;
    m[(i, k)] = sj * ci;
    m[(j, i)] = sj * sk;
    m[(j, j)] = -cj * ss + cc;
    m[(j, k)] = -cj * cs - sc;
    m[(k, i)] = -sj * ck;
    m[(k, j)] = cj * sc + cs;
    m[(k, k)] = cj * cc - ss;
    m
}

/// Static-frame `szyz` Euler angles (radians) of a rotation matrix
pub fn euler_from_matrix_szyz(m: &Matrix3<f64>) -> [f64; 3] {
    let (i, j, k) = (2, 1, 0);
    let sy = (m[(i, j)].powi(2) + m[(i, k)].powi(2)).sqrt();
    let (ax, ay, az) = if sy > EPS4 {
        (
            m[(i, j)].atan2(m[(i, k)]),
            sy.atan2(m[(i, i)]),
            m[(j, i)].atan2(-m[(k, i)]),
        )
    } else {
        ((-m[(j, k)]).atan2(m[(j, j)]), sy.atan2(m[(i, i)]), 0.0)
    };
    [-ax, -ay, -az]
}

/// Decompose a transform into shifts and negated `szyz` angles in degrees.
///
/// A projection transform is inverted first and its shifts negated.
/// Returns `None` when a projection transform is singular.
pub fn geometry_from_matrix(
    transform: &Transform,
    projection: bool,
) -> Option<(Vector3<f64>, [f64; 3])> {
    let (matrix, shifts) = if projection {
        let inverse = transform.inverse()?;
        let shifts = -inverse.translation();
        (inverse, shifts)
    } else {
        (*transform, transform.translation())
    };
    let radians = euler_from_matrix_szyz(&matrix.rotation());
    let angles = radians.map(|a| -a.to_degrees());
    Some((shifts, angles))
}

/// Inverse of [`geometry_from_matrix`]
pub fn matrix_from_geometry(
    shifts: &Vector3<f64>,
    angles: &[f64; 3],
    projection: bool,
) -> Option<Transform> {
    let radians = angles.map(|a| -a.to_radians());
    let rotation = euler_matrix_szyz(radians[0], radians[1], radians[2]);
    if projection {
        Transform::from_parts(&rotation, &-shifts).inverse()
    } else {
        Some(Transform::from_parts(&rotation, shifts))
    }
}

/// Rotation matrix for ZYZ rot/tilt/psi angles in degrees
pub fn euler_to_matrix(rot: f64, tilt: f64, psi: f64) -> Matrix3<f64> {
    let (sa, ca) = rot.to_radians().sin_cos();
    let (sb, cb) = tilt.to_radians().sin_cos();
    let (sg, cg) = psi.to_radians().sin_cos();
    let (cc, cs) = (cb * ca, cb * sa);
    let (sc, ss) = (sb * ca, sb * sa);

    Matrix3::new(
        cg * cc - sg * sa,
        cg * cs + sg * ca,
        -cg * sb,
        -sg * cc - cg * sa,
        -sg * cs + cg * ca,
        sg * sb,
        sc,
        ss,
        cb,
    )
}

/// ZYZ rot/tilt/psi angles in degrees of a rotation matrix
pub fn matrix_to_euler(a: &Matrix3<f64>) -> [f64; 3] {
    let abs_sb = (a[(0, 2)].powi(2) + a[(1, 2)].powi(2)).sqrt();
    let (alpha, beta, gamma) = if abs_sb > 16.0 * FLT_EPSILON {
        let gamma = a[(1, 2)].atan2(-a[(0, 2)]);
        let alpha = a[(2, 1)].atan2(a[(2, 0)]);
        let sign_sb = if gamma.sin().abs() < FLT_EPSILON {
            (-a[(0, 2)] / gamma.cos()).signum()
        } else if gamma.sin() > 0.0 {
            a[(1, 2)].signum()
        } else {
            -a[(1, 2)].signum()
        };
        (alpha, (sign_sb * abs_sb).atan2(a[(2, 2)]), gamma)
    } else if a[(2, 2)] > 0.0 {
        (0.0, 0.0, (-a[(1, 0)]).atan2(a[(0, 0)]))
    } else {
        (0.0, std::f64::consts::PI, a[(1, 0)].atan2(-a[(0, 0)]))
    };
    [alpha.to_degrees(), beta.to_degrees(), gamma.to_degrees()]
}

/// Rotation matrix of an engine pose vector (axis × angle in radians)
///
/// Engine poses rotate the volume into the particle frame; the matrix returned
/// here is the transpose of the plain axis-angle rotation, matching the
/// orientation expected by [`matrix_to_euler`].
pub fn expmap(pose: &Vector3<f64>) -> Matrix3<f64> {
    Rotation3::new(-pose).into_inner()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{} != {}", a, b);
    }

    fn assert_matrix_close(a: &Matrix3<f64>, b: &Matrix3<f64>) {
        for (x, y) in a.iter().zip(b.iter()) {
            assert!((x - y).abs() < 1e-9, "\n{}\n!=\n{}", a, b);
        }
    }

    #[test]
    fn test_szyz_round_trip() {
        let angles = [0.3, -1.1, -2.0];
        let m = euler_matrix_szyz(angles[0], angles[1], angles[2]);
        let back = euler_from_matrix_szyz(&m);
        for (a, b) in angles.iter().zip(back.iter()) {
            assert_close(*a, *b);
        }
    }

    #[test]
    fn test_szyz_matches_zyz_convention() {
        // Both decompositions describe the same rotation for identical angles
        let (rot, tilt, psi) = (30.0_f64, 50.0_f64, -70.0_f64);
        let szyz = euler_matrix_szyz(
            -rot.to_radians(),
            -tilt.to_radians(),
            -psi.to_radians(),
        );
        assert_matrix_close(&szyz, &euler_to_matrix(rot, tilt, psi));
    }

    #[test]
    fn test_zyz_round_trip() {
        let m = euler_to_matrix(-100.0, 35.0, 120.0);
        let [rot, tilt, psi] = matrix_to_euler(&m);
        assert_close(rot, -100.0);
        assert_close(tilt, 35.0);
        assert_close(psi, 120.0);
    }

    #[test]
    fn test_zyz_gimbal_lock() {
        let m = euler_to_matrix(0.0, 0.0, 40.0);
        let [rot, tilt, psi] = matrix_to_euler(&m);
        assert_close(rot, 0.0);
        assert_close(tilt, 0.0);
        assert_close(psi, 40.0);
    }

    #[test]
    fn test_expmap_identity_and_in_plane() {
        assert_matrix_close(&expmap(&Vector3::zeros()), &Matrix3::identity());
        let angle = 0.4_f64;
        let m = expmap(&Vector3::new(0.0, 0.0, angle));
        let [rot, tilt, psi] = matrix_to_euler(&m);
        assert_close(tilt, 0.0);
        assert_close(rot + psi, angle.to_degrees());
    }

    #[test]
    fn test_projection_geometry_round_trip() {
        let shifts = Vector3::new(1.5, -2.0, 0.25);
        let angles = [20.0, 60.0, -45.0];
        let t = matrix_from_geometry(&shifts, &angles, true).unwrap();
        let (s, a) = geometry_from_matrix(&t, true).unwrap();
        for i in 0..3 {
            assert_close(s[i], shifts[i]);
            assert_close(a[i], angles[i]);
        }
    }

    #[test]
    fn test_flip_detection() {
        let mut m = Matrix4::identity();
        assert!(!Transform::from_matrix(m).is_flipped_2d());
        m[(0, 0)] = -1.0;
        assert!(Transform::from_matrix(m).is_flipped_2d());
    }

    #[test]
    fn test_singular_projection() {
        let t = Transform::from_matrix(Matrix4::zeros());
        assert!(geometry_from_matrix(&t, true).is_none());
        assert!(geometry_from_matrix(&t, false).is_some());
    }
}
