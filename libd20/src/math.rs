//! Scalar type, nalgebra aliases and the few rotation helpers the simulation needs.
//!
//! Vector and quaternion arithmetic itself comes from nalgebra; this module only
//! adds what nalgebra does not spell out for us:
//! - orientation from three independent Euler angles
//! - first-order quaternion integration of an angular velocity (renormalised)
//! - the per-step damping factor

pub use nalgebra::{Matrix3, Point3, Quaternion, Rotation3, Unit, UnitQuaternion, Vector3};

pub type Real = f32;

/// Tolerance below which lengths and denominators are treated as zero.
pub const EPS: Real = 1e-6;

/// World "up"; the floor normal and the reference axis for the top face.
#[inline]
pub fn world_up() -> Vector3<Real> {
    Vector3::y()
}

/// Orientation from rotations about x, then y, then z (radians).
///
/// Three independent angles are not uniform over SO(3), which is fine for
/// scrambling a die before it is thrown.
pub fn quat_from_euler(x: Real, y: Real, z: Real) -> UnitQuaternion<Real> {
    UnitQuaternion::from_euler_angles(x, y, z)
}

/// Advance `q` by angular velocity `w` (world frame, rad/s) over `dt`.
///
/// Integrates q' = 0.5 * (0, w) * q and renormalises, so the result is always
/// a unit quaternion.
pub fn integrate_orientation(
    q: &UnitQuaternion<Real>,
    w: &Vector3<Real>,
    dt: Real,
) -> UnitQuaternion<Real> {
    let q = q.quaternion();
    let dq = Quaternion::from_parts(0.0, *w) * q * (0.5 * dt);
    let next = Quaternion::new(q.w + dq.w, q.i + dq.i, q.j + dq.j, q.k + dq.k);
    if next.norm_squared() < EPS {
        // unreachable for finite dt, but never hand back a zero quaternion
        return UnitQuaternion::identity();
    }
    UnitQuaternion::new_normalize(next)
}

/// Multiplicative velocity decay for one step: `(1 - damping)^dt`.
///
/// `damping` is clamped to [0, 1); zero means no decay.
#[inline]
pub fn damping_factor(damping: Real, dt: Real) -> Real {
    let d = damping.clamp(0.0, 1.0 - EPS);
    (1.0 - d).powf(dt)
}

/// Two unit vectors spanning the plane orthogonal to unit `n`.
pub fn orthonormal_basis(n: &Vector3<Real>) -> (Vector3<Real>, Vector3<Real>) {
    // pick the world axis least aligned with n
    let helper = if n.x.abs() < 0.57 {
        Vector3::x()
    } else if n.y.abs() < 0.57 {
        Vector3::y()
    } else {
        Vector3::z()
    };
    let t1 = n.cross(&helper).normalize();
    let t2 = n.cross(&t1);
    (t1, t2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_integrate_orientation_stays_unit() {
        let mut q = UnitQuaternion::identity();
        let w = Vector3::new(3.0, -7.0, 11.0);
        for _ in 0..1000 {
            q = integrate_orientation(&q, &w, 1.0 / 60.0);
            assert_relative_eq!(q.quaternion().norm(), 1.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_integrate_orientation_small_step_matches_axis_angle() {
        let w = Vector3::new(0.0, 2.0, 0.0);
        let dt = 1e-3;
        let mut q = UnitQuaternion::identity();
        for _ in 0..500 {
            q = integrate_orientation(&q, &w, dt);
        }
        // 2 rad/s for 0.5 s about +y
        assert_relative_eq!(q.angle(), 1.0, epsilon = 1e-3);
        let axis = q.axis().expect("non-trivial rotation");
        assert_relative_eq!(axis.y, 1.0, epsilon = 1e-4);
    }

    #[test]
    fn test_damping_factor() {
        assert_relative_eq!(damping_factor(0.0, 1.0 / 60.0), 1.0);
        let f = damping_factor(0.1, 1.0);
        assert_relative_eq!(f, 0.9, epsilon = 1e-6);
        // over one second in 60 steps the decay compounds to the same value
        assert_relative_eq!(damping_factor(0.1, 1.0 / 60.0).powi(60), 0.9, epsilon = 1e-4);
        assert!(damping_factor(5.0, 1.0 / 60.0) > 0.0);
    }

    #[test]
    fn test_orthonormal_basis() {
        for n in [Vector3::x(), Vector3::y(), Vector3::new(1.0, 2.0, -3.0).normalize()] {
            let (t1, t2) = orthonormal_basis(&n);
            assert_relative_eq!(t1.norm(), 1.0, epsilon = 1e-6);
            assert_relative_eq!(t2.norm(), 1.0, epsilon = 1e-6);
            assert_relative_eq!(t1.dot(&n), 0.0, epsilon = 1e-6);
            assert_relative_eq!(t2.dot(&n), 0.0, epsilon = 1e-6);
            assert_relative_eq!(t1.dot(&t2), 0.0, epsilon = 1e-6);
        }
    }
}
