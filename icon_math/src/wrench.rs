//! Wrenches and the wrench frame transform.

use nalgebra::Vector3;

use crate::pose::Pose3;

/// A wrench: a force and a torque acting at the origin of a frame,
/// expressed in that frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Wrench {
    pub force: Vector3<f64>,
    pub torque: Vector3<f64>,
}

impl Wrench {
    pub fn new(force: Vector3<f64>, torque: Vector3<f64>) -> Self {
        Self { force, torque }
    }
}

/// Re-expresses a wrench at the origin of frame B into frame A.
///
/// `a_T_b` is the pose of B relative to A; `b_w` sits at the origin of B in
/// B coordinates. The returned wrench sits at the origin of A in A
/// coordinates: `a.f = a_R_b * b.f` and
/// `a.tau = a_R_b * b.tau + a_p_b x a.f`.
pub fn transform_wrench(a_t_b: &Pose3, b_w: &Wrench) -> Wrench {
    let force = a_t_b.rotation().rotate(&b_w.force);
    let torque = a_t_b.rotation().rotate(&b_w.torque) + a_t_b.translation().cross(&force);
    Wrench { force, torque }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rotation::Rotation;
    use approx::assert_relative_eq;

    #[test]
    fn identity_transform_is_noop() {
        let wrench = Wrench::new(Vector3::new(1.0, -2.0, 3.0), Vector3::new(0.5, 0.0, -1.5));
        assert_eq!(transform_wrench(&Pose3::identity(), &wrench), wrench);
    }

    #[test]
    fn pure_torque_ignores_translation() {
        // Unit torque about z at B; A is B translated by (1, 0, 0). With no
        // force there is no lever arm, so the torque passes through.
        let a_t_b = Pose3::from_translation(Vector3::new(1.0, 0.0, 0.0));
        let b_w = Wrench::new(Vector3::zeros(), Vector3::new(0.0, 0.0, 1.0));
        let a_w = transform_wrench(&a_t_b, &b_w);
        assert_eq!(a_w.force, Vector3::zeros());
        assert_eq!(a_w.torque, Vector3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn force_produces_lever_arm_torque() {
        let a_t_b = Pose3::from_translation(Vector3::new(0.0, 1.0, 0.0));
        let b_w = Wrench::new(Vector3::new(0.0, 0.0, 2.0), Vector3::zeros());
        let a_w = transform_wrench(&a_t_b, &b_w);
        assert_eq!(a_w.force, Vector3::new(0.0, 0.0, 2.0));
        // (0,1,0) x (0,0,2) = (2,0,0)
        assert_eq!(a_w.torque, Vector3::new(2.0, 0.0, 0.0));
    }

    #[test]
    fn transform_composes() {
        let t1 = Pose3::new(
            Rotation::from_rpy(0.3, -0.1, 0.7),
            Vector3::new(0.2, -0.4, 1.1),
        );
        let t2 = Pose3::new(
            Rotation::from_rpy(-0.5, 0.2, 0.1),
            Vector3::new(1.0, 0.5, -0.3),
        );
        let wrench = Wrench::new(Vector3::new(1.0, 2.0, -1.0), Vector3::new(0.1, -0.2, 0.3));

        let composed = transform_wrench(&(t1 * t2), &wrench);
        let chained = transform_wrench(&t1, &transform_wrench(&t2, &wrench));

        assert_relative_eq!(composed.force.x, chained.force.x, epsilon = 1e-12);
        assert_relative_eq!(composed.force.y, chained.force.y, epsilon = 1e-12);
        assert_relative_eq!(composed.force.z, chained.force.z, epsilon = 1e-12);
        assert_relative_eq!(composed.torque.x, chained.torque.x, epsilon = 1e-12);
        assert_relative_eq!(composed.torque.y, chained.torque.y, epsilon = 1e-12);
        assert_relative_eq!(composed.torque.z, chained.torque.z, epsilon = 1e-12);
    }
}
