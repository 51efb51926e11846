use nalgebra::{Matrix4, Point3, Quaternion, UnitQuaternion, Vector3};

/// Conjugates a rotation by `mirror`.
///
/// With a half-turn about Y this negates the X and Z Euler components of the
/// rotation, which is how the front-axis flip is applied to node rotations.
///
/// # Arguments
///
/// * `rotation` - Rotation to mirror.
/// * `mirror` - Unit quaternion the rotation is conjugated by.
///
/// # Returns
///
/// `mirror * rotation * mirror⁻¹`.
pub fn mirror_rotation(
    rotation: UnitQuaternion<f32>,
    mirror: UnitQuaternion<f32>,
) -> UnitQuaternion<f32> {
    mirror * rotation * mirror.inverse()
}

/// Applies a 4x4 matrix to a vector treated as a point (w = 1).
///
/// # Arguments
///
/// * `vertex` - Position to transform.
/// * `matrix` - 4x4 transform matrix applied to the position.
///
/// # Returns
///
/// Transformed position.
pub fn transform_as_point(vertex: Vector3<f32>, matrix: &Matrix4<f32>) -> Vector3<f32> {
    matrix.transform_point(&Point3::from(vertex)).coords
}

/// Rebuilds an inverse bind matrix from a bone's rest-pose world matrix.
/// Returns `None` when the world matrix is not invertible.
pub fn rebuild_inverse_bind_matrix(bone_world: Matrix4<f32>) -> Option<Matrix4<f32>> {
    bone_world.try_inverse()
}

/// Matrix that carries a world frame from `before` to `after`.
///
/// # Returns
///
/// `Some(after * before⁻¹)`, or `None` when `before` is singular.
pub fn world_delta(before: &Matrix4<f32>, after: &Matrix4<f32>) -> Option<Matrix4<f32>> {
    before.try_inverse().map(|inverse| after * inverse)
}

/// Extracts Euler angles in degrees using Z-then-X-then-Y application order
/// (`R = Ry · Rx · Rz`), the order the target engine reports local angles in.
///
/// Values are in `(-180, 180]`; X is in `[-90, 90]`.
///
/// Evaluated in f64 with X taken from `atan2`, so angles a few hundredths of
/// a degree away from ±90 are still resolved to well under 0.001 degrees.
pub fn euler_zxy_degrees(rotation: &UnitQuaternion<f32>) -> Vector3<f32> {
    let q = rotation.quaternion();
    let rotation = UnitQuaternion::new_normalize(Quaternion::new(
        f64::from(q.w),
        f64::from(q.i),
        f64::from(q.j),
        f64::from(q.k),
    ));
    let m = rotation.to_rotation_matrix();
    let m = m.matrix();

    let sin_x = (-m[(1, 2)]).clamp(-1.0, 1.0);
    let cos_x = m[(1, 0)].hypot(m[(1, 1)]);
    let x = sin_x.atan2(cos_x);

    let (y, z) = if cos_x > 1e-9 {
        (m[(0, 2)].atan2(m[(2, 2)]), m[(1, 0)].atan2(m[(1, 1)]))
    } else {
        // Gimbal lock: fold the whole yaw into Y.
        ((-m[(2, 0)]).atan2(m[(0, 0)]), 0.0)
    };

    Vector3::new(x.to_degrees() as f32, y.to_degrees() as f32, z.to_degrees() as f32)
}

/// Signed difference `a - b` wrapped into `(-180, 180]` degrees.
pub fn wrapped_angle_difference(a: f32, b: f32) -> f32 {
    let mut diff = (a - b) % 360.0;
    if diff > 180.0 {
        diff -= 360.0;
    } else if diff <= -180.0 {
        diff += 360.0;
    }
    diff
}

/// Euclidean distance between two Euler triples, axis-wise wrapped.
pub fn euler_distance_degrees(a: &Vector3<f32>, b: &Vector3<f32>) -> f32 {
    Vector3::new(
        wrapped_angle_difference(a.x, b.x),
        wrapped_angle_difference(a.y, b.y),
        wrapped_angle_difference(a.z, b.z),
    )
    .norm()
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Translation3, Vector3};

    fn euler_zxy(x: f32, y: f32, z: f32) -> UnitQuaternion<f32> {
        let rx = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), x.to_radians());
        let ry = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), y.to_radians());
        let rz = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), z.to_radians());
        ry * rx * rz
    }

    #[test]
    fn given_composed_rotation_when_extracting_euler_then_angles_are_recovered() {
        let rotation = euler_zxy(30.0, -45.0, 60.0);
        let euler = euler_zxy_degrees(&rotation);

        assert!((euler - Vector3::new(30.0, -45.0, 60.0)).norm() < 0.01);
    }

    #[test]
    fn given_rotation_when_mirrored_by_half_turn_y_then_x_and_z_euler_are_negated() {
        let rotation = euler_zxy(20.0, 35.0, -50.0);
        let mirror = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), std::f32::consts::PI);

        let mirrored = mirror_rotation(rotation, mirror);
        let expected = euler_zxy(-20.0, 35.0, 50.0);

        assert!(mirrored.angle_to(&expected) < 0.0001);
    }

    #[test]
    fn given_angles_across_wrap_when_measuring_distance_then_short_way_is_used() {
        assert!((wrapped_angle_difference(270.02, -89.98) - 0.0).abs() < 0.001);
        assert!((wrapped_angle_difference(-179.0, 179.0) - 2.0).abs() < 0.001);

        let a = Vector3::new(359.5, 0.0, 0.0);
        let b = Vector3::new(-0.5, 0.0, 0.0);
        assert!(euler_distance_degrees(&a, &b) < 0.001);
    }

    #[test]
    fn given_translated_frames_when_computing_delta_then_before_maps_onto_after() {
        let before = Translation3::new(1.0, 2.0, 3.0).to_homogeneous();
        let after = Translation3::new(-1.0, 2.0, -3.0).to_homogeneous();

        let delta = world_delta(&before, &after).expect("translation should be invertible");

        assert!((delta * before - after).norm() < 0.0001);
    }

    #[test]
    fn given_singular_frame_when_computing_delta_then_none_is_returned() {
        let before = Matrix4::new_nonuniform_scaling(&Vector3::new(1.0, 0.0, 1.0));
        assert!(world_delta(&before, &Matrix4::identity()).is_none());
    }

    #[test]
    fn given_bone_world_when_rebuilding_inverse_bind_then_identity_is_recovered() {
        let world = Translation3::new(0.0, 1.0, 0.0).to_homogeneous()
            * UnitQuaternion::from_euler_angles(0.3, 0.0, 0.0).to_homogeneous();

        let inverse = rebuild_inverse_bind_matrix(world)
            .expect("inverse bind matrix should be invertible");

        assert!((world * inverse - Matrix4::<f32>::identity()).norm() < 0.0001);
    }

    #[test]
    fn given_point_when_transformed_by_rotation_matrix_then_length_is_kept() {
        let matrix = UnitQuaternion::from_euler_angles(0.0, 0.0, 1.0).to_homogeneous();
        let point = transform_as_point(Vector3::new(1.0, 2.0, 3.0), &matrix);

        assert!((point.norm() - Vector3::new(1.0f32, 2.0, 3.0).norm()).abs() < 0.0001);
    }
}
