use nalgebra::{Matrix4, Quaternion, UnitQuaternion, Vector3};

// ─── Axis constants ───────────────────────────────────────────────────────────

pub const SQRT_2_HALF: f32 = 0.707_106_77;

/// Magnitude of the local X correction applied to every remapped node.
pub const HIERARCHY_FIX_DEGREES: f32 = 90.0;

/// X angle the authoring tool writes for its own "exactly 90 degree" up-axis
/// rotation. Nodes already sitting at this angle are reset to identity.
pub const SNAP_TARGET_DEGREES: f32 = 89.98;

/// Maximum Euler distance (degrees) from the snap target that still resets
/// the local rotation to identity.
pub const SNAP_TOLERANCE_DEGREES: f32 = 0.001;

/// Quaternion components stored as (x, y, z, w).
const MESH_ROTATION: [f32; 4] = [-SQRT_2_HALF, 0.0, 0.0, SQRT_2_HALF];
const MESH_ROTATION_Z_FLIP: [f32; 4] = [0.0, SQRT_2_HALF, SQRT_2_HALF, 0.0];
const ANIMATION_ROTATION_FIX: [f32; 4] = [SQRT_2_HALF, 0.0, 0.0, SQRT_2_HALF];
const MIRROR: [f32; 4] = [0.0, 1.0, 0.0, 0.0];

const Z_FLIP_SCALE: [f32; 3] = [-1.0, 1.0, -1.0];
const IDENTITY_SCALE: [f32; 3] = [1.0, 1.0, 1.0];

fn quaternion_from_xyzw(xyzw: [f32; 4]) -> Quaternion<f32> {
    Quaternion::new(xyzw[3], xyzw[0], xyzw[1], xyzw[2])
}

// ─── Policy ───────────────────────────────────────────────────────────────────

/// Fixed operators applied by the axis conversion for one flip setting.
///
/// Both presets are constants: the mapping between the two conventions is an
/// axis swap plus sign flips, never a computed parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisConventionPolicy {
    flip_z_axis: bool,
}

impl AxisConventionPolicy {
    pub fn new(flip_z_axis: bool) -> Self {
        Self { flip_z_axis }
    }

    pub fn flip_z_axis(&self) -> bool {
        self.flip_z_axis
    }

    /// +1 when the extra front-axis flip is active, -1 otherwise.
    fn sign(&self) -> f32 {
        if self.flip_z_axis { 1.0 } else { -1.0 }
    }

    /// Rotation baked into mesh vertex and normal buffers.
    pub fn mesh_rotation(&self) -> UnitQuaternion<f32> {
        let xyzw = if self.flip_z_axis {
            MESH_ROTATION_Z_FLIP
        } else {
            MESH_ROTATION
        };
        UnitQuaternion::new_unchecked(quaternion_from_xyzw(xyzw))
    }

    /// Rotation-only 4x4 form of [`Self::mesh_rotation`].
    pub fn mesh_matrix(&self) -> Matrix4<f32> {
        self.mesh_rotation().to_homogeneous()
    }

    /// Right-hand correction composed onto every animated rotation key.
    ///
    /// Kept as a raw quaternion because tangent keys are not unit length.
    pub fn animation_rotation_fix(&self) -> Quaternion<f32> {
        quaternion_from_xyzw(ANIMATION_ROTATION_FIX)
    }

    /// Mirror quaternion wrapped around animated rotations when flipping.
    pub fn animation_mirror(&self) -> Option<Quaternion<f32>> {
        self.flip_z_axis.then(|| quaternion_from_xyzw(MIRROR))
    }

    /// Half-turn about Y; conjugating a rotation by it negates the X and Z
    /// Euler components.
    pub fn mirror_rotation(&self) -> UnitQuaternion<f32> {
        UnitQuaternion::new_unchecked(quaternion_from_xyzw(MIRROR))
    }

    /// Component mask applied to world positions and animated positions.
    pub fn position_mask(&self) -> Vector3<f32> {
        let mask = if self.flip_z_axis {
            Z_FLIP_SCALE
        } else {
            IDENTITY_SCALE
        };
        Vector3::from(mask)
    }

    /// Local-space X rotation appended to each remapped node.
    pub fn hierarchy_fix(&self) -> UnitQuaternion<f32> {
        let degrees = -HIERARCHY_FIX_DEGREES * self.sign();
        UnitQuaternion::from_axis_angle(&Vector3::x_axis(), degrees.to_radians())
    }

    /// Local Euler angles (degrees, ZXY order) that trigger the identity snap.
    pub fn snap_target_degrees(&self) -> Vector3<f32> {
        Vector3::new(SNAP_TARGET_DEGREES * self.sign(), 0.0, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_no_flip_when_building_policy_then_mesh_rotation_is_minus_ninety_about_x() {
        let policy = AxisConventionPolicy::new(false);
        let expected = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), (-90.0f32).to_radians());

        assert!(policy.mesh_rotation().angle_to(&expected) < 0.0001);
        assert_eq!(policy.position_mask(), Vector3::new(1.0, 1.0, 1.0));
        assert!(policy.animation_mirror().is_none());
    }

    #[test]
    fn given_flip_when_building_policy_then_mesh_rotation_is_half_turn_after_base_fix() {
        let policy = AxisConventionPolicy::new(true);
        let base = AxisConventionPolicy::new(false).mesh_rotation();
        let expected = policy.mirror_rotation() * base;

        assert!(policy.mesh_rotation().angle_to(&expected) < 0.0001);
        assert_eq!(policy.position_mask(), Vector3::new(-1.0, 1.0, -1.0));
        assert!(policy.animation_mirror().is_some());
    }

    #[test]
    fn given_mesh_matrix_when_inspected_then_it_has_no_translation() {
        let matrix = AxisConventionPolicy::new(true).mesh_matrix();

        assert_eq!(matrix[(0, 3)], 0.0);
        assert_eq!(matrix[(1, 3)], 0.0);
        assert_eq!(matrix[(2, 3)], 0.0);
        assert!((matrix.fixed_view::<3, 3>(0, 0).into_owned().determinant() - 1.0).abs() < 0.0001);
    }

    #[test]
    fn given_either_flag_when_reading_hierarchy_constants_then_signs_are_opposite() {
        let plain = AxisConventionPolicy::new(false);
        let flipped = AxisConventionPolicy::new(true);

        assert_eq!(plain.snap_target_degrees().x, -SNAP_TARGET_DEGREES);
        assert_eq!(flipped.snap_target_degrees().x, SNAP_TARGET_DEGREES);

        let plain_angle = plain.hierarchy_fix().scaled_axis().x.to_degrees();
        let flipped_angle = flipped.hierarchy_fix().scaled_axis().x.to_degrees();
        assert!((plain_angle - 90.0).abs() < 0.001);
        assert!((flipped_angle + 90.0).abs() < 0.001);
    }
}
