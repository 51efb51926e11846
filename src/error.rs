use thiserror::Error;

use crate::animation::ChannelKind;

/// Error values returned by the conversion passes.
///
/// Every variant is scoped to a single mesh or channel group; callers report
/// it and continue with the remaining items of the asset.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConvertError {
    /// A skinned mesh references a bone that has no recorded delta, e.g. a
    /// deleted node or the untouched scene root.
    #[error("bone slot {bone_slot} of mesh '{mesh_name}' ({bone_name}) has no recorded delta")]
    MissingBoneDelta {
        mesh_name: String,
        bone_slot: usize,
        bone_name: String,
    },

    /// The skin lists a different number of bones than the mesh has bind poses.
    #[error("mesh '{mesh_name}' has {bind_pose_count} bind poses but the skin lists {bone_count} bones")]
    BindPoseCountMismatch {
        mesh_name: String,
        bind_pose_count: usize,
        bone_count: usize,
    },

    /// A channel group is missing one of its component curves.
    #[error("{channel} curves of '{path}' are missing component '{component}'")]
    MissingComponentCurve {
        path: String,
        channel: ChannelKind,
        component: char,
    },

    /// Component curves of one channel group disagree on their keyframe count.
    #[error("{channel} curves of '{path}' have mismatched keyframe counts {counts:?}")]
    MismatchedKeyframeCounts {
        path: String,
        channel: ChannelKind,
        counts: Vec<usize>,
    },
}

impl ConvertError {
    /// Stable machine-readable code used in pass reports.
    pub fn code(&self) -> &'static str {
        match self {
            ConvertError::MissingBoneDelta { .. } => "MISSING_BONE_DELTA",
            ConvertError::BindPoseCountMismatch { .. } => "BIND_POSE_COUNT_MISMATCH",
            ConvertError::MissingComponentCurve { .. } => "MISSING_COMPONENT_CURVE",
            ConvertError::MismatchedKeyframeCounts { .. } => "MISMATCHED_KEYFRAME_COUNTS",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_missing_delta_error_when_formatted_then_mesh_and_slot_are_included() {
        let error = ConvertError::MissingBoneDelta {
            mesh_name: "Body".to_string(),
            bone_slot: 3,
            bone_name: "Spine".to_string(),
        };

        let message = error.to_string();
        assert!(message.contains("Body"));
        assert!(message.contains('3'));
        assert!(message.contains("Spine"));
        assert_eq!(error.code(), "MISSING_BONE_DELTA");
    }

    #[test]
    fn given_mismatched_counts_error_when_formatted_then_channel_and_counts_are_included() {
        let error = ConvertError::MismatchedKeyframeCounts {
            path: "Armature/Hips".to_string(),
            channel: ChannelKind::Rotation,
            counts: vec![4, 4, 3, 4],
        };

        let message = error.to_string();
        assert!(message.contains("rotation"));
        assert!(message.contains("Armature/Hips"));
        assert!(message.contains("[4, 4, 3, 4]"));
    }
}
