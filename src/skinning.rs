use std::collections::HashSet;

use nalgebra::Matrix4;

use crate::correction::rebuild_inverse_bind_matrix;
use crate::error::ConvertError;
use crate::hierarchy::DeltaMap;
use crate::log_debug;
use crate::logging::ResultExt;
use crate::scene::{MeshId, NodeId, Scene};

/// Outcome of one bind-pose pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BindPoseRemap {
    /// Meshes whose bind poses were rewritten, in visit order.
    pub corrected: Vec<MeshId>,
    /// One entry per skinned mesh that was left untouched.
    pub errors: Vec<ConvertError>,
}

/// Rewrite bind poses of every skinned mesh reachable from the root so the
/// skinned rest pose survives the hierarchy remap.
///
/// Each bind pose is right-multiplied by the inverse delta of its bone.
/// A mesh already in `fixed` is skipped, so a mesh shared by several
/// skinned nodes is corrected exactly once per pass. A mesh is rewritten
/// all-or-nothing: any missing delta leaves every slot unchanged.
///
/// # Arguments
///
/// * `scene` - Scene after [`crate::hierarchy::remap_hierarchy`].
/// * `deltas` - Delta map produced by that same hierarchy pass.
/// * `fixed` - Meshes already corrected during this pass.
///
/// # Returns
///
/// Corrected meshes plus one error per mesh that could not be corrected.
pub fn remap_bind_poses(
    scene: &mut Scene,
    deltas: &DeltaMap,
    fixed: &mut HashSet<MeshId>,
) -> BindPoseRemap {
    let mut outcome = BindPoseRemap::default();

    for id in scene.attached_nodes() {
        let Some(skin) = scene.node(id).skin.clone() else {
            continue;
        };
        if skin.mesh.0 >= scene.meshes.len() || !fixed.insert(skin.mesh) {
            continue;
        }

        let mesh = scene.mesh(skin.mesh);
        let Some(bind_poses) = mesh.bind_poses.as_ref() else {
            continue;
        };
        log_debug!("Fixing bind poses: {}", mesh.name);

        match corrected_bind_poses(scene, &mesh.name, bind_poses, &skin.bones, deltas)
            .log_error(Some("bind pose correction"))
        {
            Ok(poses) => {
                scene.mesh_mut(skin.mesh).bind_poses = Some(poses);
                outcome.corrected.push(skin.mesh);
            }
            Err(error) => outcome.errors.push(error),
        }
    }

    outcome
}

fn corrected_bind_poses(
    scene: &Scene,
    mesh_name: &str,
    bind_poses: &[Matrix4<f32>],
    bones: &[NodeId],
    deltas: &DeltaMap,
) -> Result<Vec<Matrix4<f32>>, ConvertError> {
    if bind_poses.len() != bones.len() {
        return Err(ConvertError::BindPoseCountMismatch {
            mesh_name: mesh_name.to_string(),
            bind_pose_count: bind_poses.len(),
            bone_count: bones.len(),
        });
    }

    bind_poses
        .iter()
        .zip(bones)
        .enumerate()
        .map(|(slot, (pose, bone))| {
            let delta_inverse = deltas
                .get(*bone)
                .and_then(|delta| delta.try_inverse())
                .ok_or_else(|| ConvertError::MissingBoneDelta {
                    mesh_name: mesh_name.to_string(),
                    bone_slot: slot,
                    bone_name: bone_name(scene, *bone),
                })?;
            Ok(pose * delta_inverse)
        })
        .collect()
}

fn bone_name(scene: &Scene, bone: NodeId) -> String {
    scene
        .nodes
        .get(bone.0)
        .map(|node| node.name.clone())
        .unwrap_or_else(|| format!("#{}", bone.0))
}

/// Bind poses that make the current pose of `bones` the rest pose.
///
/// Returns `None` when any bone's world matrix is singular.
pub fn rest_bind_poses(scene: &Scene, bones: &[NodeId]) -> Option<Vec<Matrix4<f32>>> {
    bones
        .iter()
        .map(|bone| rebuild_inverse_bind_matrix(scene.world_matrix(*bone)))
        .collect()
}
