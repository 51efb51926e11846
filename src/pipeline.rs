use std::collections::HashSet;

use crate::animation::{AnimationClip, remap_clip};
use crate::geometry::{ImportOptions, remap_scene_meshes};
use crate::hierarchy::remap_hierarchy;
use crate::scene::{MeshId, NodeId, Scene};
use crate::settings::AxisConversionSettings;
use crate::skinning::remap_bind_poses;
use crate::types::{ClipConversionReport, SceneConversionReport, ValidationIssue};
use crate::user_data::AssetUserData;
use crate::{log_debug, log_info};

/// Import post-processing hooks for one asset.
///
/// The model hook runs the hierarchy pass first and feeds its delta map to
/// the bind-pose pass; the animation hook only needs the policy. Nothing is
/// touched when the asset has not opted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisConversionPostprocessor {
    settings: AxisConversionSettings,
}

impl AxisConversionPostprocessor {
    pub fn new(settings: AxisConversionSettings) -> Self {
        Self { settings }
    }

    pub fn from_user_data(store: &AssetUserData) -> Self {
        Self::new(AxisConversionSettings::from_user_data(store))
    }

    pub fn settings(&self) -> &AxisConversionSettings {
        &self.settings
    }

    /// Convert the node hierarchy, mesh buffers and bind poses of `scene`.
    ///
    /// # Arguments
    ///
    /// * `scene` - Imported scene; rewritten in place.
    /// * `options` - Host import options (tangent regeneration).
    ///
    /// # Returns
    ///
    /// Pass report; `applied` is `false` when conversion is disabled.
    pub fn on_postprocess_model(
        &self,
        scene: &mut Scene,
        options: &ImportOptions,
    ) -> SceneConversionReport {
        let mut report = SceneConversionReport {
            flip_z_axis: self.settings.flip_z_axis,
            ..SceneConversionReport::default()
        };
        if !self.settings.apply_axis_conversion {
            log_debug!("Axis conversion disabled for this asset; model left as imported");
            return report;
        }

        let policy = self.settings.policy();
        let hierarchy = remap_hierarchy(scene, &policy);

        let geometry = remap_scene_meshes(scene, &policy, options);
        for mesh in &geometry.tangents_skipped {
            report.issues.push(ValidationIssue::warning(
                "TANGENTS_SKIPPED",
                format!(
                    "mesh '{}' has no normals or UVs; tangents were not regenerated",
                    mesh_name(scene, *mesh)
                ),
            ));
        }

        let mut fixed_meshes = HashSet::new();
        let bind_poses = remap_bind_poses(scene, &hierarchy.deltas, &mut fixed_meshes);
        report
            .issues
            .extend(bind_poses.errors.iter().map(ValidationIssue::from));

        report.applied = true;
        report.remapped_node_count = hierarchy.deltas.len();
        report.deleted_nodes = node_names(scene, &hierarchy.deleted);
        report.snapped_nodes = node_names(scene, &hierarchy.snapped);
        report.mesh_count = geometry.remapped_meshes.len();
        report.bind_pose_mesh_count = bind_poses.corrected.len();

        log_info!(
            "Axis conversion applied: {} nodes, {} meshes, {} bind pose sets, {} nodes removed",
            report.remapped_node_count,
            report.mesh_count,
            report.bind_pose_mesh_count,
            report.deleted_nodes.len()
        );
        report
    }

    /// Convert the transform curves of one clip.
    pub fn on_postprocess_animation(&self, clip: &mut AnimationClip) -> ClipConversionReport {
        let mut report = ClipConversionReport {
            clip_name: clip.name.clone(),
            ..ClipConversionReport::default()
        };
        if !self.settings.apply_axis_conversion {
            return report;
        }

        let outcome = remap_clip(clip, &self.settings.policy());

        for (path, property) in &outcome.unrecognized {
            report.issues.push(ValidationIssue::warning(
                "UNRECOGNIZED_BINDING",
                format!("'{}' on '{}' was skipped", property, path),
            ));
        }
        for group in &outcome.uneven_groups {
            report.issues.push(ValidationIssue::warning(
                "UNEVEN_KEYFRAME_COUNTS",
                format!(
                    "{} curves on '{}' have keyframe counts {:?}",
                    group.channel, group.path, group.counts
                ),
            ));
        }
        report
            .issues
            .extend(outcome.errors.iter().map(ValidationIssue::from));

        report.applied = true;
        report.remapped_groups = outcome.remapped_groups;
        report.rejected_groups = outcome.rejected_groups;
        report.unrecognized_bindings = outcome
            .unrecognized
            .into_iter()
            .map(|(path, property)| format!("{}:{}", path, property))
            .collect();
        report
    }
}

fn node_names(scene: &Scene, ids: &[NodeId]) -> Vec<String> {
    ids.iter().map(|id| scene.node(*id).name.clone()).collect()
}

fn mesh_name(scene: &Scene, id: MeshId) -> &str {
    &scene.mesh(id).name
}
