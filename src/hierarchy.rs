use std::collections::HashMap;

use nalgebra::{Matrix4, UnitQuaternion, Vector3};

use crate::correction::{euler_distance_degrees, euler_zxy_degrees, mirror_rotation, world_delta};
use crate::policy::{AxisConventionPolicy, SNAP_TOLERANCE_DEGREES};
use crate::scene::{NodeId, Scene, SceneNode};
use crate::{log_debug, log_warn};

// ─── Delta map ────────────────────────────────────────────────────────────────

/// Per-node `world_after * world_before⁻¹`, produced once by
/// [`remap_hierarchy`] and read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeltaMap {
    deltas: HashMap<NodeId, Matrix4<f32>>,
}

impl DeltaMap {
    pub fn get(&self, node: NodeId) -> Option<&Matrix4<f32>> {
        self.deltas.get(&node)
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.deltas.contains_key(&node)
    }

    pub fn len(&self) -> usize {
        self.deltas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Matrix4<f32>)> {
        self.deltas.iter().map(|(node, delta)| (*node, delta))
    }

    fn record(&mut self, node: NodeId, delta: Matrix4<f32>) {
        let previous = self.deltas.insert(node, delta);
        debug_assert!(previous.is_none(), "delta recorded twice for {node:?}");
    }
}

/// Outcome of one hierarchy pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HierarchyRemap {
    pub deltas: DeltaMap,
    /// Nodes removed by the pruning rule, in visit order.
    pub deleted: Vec<NodeId>,
    /// Nodes whose local rotation was reset to identity by the snap rule.
    pub snapped: Vec<NodeId>,
}

/// World pose captured before the pass touches anything.
#[derive(Debug, Clone, Copy)]
struct StoredPose {
    position: Vector3<f32>,
    rotation: UnitQuaternion<f32>,
    matrix: Matrix4<f32>,
}

// ─── Rules ────────────────────────────────────────────────────────────────────

/// A node is pruned iff it carries a disabled static renderer and has no children.
pub fn should_delete_node(node: &SceneNode) -> bool {
    node.renderer
        .as_ref()
        .is_some_and(|renderer| !renderer.enabled && node.children.is_empty())
}

/// True when local Euler angles already sit on the authoring tool's exported
/// up-axis angle, within [`SNAP_TOLERANCE_DEGREES`].
pub fn is_at_snap_target(local_rotation: &UnitQuaternion<f32>, policy: &AxisConventionPolicy) -> bool {
    let euler = euler_zxy_degrees(local_rotation);
    euler_distance_degrees(&euler, &policy.snap_target_degrees()) < SNAP_TOLERANCE_DEGREES
}

// ─── Hierarchy pass ───────────────────────────────────────────────────────────

/// Rewrite every non-root node into the target axis convention.
///
/// Nodes are visited parents-first. Each surviving node gets back its
/// captured world position and rotation (mirrored when flipping), then the
/// local X correction or the identity snap, then a Y/Z scale swap. The
/// resulting world frame change is recorded in the returned [`DeltaMap`].
///
/// The root is never touched, so it has no delta entry.
pub fn remap_hierarchy(scene: &mut Scene, policy: &AxisConventionPolicy) -> HierarchyRemap {
    let order = scene.attached_nodes();

    let stored: HashMap<NodeId, StoredPose> = order
        .iter()
        .map(|&id| {
            let pose = StoredPose {
                position: scene.world_position(id),
                rotation: scene.world_rotation(id),
                matrix: scene.world_matrix(id),
            };
            (id, pose)
        })
        .collect();

    let mut outcome = HierarchyRemap::default();

    for id in order {
        if !scene.is_attached(id) {
            continue;
        }

        if should_delete_node(scene.node(id)) {
            log_debug!("Removing disabled leaf node: {}", scene.node(id).name);
            scene.detach(id);
            outcome.deleted.push(id);
            continue;
        }

        let pose = stored[&id];
        if apply_transform_fix(scene, id, &pose, policy) {
            outcome.snapped.push(id);
        }

        let after = scene.world_matrix(id);
        let delta = world_delta(&pose.matrix, &after).unwrap_or_else(|| {
            log_warn!(
                "node '{}' had a singular world matrix; recording its new frame as the delta",
                scene.node(id).name
            );
            after
        });
        outcome.deltas.record(id, delta);
    }

    outcome
}

/// Rewrites one node's local transform. Returns `true` when the identity snap fired.
fn apply_transform_fix(
    scene: &mut Scene,
    id: NodeId,
    pose: &StoredPose,
    policy: &AxisConventionPolicy,
) -> bool {
    let (position, rotation) = if policy.flip_z_axis() {
        (
            pose.position.component_mul(&policy.position_mask()),
            mirror_rotation(pose.rotation, policy.mirror_rotation()),
        )
    } else {
        (pose.position, pose.rotation)
    };

    scene.set_world_position(id, position);
    scene.set_world_rotation(id, rotation);

    let node = scene.node_mut(id);
    let snapped = is_at_snap_target(&node.rotation, policy);
    if snapped {
        node.rotation = UnitQuaternion::identity();
    } else {
        node.rotation *= policy.hierarchy_fix();
    }

    node.scale = Vector3::new(node.scale.x, node.scale.z, node.scale.y);
    snapped
}
