use std::collections::HashSet;

use nalgebra::Matrix4;

use crate::correction::transform_as_point;
use crate::mesh::Mesh;
use crate::policy::AxisConventionPolicy;
use crate::scene::{MeshId, Scene};
use crate::{log_debug, log_warn};

/// Host import options that influence mesh regeneration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportOptions {
    /// Regenerate tangents after the vertex buffers have been rotated.
    pub import_tangents: bool,
}

/// Outcome of the geometry pass over a scene.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeometryRemap {
    pub remapped_meshes: Vec<MeshId>,
    /// Meshes whose tangents were requested but could not be regenerated.
    pub tangents_skipped: Vec<MeshId>,
}

// ─── Mesh collection ──────────────────────────────────────────────────────────

/// Collect every distinct mesh referenced by a node reachable from the root,
/// in pre-order of first reference.
pub fn collect_scene_meshes(scene: &Scene) -> Vec<MeshId> {
    let mut seen = HashSet::<MeshId>::new();
    let mut meshes = Vec::new();

    for id in scene.attached_nodes() {
        let node = scene.node(id);
        let referenced = node
            .renderer
            .as_ref()
            .map(|renderer| renderer.mesh)
            .into_iter()
            .chain(node.skin.as_ref().map(|skin| skin.mesh));

        for mesh in referenced {
            if mesh.0 < scene.meshes.len() && seen.insert(mesh) {
                meshes.push(mesh);
            }
        }
    }

    meshes
}

// ─── Vertex remap ─────────────────────────────────────────────────────────────

/// Rotate vertex positions and normals of a single mesh by `matrix`.
///
/// Normals go through the same point transform as positions; `matrix` is a
/// pure rotation, so this matches a direction transform. Non-uniformly scaled
/// matrices are not supported here.
///
/// Bounds are always rebuilt; tangents only when `options` asks for them.
/// Returns `false` when tangents were requested but could not be generated.
pub fn remap_mesh_geometry(mesh: &mut Mesh, matrix: &Matrix4<f32>, options: &ImportOptions) -> bool {
    for vertex in mesh.vertices.iter_mut() {
        *vertex = transform_as_point(*vertex, matrix);
    }

    if let Some(normals) = mesh.normals.as_mut() {
        for normal in normals.iter_mut() {
            *normal = transform_as_point(*normal, matrix);
        }
    }

    let tangents_ok = if options.import_tangents {
        mesh.recalculate_tangents()
    } else {
        true
    };

    mesh.recalculate_bounds();
    tangents_ok
}

/// Apply the policy's mesh rotation to every mesh reachable from the root.
pub fn remap_scene_meshes(
    scene: &mut Scene,
    policy: &AxisConventionPolicy,
    options: &ImportOptions,
) -> GeometryRemap {
    let matrix = policy.mesh_matrix();
    let mut outcome = GeometryRemap::default();

    for mesh_id in collect_scene_meshes(scene) {
        let mesh = scene.mesh_mut(mesh_id);
        log_debug!("Fixing mesh: {}", mesh.name);

        if !remap_mesh_geometry(mesh, &matrix, options) {
            log_warn!(
                "mesh '{}' lacks normals or UVs; tangents were not regenerated",
                mesh.name
            );
            outcome.tangents_skipped.push(mesh_id);
        }
        outcome.remapped_meshes.push(mesh_id);
    }

    outcome
}
