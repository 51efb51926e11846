use std::collections::HashMap;
use std::{fs, path::Path};

use anyhow::{Context, Result, bail};
use nalgebra::{Matrix4, Quaternion, UnitQuaternion, Vector2, Vector3, Vector4};
use serde::{Deserialize, Serialize};

use crate::animation::{AnimationClip, AnimationCurve, BindingTarget, CurveBinding, Keyframe};
use crate::log_warn;
use crate::mesh::Mesh;
use crate::scene::{MeshId, MeshRenderer, NodeId, Scene, SceneNode, SkinnedBinding};

const TRANSFORM_TARGET: &str = "Transform";

// ─── Document schema ──────────────────────────────────────────────────────────

/// Interchange form of one imported asset: scene, clips and its user-data blob.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetDocument {
    pub scene: SceneDocument,
    #[serde(default)]
    pub clips: Vec<ClipDocument>,
    /// Raw user-data JSON blob; may be empty.
    #[serde(default)]
    pub user_data: String,
    #[serde(default)]
    pub import_tangents: bool,
}

/// Node 0 is the root; every other node must be reachable from it exactly once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneDocument {
    pub nodes: Vec<NodeDocument>,
    #[serde(default)]
    pub meshes: Vec<MeshDocument>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDocument {
    pub name: String,
    #[serde(default)]
    pub translation: [f32; 3],
    /// Quaternion as (x, y, z, w).
    #[serde(default = "identity_rotation")]
    pub rotation: [f32; 4],
    #[serde(default = "unit_scale")]
    pub scale: [f32; 3],
    #[serde(default)]
    pub children: Vec<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub renderer: Option<RendererDocument>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skin: Option<SkinDocument>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RendererDocument {
    pub mesh: usize,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkinDocument {
    pub mesh: usize,
    pub bones: Vec<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeshDocument {
    pub name: String,
    pub vertices: Vec<[f32; 3]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normals: Option<Vec<[f32; 3]>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uvs: Option<Vec<[f32; 2]>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tangents: Option<Vec<[f32; 4]>>,
    #[serde(default)]
    pub indices: Vec<u32>,
    /// Written on output; recomputed from vertices on input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds: Option<BoundsDocument>,
    /// Column-major 4x4 matrices, one per bone slot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind_poses: Option<Vec<[f32; 16]>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundsDocument {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClipDocument {
    pub name: String,
    #[serde(default)]
    pub bindings: Vec<BindingDocument>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BindingDocument {
    pub path: String,
    /// Animated component type; `Transform` for node transforms.
    #[serde(default = "transform_target")]
    pub target: String,
    pub property: String,
    #[serde(default)]
    pub keys: Vec<Keyframe>,
}

fn identity_rotation() -> [f32; 4] {
    [0.0, 0.0, 0.0, 1.0]
}

fn unit_scale() -> [f32; 3] {
    [1.0, 1.0, 1.0]
}

fn enabled_by_default() -> bool {
    true
}

fn transform_target() -> String {
    TRANSFORM_TARGET.to_string()
}

// ─── File IO ──────────────────────────────────────────────────────────────────

impl AssetDocument {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read asset document: {}", path.display()))?;
        let document: AssetDocument = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse asset document: {}", path.display()))?;
        Ok(document)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)
            .context("failed to serialize asset document as JSON")?;
        fs::write(path, content)
            .with_context(|| format!("failed to write asset document: {}", path.display()))?;
        Ok(())
    }
}

// ─── Scene conversion ─────────────────────────────────────────────────────────

impl SceneDocument {
    /// Validate the node graph and build a [`Scene`] whose node ids equal the
    /// document's node indices.
    pub fn into_scene(self) -> Result<Scene> {
        if self.nodes.is_empty() {
            bail!("scene has no root node");
        }
        validate_node_graph(&self.nodes, self.meshes.len())?;

        let meshes = self
            .meshes
            .into_iter()
            .map(MeshDocument::into_mesh)
            .collect::<Result<Vec<_>>>()?;

        let links: Vec<Vec<usize>> = self.nodes.iter().map(|node| node.children.clone()).collect();
        let nodes = self
            .nodes
            .into_iter()
            .map(NodeDocument::into_node)
            .collect::<Result<Vec<_>>>()?;

        let mut scene = Scene { nodes, meshes };
        for (parent, children) in links.into_iter().enumerate() {
            for child in children {
                scene.attach(NodeId(parent), NodeId(child));
            }
        }
        Ok(scene)
    }

    /// Export the nodes still reachable from the root, reindexed in pre-order.
    ///
    /// Skins whose bones were pruned are dropped with a warning.
    pub fn from_scene(scene: &Scene) -> Self {
        let order: Vec<NodeId> = std::iter::once(scene.root())
            .chain(scene.attached_nodes())
            .collect();
        let index_of: HashMap<NodeId, usize> = order
            .iter()
            .enumerate()
            .map(|(index, id)| (*id, index))
            .collect();

        let nodes = order
            .iter()
            .map(|id| NodeDocument::from_node(scene.node(*id), &index_of))
            .collect();
        let meshes = scene.meshes.iter().map(MeshDocument::from_mesh).collect();

        Self { nodes, meshes }
    }
}

fn validate_node_graph(nodes: &[NodeDocument], mesh_count: usize) -> Result<()> {
    let mut parent_of: Vec<Option<usize>> = vec![None; nodes.len()];

    for (index, node) in nodes.iter().enumerate() {
        for &child in &node.children {
            if child >= nodes.len() {
                bail!("node {} ('{}') lists missing child {}", index, node.name, child);
            }
            if child == 0 {
                bail!("node {} ('{}') lists the root as a child", index, node.name);
            }
            if let Some(previous) = parent_of[child] {
                bail!(
                    "node {} ('{}') has two parents: {} and {}",
                    child,
                    nodes[child].name,
                    previous,
                    index
                );
            }
            parent_of[child] = Some(index);
        }

        if let Some(renderer) = &node.renderer {
            if renderer.mesh >= mesh_count {
                bail!("node {} ('{}') renders missing mesh {}", index, node.name, renderer.mesh);
            }
        }
        if let Some(skin) = &node.skin {
            if skin.mesh >= mesh_count {
                bail!("node {} ('{}') skins missing mesh {}", index, node.name, skin.mesh);
            }
            if let Some(bone) = skin.bones.iter().find(|bone| **bone >= nodes.len()) {
                bail!("node {} ('{}') skin references missing bone {}", index, node.name, bone);
            }
        }
    }

    // Single parents plus a parentless root: anything not reached is part of a cycle.
    let mut reached = vec![false; nodes.len()];
    let mut stack = vec![0usize];
    while let Some(index) = stack.pop() {
        if std::mem::replace(&mut reached[index], true) {
            continue;
        }
        stack.extend(nodes[index].children.iter().copied());
    }
    if let Some(orphan) = reached.iter().position(|r| !r) {
        bail!(
            "node {} ('{}') is not reachable from the root",
            orphan,
            nodes[orphan].name
        );
    }

    Ok(())
}

impl NodeDocument {
    fn into_node(self) -> Result<SceneNode> {
        let [x, y, z, w] = self.rotation;
        let raw = Quaternion::new(w, x, y, z);
        if raw.norm() < 1e-6 {
            bail!("node '{}' has a zero-length rotation", self.name);
        }

        let mut node = SceneNode::new(self.name);
        node.position = Vector3::from(self.translation);
        node.rotation = UnitQuaternion::from_quaternion(raw);
        node.scale = Vector3::from(self.scale);
        node.renderer = self.renderer.map(|renderer| MeshRenderer {
            mesh: MeshId(renderer.mesh),
            enabled: renderer.enabled,
        });
        node.skin = self.skin.map(|skin| SkinnedBinding {
            mesh: MeshId(skin.mesh),
            bones: skin.bones.into_iter().map(NodeId).collect(),
        });
        Ok(node)
    }

    fn from_node(node: &SceneNode, index_of: &HashMap<NodeId, usize>) -> Self {
        let q = node.rotation.quaternion();
        let skin = node.skin.as_ref().and_then(|skin| {
            let bones: Option<Vec<usize>> =
                skin.bones.iter().map(|bone| index_of.get(bone).copied()).collect();
            if bones.is_none() {
                log_warn!(
                    "node '{}' skin references a removed bone; skin binding dropped",
                    node.name
                );
            }
            bones.map(|bones| SkinDocument {
                mesh: skin.mesh.0,
                bones,
            })
        });

        Self {
            name: node.name.clone(),
            translation: node.position.into(),
            rotation: [q.i, q.j, q.k, q.w],
            scale: node.scale.into(),
            children: node
                .children
                .iter()
                .filter_map(|child| index_of.get(child).copied())
                .collect(),
            renderer: node.renderer.as_ref().map(|renderer| RendererDocument {
                mesh: renderer.mesh.0,
                enabled: renderer.enabled,
            }),
            skin,
        }
    }
}

impl MeshDocument {
    fn into_mesh(self) -> Result<Mesh> {
        let vertex_count = self.vertices.len();
        check_len(&self.name, "normals", self.normals.as_ref().map(Vec::len), vertex_count)?;
        check_len(&self.name, "uvs", self.uvs.as_ref().map(Vec::len), vertex_count)?;
        check_len(&self.name, "tangents", self.tangents.as_ref().map(Vec::len), vertex_count)?;
        if let Some(index) = self.indices.iter().find(|i| **i as usize >= vertex_count) {
            bail!("mesh '{}' index {} is out of range", self.name, index);
        }

        let mut mesh = Mesh::new(
            self.name,
            self.vertices.into_iter().map(Vector3::from).collect(),
        );
        mesh.normals = self
            .normals
            .map(|normals| normals.into_iter().map(Vector3::from).collect());
        mesh.uvs = self.uvs.map(|uvs| uvs.into_iter().map(Vector2::from).collect());
        mesh.tangents = self
            .tangents
            .map(|tangents| tangents.into_iter().map(Vector4::from).collect());
        mesh.indices = self.indices;
        mesh.bind_poses = self.bind_poses.map(|poses| {
            poses
                .iter()
                .map(|pose| Matrix4::from_column_slice(pose))
                .collect()
        });
        Ok(mesh)
    }

    fn from_mesh(mesh: &Mesh) -> Self {
        let to_arrays3 = |values: &Vec<Vector3<f32>>| -> Vec<[f32; 3]> {
            values.iter().map(|v| (*v).into()).collect()
        };

        Self {
            name: mesh.name.clone(),
            vertices: to_arrays3(&mesh.vertices),
            normals: mesh.normals.as_ref().map(to_arrays3),
            uvs: mesh
                .uvs
                .as_ref()
                .map(|uvs| uvs.iter().map(|uv| <[f32; 2]>::from(*uv)).collect()),
            tangents: mesh
                .tangents
                .as_ref()
                .map(|tangents| tangents.iter().map(|t| <[f32; 4]>::from(*t)).collect()),
            indices: mesh.indices.clone(),
            bounds: Some(BoundsDocument {
                min: mesh.bounds.min.into(),
                max: mesh.bounds.max.into(),
            }),
            bind_poses: mesh.bind_poses.as_ref().map(|poses| {
                poses
                    .iter()
                    .map(|pose| {
                        let mut columns = [0.0f32; 16];
                        columns.copy_from_slice(pose.as_slice());
                        columns
                    })
                    .collect()
            }),
        }
    }
}

fn check_len(mesh: &str, attribute: &str, len: Option<usize>, expected: usize) -> Result<()> {
    match len {
        Some(len) if len != expected => bail!(
            "mesh '{}' has {} {} for {} vertices",
            mesh,
            len,
            attribute,
            expected
        ),
        _ => Ok(()),
    }
}

// ─── Clip conversion ──────────────────────────────────────────────────────────

impl ClipDocument {
    pub fn into_clip(self) -> AnimationClip {
        AnimationClip {
            name: self.name,
            bindings: self
                .bindings
                .into_iter()
                .map(|binding| CurveBinding {
                    path: binding.path,
                    target: if binding.target == TRANSFORM_TARGET {
                        BindingTarget::Transform
                    } else {
                        BindingTarget::Other(binding.target)
                    },
                    property: binding.property,
                    curve: AnimationCurve { keys: binding.keys },
                })
                .collect(),
        }
    }

    pub fn from_clip(clip: &AnimationClip) -> Self {
        Self {
            name: clip.name.clone(),
            bindings: clip
                .bindings
                .iter()
                .map(|binding| BindingDocument {
                    path: binding.path.clone(),
                    target: match &binding.target {
                        BindingTarget::Transform => transform_target(),
                        BindingTarget::Other(name) => name.clone(),
                    },
                    property: binding.property.clone(),
                    keys: binding.curve.keys.clone(),
                })
                .collect(),
        }
    }
}
