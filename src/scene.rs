use nalgebra::{Matrix4, Point3, Translation3, UnitQuaternion, Vector3};

use crate::log_warn;
use crate::mesh::Mesh;

// ─── Identifiers ──────────────────────────────────────────────────────────────

/// Stable index of a node inside [`Scene::nodes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// Stable index of a mesh inside [`Scene::meshes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshId(pub usize);

// ─── Node components ──────────────────────────────────────────────────────────

/// Static visual renderer attached to a node.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshRenderer {
    pub mesh: MeshId,
    pub enabled: bool,
}

/// Skinned renderer: a mesh plus the bones its bind poses are aligned with.
#[derive(Debug, Clone, PartialEq)]
pub struct SkinnedBinding {
    pub mesh: MeshId,
    pub bones: Vec<NodeId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    pub name: String,
    pub position: Vector3<f32>,
    pub rotation: UnitQuaternion<f32>,
    pub scale: Vector3<f32>,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub renderer: Option<MeshRenderer>,
    pub skin: Option<SkinnedBinding>,
}

impl SceneNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            position: Vector3::zeros(),
            rotation: UnitQuaternion::identity(),
            scale: Vector3::new(1.0, 1.0, 1.0),
            parent: None,
            children: Vec::new(),
            renderer: None,
            skin: None,
        }
    }

    /// Local TRS matrix.
    pub fn local_matrix(&self) -> Matrix4<f32> {
        let translation_matrix = Translation3::from(self.position).to_homogeneous();
        let rotation_matrix = self.rotation.to_homogeneous();
        let scale_matrix = Matrix4::new_nonuniform_scaling(&self.scale);
        translation_matrix * rotation_matrix * scale_matrix
    }
}

// ─── Scene ────────────────────────────────────────────────────────────────────

/// Node arena plus the meshes referenced by its renderers.
///
/// Node 0 is the root. Detached nodes stay in the arena but are no longer
/// reachable from the root.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub nodes: Vec<SceneNode>,
    pub meshes: Vec<Mesh>,
}

impl Scene {
    pub fn new(root_name: impl Into<String>) -> Self {
        Self {
            nodes: vec![SceneNode::new(root_name)],
            meshes: Vec::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> &SceneNode {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut SceneNode {
        &mut self.nodes[id.0]
    }

    pub fn mesh(&self, id: MeshId) -> &Mesh {
        &self.meshes[id.0]
    }

    pub fn mesh_mut(&mut self, id: MeshId) -> &mut Mesh {
        &mut self.meshes[id.0]
    }

    pub fn add_mesh(&mut self, mesh: Mesh) -> MeshId {
        self.meshes.push(mesh);
        MeshId(self.meshes.len() - 1)
    }

    /// Push a node into the arena and append it to `parent`'s children.
    pub fn add_node(&mut self, parent: NodeId, node: SceneNode) -> NodeId {
        let id = self.push_detached(node);
        self.attach(parent, id);
        id
    }

    /// Push a node into the arena without linking it.
    pub fn push_detached(&mut self, mut node: SceneNode) -> NodeId {
        node.parent = None;
        node.children.clear();
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    /// Link `child` under `parent`, keeping child order.
    pub fn attach(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[child.0].parent = Some(parent);
        let children = &mut self.nodes[parent.0].children;
        if !children.contains(&child) {
            children.push(child);
        }
    }

    /// Unlink a node (and implicitly its subtree) from its parent.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|child| *child != id);
        }
    }

    /// True when walking parents from `id` ends at the root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = id;
        let mut steps = 0usize;
        while current != self.root() {
            match self.nodes[current.0].parent {
                Some(parent) => current = parent,
                None => return false,
            }
            steps += 1;
            if steps > self.nodes.len() {
                return false;
            }
        }
        true
    }

    /// Descendants of `id` in depth-first pre-order, `id` itself excluded.
    pub fn descendants_preorder(&self, id: NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut stack: Vec<NodeId> = self.nodes[id.0].children.iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            order.push(current);
            stack.extend(self.nodes[current.0].children.iter().rev().copied());
        }
        order
    }

    /// Non-root nodes reachable from the root, parents before children.
    pub fn attached_nodes(&self) -> Vec<NodeId> {
        self.descendants_preorder(self.root())
    }

    // ─── World-space queries ─────────────────────────────────────────────────

    /// `id` and its ancestors, root-most first.
    ///
    /// The walk stops after as many steps as there are nodes, so a parent
    /// cycle built through [`Scene::attach`] yields a truncated chain.
    pub fn ancestor_chain(&self, id: NodeId) -> Vec<NodeId> {
        let mut chain = vec![id];
        let mut current = id;
        while let Some(parent) = self.nodes[current.0].parent {
            if chain.len() > self.nodes.len() {
                log_warn!(
                    "parent chain of '{}' loops; world pose uses the first {} links",
                    self.nodes[id.0].name,
                    self.nodes.len()
                );
                break;
            }
            chain.push(parent);
            current = parent;
        }
        chain.reverse();
        chain
    }

    pub fn world_matrix(&self, id: NodeId) -> Matrix4<f32> {
        self.ancestor_chain(id)
            .iter()
            .fold(Matrix4::identity(), |world, node| {
                world * self.nodes[node.0].local_matrix()
            })
    }

    pub fn world_position(&self, id: NodeId) -> Vector3<f32> {
        let world = self.world_matrix(id);
        Vector3::new(world[(0, 3)], world[(1, 3)], world[(2, 3)])
    }

    /// Accumulated rotation along the parent chain; scale is ignored.
    pub fn world_rotation(&self, id: NodeId) -> UnitQuaternion<f32> {
        self.ancestor_chain(id)
            .iter()
            .fold(UnitQuaternion::identity(), |world, node| {
                world * self.nodes[node.0].rotation
            })
    }

    /// Rewrite the local position so the node lands on `position` in world space.
    pub fn set_world_position(&mut self, id: NodeId, position: Vector3<f32>) {
        let local = match self.nodes[id.0].parent {
            Some(parent) => {
                let parent_world = self.world_matrix(parent);
                match parent_world.try_inverse() {
                    Some(inverse) => inverse.transform_point(&Point3::from(position)).coords,
                    None => {
                        log_warn!(
                            "parent of '{}' has a singular world matrix; keeping its offset only",
                            self.nodes[id.0].name
                        );
                        position - self.world_position(parent)
                    }
                }
            }
            None => position,
        };
        self.nodes[id.0].position = local;
    }

    /// Rewrite the local rotation so the node's world rotation becomes `rotation`.
    pub fn set_world_rotation(&mut self, id: NodeId, rotation: UnitQuaternion<f32>) {
        let local = match self.nodes[id.0].parent {
            Some(parent) => self.world_rotation(parent).inverse() * rotation,
            None => rotation,
        };
        self.nodes[id.0].rotation = local;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node_at(name: &str, position: Vector3<f32>) -> SceneNode {
        let mut node = SceneNode::new(name);
        node.position = position;
        node
    }

    #[test]
    fn given_nested_nodes_when_computing_world_position_then_parent_chain_is_applied() {
        let mut scene = Scene::new("root");
        let mut parent = node_at("parent", Vector3::new(0.0, 1.0, 0.0));
        parent.rotation = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), std::f32::consts::FRAC_PI_2);
        let parent = scene.add_node(scene.root(), parent);
        let child = scene.add_node(parent, node_at("child", Vector3::new(2.0, 0.0, 0.0)));

        let world = scene.world_position(child);
        assert!((world - Vector3::new(0.0, 3.0, 0.0)).norm() < 0.0001);
    }

    #[test]
    fn given_world_targets_when_setting_world_pose_then_queries_return_targets() {
        let mut scene = Scene::new("root");
        let mut parent = node_at("parent", Vector3::new(1.0, 2.0, 3.0));
        parent.rotation = UnitQuaternion::from_euler_angles(0.2, 0.4, -0.3);
        parent.scale = Vector3::new(2.0, 2.0, 2.0);
        let parent = scene.add_node(scene.root(), parent);
        let child = scene.add_node(parent, SceneNode::new("child"));

        let target_position = Vector3::new(-4.0, 0.5, 7.0);
        let target_rotation = UnitQuaternion::from_euler_angles(-0.5, 0.1, 0.9);
        scene.set_world_position(child, target_position);
        scene.set_world_rotation(child, target_rotation);

        assert!((scene.world_position(child) - target_position).norm() < 0.0001);
        assert!(scene.world_rotation(child).angle_to(&target_rotation) < 0.0001);
    }

    #[test]
    fn given_tree_when_listing_preorder_then_parents_precede_children_in_order() {
        let mut scene = Scene::new("root");
        let a = scene.add_node(scene.root(), SceneNode::new("a"));
        let a1 = scene.add_node(a, SceneNode::new("a1"));
        let b = scene.add_node(scene.root(), SceneNode::new("b"));
        let a2 = scene.add_node(a, SceneNode::new("a2"));

        assert_eq!(scene.attached_nodes(), vec![a, a1, a2, b]);
    }

    #[test]
    fn given_detached_subtree_when_checking_attachment_then_descendants_are_unreachable() {
        let mut scene = Scene::new("root");
        let a = scene.add_node(scene.root(), SceneNode::new("a"));
        let a1 = scene.add_node(a, SceneNode::new("a1"));

        scene.detach(a);

        assert!(!scene.is_attached(a));
        assert!(!scene.is_attached(a1));
        assert!(scene.is_attached(scene.root()));
        assert!(scene.attached_nodes().is_empty());
    }

    #[test]
    fn given_parent_cycle_when_computing_world_pose_then_walk_terminates() {
        let mut scene = Scene::new("root");
        let mut a = node_at("a", Vector3::new(1.0, 0.0, 0.0));
        a.rotation = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), 0.5);
        let a = scene.push_detached(a);
        let b = scene.push_detached(node_at("b", Vector3::new(0.0, 1.0, 0.0)));
        scene.attach(a, b);
        scene.attach(b, a);

        let chain = scene.ancestor_chain(a);
        let position = scene.world_position(a);
        let rotation = scene.world_rotation(b);

        assert_eq!(chain.len(), scene.nodes.len() + 1);
        assert_eq!(chain.last(), Some(&a));
        assert!(position.iter().all(|value| value.is_finite()));
        assert!(rotation.angle().is_finite());
        assert!(!scene.is_attached(a));
    }

    #[test]
    fn given_nested_nodes_when_listing_ancestors_then_root_comes_first() {
        let mut scene = Scene::new("root");
        let a = scene.add_node(scene.root(), SceneNode::new("a"));
        let a1 = scene.add_node(a, SceneNode::new("a1"));

        assert_eq!(scene.ancestor_chain(a1), vec![scene.root(), a, a1]);
    }
}
