//! Scene graph of a loaded model.
//!
//! The tree is stored as an arena: nodes live in one `Vec` and refer to each
//! other through [`NodeId`]s. This keeps node handles stable and copyable, so
//! tables built over the tree (such as the material group table) can hold ids
//! while the tree itself stays mutable.
//!
//! Node 0 is always the root, a group named after the imported scene.

use std::sync::Arc;

use crate::data_structures::{
    aabb::Aabb, instance::Instance, material::Material, model::MeshData,
};

/// Handle of a node inside a [`Scene`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Kind tag of a node.
#[derive(Clone, Debug)]
pub enum NodeKind {
    /// A transform-only node; may have children of any kind.
    Group,
    /// A drawable leaf with geometry and a bound material.
    Mesh {
        geometry: Arc<MeshData>,
        material: Arc<Material>,
    },
}

#[derive(Clone, Debug)]
pub struct Node {
    pub name: String,
    pub kind: NodeKind,
    pub local: Instance,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    pub fn is_mesh(&self) -> bool {
        matches!(self.kind, NodeKind::Mesh { .. })
    }

    pub fn material(&self) -> Option<&Arc<Material>> {
        match &self.kind {
            NodeKind::Mesh { material, .. } => Some(material),
            NodeKind::Group => None,
        }
    }

    pub fn geometry(&self) -> Option<&Arc<MeshData>> {
        match &self.kind {
            NodeKind::Mesh { geometry, .. } => Some(geometry),
            NodeKind::Group => None,
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

#[derive(Clone, Debug)]
pub struct Scene {
    nodes: Vec<Node>,
}

impl Scene {
    pub fn new(root_name: impl Into<String>) -> Self {
        Self {
            nodes: vec![Node {
                name: root_name.into(),
                kind: NodeKind::Group,
                local: Instance::default(),
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn add_group(&mut self, parent: NodeId, name: impl Into<String>) -> NodeId {
        self.push(parent, name.into(), NodeKind::Group)
    }

    pub fn add_mesh(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
        geometry: Arc<MeshData>,
        material: Arc<Material>,
    ) -> NodeId {
        self.push(parent, name.into(), NodeKind::Mesh { geometry, material })
    }

    fn push(&mut self, parent: NodeId, name: String, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            name,
            kind,
            local: Instance::default(),
            parent: Some(parent),
            children: Vec::new(),
        });
        self.node_mut(parent).children.push(id);
        id
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn name(&self) -> &str {
        &self.nodes[0].name
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn is_mesh(&self, id: NodeId) -> bool {
        self.nodes[id.0].is_mesh()
    }

    pub fn material(&self, id: NodeId) -> Option<&Arc<Material>> {
        self.get(id).and_then(Node::material)
    }

    /// Rebinds the material of a mesh leaf. Returns `false` for group nodes.
    pub fn set_material(&mut self, id: NodeId, new_material: Arc<Material>) -> bool {
        match self.nodes.get_mut(id.0).map(|node| &mut node.kind) {
            Some(NodeKind::Mesh { material, .. }) => {
                *material = new_material;
                true
            }
            _ => false,
        }
    }

    pub fn set_local_transform(&mut self, id: NodeId, instance: Instance) {
        self.node_mut(id).local = instance;
    }

    /// Node ids in pre-order (parents before children, siblings in order).
    pub fn traverse(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root()];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.children(id).iter().rev());
        }
        order
    }

    /// All mesh leaves with their ids.
    pub fn meshes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.is_mesh())
            .map(|(idx, node)| (NodeId(idx), node))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /**
     * Composes local transforms from the root down to `id`.
     */
    pub fn world_transform(&self, id: NodeId) -> Instance {
        let mut chain = vec![id];
        let mut current = self.nodes[id.0].parent;
        while let Some(parent) = current {
            chain.push(parent);
            current = self.nodes[parent.0].parent;
        }
        chain
            .into_iter()
            .rev()
            .fold(Instance::default(), |world, id| &world * &self.nodes[id.0].local)
    }

    /// World-space bounds of every mesh vertex, `None` without geometry.
    pub fn bounds(&self) -> Option<Aabb> {
        self.meshes()
            .filter_map(|(id, node)| {
                let world = self.world_transform(id);
                let geometry = node.geometry()?;
                Aabb::from_points(
                    geometry
                        .positions
                        .iter()
                        .map(|&position| world.transform_point(position)),
                )
            })
            .reduce(|acc, aabb| acc.union(&aabb))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn triangle() -> Arc<MeshData> {
        Arc::new(MeshData::new(
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            None,
            None,
            None,
        ))
    }

    #[test]
    fn traversal_is_pre_order() {
        let mut scene = Scene::new("Scene");
        let material = Arc::new(Material::untextured("grey", [0.5; 4]));
        let body = scene.add_group(scene.root(), "Body");
        let door = scene.add_mesh(body, "door", triangle(), material.clone());
        let trim = scene.add_group(scene.root(), "Trim");
        let rim = scene.add_mesh(trim, "rim", triangle(), material);

        assert_eq!(scene.traverse(), vec![scene.root(), body, door, trim, rim]);
        assert_eq!(scene.children(body), &[door]);
        assert_eq!(scene.node(rim).parent(), Some(trim));
    }

    #[test]
    fn set_material_only_touches_meshes() {
        let mut scene = Scene::new("Scene");
        let grey = Arc::new(Material::untextured("grey", [0.5; 4]));
        let red = Arc::new(Material::untextured("red", [1.0, 0.0, 0.0, 1.0]));
        let group = scene.add_group(scene.root(), "Body");
        let mesh = scene.add_mesh(group, "door", triangle(), grey);

        assert!(!scene.set_material(group, red.clone()));
        assert!(scene.set_material(mesh, red.clone()));
        assert!(Arc::ptr_eq(scene.material(mesh).expect("mesh"), &red));
        assert!(scene.material(group).is_none());
    }

    #[test]
    fn bounds_follow_world_transforms() {
        let mut scene = Scene::new("Scene");
        let material = Arc::new(Material::untextured("grey", [0.5; 4]));
        let group = scene.add_group(scene.root(), "Lifted");
        scene.set_local_transform(group, cgmath::Vector3::new(0.0, 10.0, 0.0).into());
        scene.add_mesh(group, "tri", triangle(), material);

        let bounds = scene.bounds().expect("one mesh");
        assert_relative_eq!(bounds.min.y, 10.0);
        assert_relative_eq!(bounds.max.y, 11.0);
        assert_relative_eq!(bounds.max.x, 1.0);
    }

    #[test]
    fn renaming_through_node_mut_keeps_structure() {
        let mut scene = Scene::new("Scene");
        let group = scene.add_group(scene.root(), "Group");
        scene.node_mut(group).name = "Body".to_string();

        assert_eq!(scene.node(group).name, "Body");
        assert_eq!(scene.children(scene.root()), &[group]);
        assert_eq!(scene.node(group).parent(), Some(scene.root()));
        assert!(scene.get(NodeId(42)).is_none());
        assert!(scene.material(NodeId(42)).is_none());
    }

    #[test]
    fn empty_scene_has_no_bounds() {
        let scene = Scene::new("Scene");
        assert!(scene.bounds().is_none());
        assert!(scene.is_empty());
    }
}
