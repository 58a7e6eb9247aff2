//! Scene graph stored as an index arena.
//!
//! Nodes own their children through ordered id lists; the parent id on each node is a
//! lookup-only back reference. Every traversal used for packing and drawing goes through
//! [`SceneGraph::pre_order`], so both passes see the exact same node sequence.

use std::collections::HashSet;

use cgmath::Matrix4;

use crate::{
    data_structures::shape::{Pose, Shape},
    error::{Result, ViewerError},
};

/// Index of a node in its [`SceneGraph`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// How the renderer decides which texture roles to bind for a node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TexturePolicy {
    /// Always bind the diffuse and specular roles.
    #[default]
    Default,
    /// Follows the primary body layer flag.
    PrimaryBody,
    /// Follows the cloud layer flag.
    CloudShell,
}

#[derive(Debug)]
pub struct SceneNode {
    name: String,
    shape: Option<Shape>,
    policy: TexturePolicy,
    local: Pose,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl SceneNode {
    pub fn new(name: impl Into<String>, shape: Option<Shape>) -> Self {
        Self {
            name: name.into(),
            shape,
            policy: TexturePolicy::Default,
            local: Pose::default(),
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn with_policy(mut self, policy: TexturePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shape(&self) -> Option<&Shape> {
        self.shape.as_ref()
    }

    pub fn shape_mut(&mut self) -> Option<&mut Shape> {
        self.shape.as_mut()
    }

    pub fn policy(&self) -> TexturePolicy {
        self.policy
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// The node's pose. A node with a shape keeps its pose on the shape, which is what the
    /// renderer reads; a shapeless node keeps its own.
    pub fn pose(&self) -> &Pose {
        match &self.shape {
            Some(shape) => shape.pose(),
            None => &self.local,
        }
    }

    pub fn rotate(&mut self, dx: f32, dy: f32, dz: f32) {
        match &mut self.shape {
            Some(shape) => shape.rotate(dx, dy, dz),
            None => {
                self.local.angle[0] += dx;
                self.local.angle[1] += dy;
                self.local.angle[2] += dz;
            }
        }
    }

    pub fn rotate_to(&mut self, x: f32, y: f32, z: f32) {
        match &mut self.shape {
            Some(shape) => shape.rotate_to(x, y, z),
            None => self.local.angle = [x, y, z],
        }
    }

    pub fn translate(&mut self, dx: f32, dy: f32, dz: f32) {
        match &mut self.shape {
            Some(shape) => shape.translate(dx, dy, dz),
            None => self.local.position += cgmath::Vector3::new(dx, dy, dz),
        }
    }

    pub fn translate_to(&mut self, x: f32, y: f32, z: f32) {
        match &mut self.shape {
            Some(shape) => shape.translate_to(x, y, z),
            None => self.local.position = cgmath::Vector3::new(x, y, z),
        }
    }

    pub fn reset_rotation(&mut self) {
        self.rotate_to(0.0, 0.0, 0.0);
    }

    pub fn reset_translation(&mut self) {
        self.translate_to(0.0, 0.0, 0.0);
    }
}

#[derive(Debug)]
pub struct SceneGraph {
    nodes: Vec<SceneNode>,
    root: NodeId,
}

impl SceneGraph {
    pub fn new(root: SceneNode) -> Self {
        let mut root = root;
        root.parent = None;
        root.children.clear();
        Self {
            nodes: vec![root],
            root: NodeId(0),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(id.0)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        self.nodes.get_mut(id.0)
    }

    /// Appends `child` as the last child of `parent` and returns its id.
    pub fn add_child(&mut self, parent: NodeId, child: SceneNode) -> Result<NodeId> {
        self.check_id(parent)?;
        let mut child = child;
        child.parent = Some(parent);
        child.children.clear();
        let id = NodeId(self.nodes.len());
        self.nodes.push(child);
        self.nodes[parent.0].children.push(id);
        Ok(id)
    }

    /// Inserts a node that belongs to no parent yet. Attach it with [`SceneGraph::link`].
    pub fn add_detached(&mut self, node: SceneNode) -> NodeId {
        let mut node = node;
        node.parent = None;
        node.children.clear();
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    /// Attaches an existing detached node under `parent`.
    ///
    /// Rejects nodes that already have an owner and links that would close a cycle.
    pub fn link(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.check_id(parent)?;
        self.check_id(child)?;
        if child == self.root {
            return Err(ViewerError::InvalidGraph(
                "the root node cannot become a child".to_string(),
            ));
        }
        if let Some(owner) = self.nodes[child.0].parent {
            return Err(ViewerError::InvalidGraph(format!(
                "node '{}' is already owned by '{}'",
                self.nodes[child.0].name, self.nodes[owner.0].name
            )));
        }
        if self.ancestors(parent).any(|ancestor| ancestor == child) || parent == child {
            return Err(ViewerError::InvalidGraph(format!(
                "linking '{}' under '{}' would create a cycle",
                self.nodes[child.0].name, self.nodes[parent.0].name
            )));
        }
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
        Ok(())
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(SceneNode::parent)
    }

    /// Walks the parent references from `id` (exclusive) up to the root.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let limit = self.nodes.len();
        std::iter::successors(self.parent(id), move |&current| self.parent(current)).take(limit)
    }

    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.pre_order()
            .ok()?
            .into_iter()
            .find(|&id| self.nodes[id.0].name == name)
    }

    /// Depth-first pre-order from the root, children in list order.
    ///
    /// Fails with [`ViewerError::InvalidGraph`] if a node is reached twice.
    pub fn pre_order(&self) -> Result<Vec<NodeId>> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut visited = HashSet::with_capacity(self.nodes.len());
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                return Err(ViewerError::InvalidGraph(format!(
                    "node '{}' is reachable more than once",
                    self.nodes[id.0].name
                )));
            }
            let node = self.nodes.get(id.0).ok_or_else(|| {
                ViewerError::InvalidGraph(format!("dangling child id {}", id.0))
            })?;
            order.push(id);
            stack.extend(node.children.iter().rev().copied());
        }
        Ok(order)
    }

    /// Pre-order ids of the nodes that carry a shape.
    pub fn shape_nodes(&self) -> Result<Vec<NodeId>> {
        Ok(self
            .pre_order()?
            .into_iter()
            .filter(|&id| self.nodes[id.0].shape.is_some())
            .collect())
    }

    pub fn vertex_buffer_size(&self) -> Result<u64> {
        Ok(self
            .shape_nodes()?
            .into_iter()
            .filter_map(|id| self.nodes[id.0].shape())
            .map(Shape::vertex_buffer_size)
            .sum())
    }

    pub fn index_buffer_size(&self) -> Result<u64> {
        Ok(self
            .shape_nodes()?
            .into_iter()
            .filter_map(|id| self.nodes[id.0].shape())
            .map(Shape::index_buffer_size)
            .sum())
    }

    /// Composes the poses from the root down to `id`.
    ///
    /// Drawing uses each shape's own pose; this is only for upward queries such as locating a
    /// node in world space.
    pub fn world_transform(&self, id: NodeId) -> Result<Matrix4<f32>> {
        let node = self.node(id).ok_or_else(|| {
            ViewerError::InvalidGraph(format!("unknown node id {}", id.0))
        })?;
        let mut world = node.pose().to_matrix();
        for ancestor in self.ancestors(id) {
            world = self.nodes[ancestor.0].pose().to_matrix() * world;
        }
        Ok(world)
    }

    pub fn reset_rotations(&mut self) {
        self.nodes.iter_mut().for_each(SceneNode::reset_rotation);
    }

    pub fn shapes_mut(&mut self) -> impl Iterator<Item = &mut Shape> {
        self.nodes.iter_mut().filter_map(SceneNode::shape_mut)
    }

    fn check_id(&self, id: NodeId) -> Result<()> {
        if id.0 < self.nodes.len() {
            Ok(())
        } else {
            Err(ViewerError::InvalidGraph(format!("unknown node id {}", id.0)))
        }
    }
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new(SceneNode::new("root", None))
    }
}
