use std::fmt;

use glam::Mat4;
use slotmap::SlotMap;

use crate::material::MaterialId;
use crate::math::Transform;
use crate::mesh::MeshId;

use super::{Camera, Light};

slotmap::new_key_type! {
    /// Handle to a scene node.
    ///
    /// Generational: ids of removed nodes stay invalid even if the slot is
    /// reused later.
    pub struct NodeId;
}

/// Error produced by structural scene operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneError {
    /// The id does not refer to a live node.
    UnknownNode,
    /// The requested reparent would make a node its own ancestor.
    WouldCycle,
}

impl fmt::Display for SceneError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SceneError::UnknownNode => write!(f, "node id does not refer to a live node"),
            SceneError::WouldCycle => write!(f, "reparenting would create a cycle"),
        }
    }
}

impl std::error::Error for SceneError {}

/// A renderable attachment: which mesh to draw with which material.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MeshInstance {
    pub mesh: MeshId,
    pub material: MaterialId,
}

/// A scene node.
///
/// Structure (`parent`, `children`) and the local transform are private —
/// they are mutated through `Scene` so the world-matrix cache stays coherent.
/// Components are plain public fields.
#[derive(Debug)]
pub struct Node {
    name: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,

    local: Transform,
    /// Cached world matrix; valid only while `world_dirty` is false.
    world: Mat4,
    world_dirty: bool,

    /// Local visibility. An invisible node prunes its whole subtree from
    /// draw collection (but not from transform queries).
    pub visible: bool,

    pub mesh: Option<MeshInstance>,
    pub light: Option<Light>,
    pub camera: Option<Camera>,
}

impl Node {
    fn new(name: String) -> Self {
        Self {
            name,
            parent: None,
            children: Vec::new(),
            local: Transform::IDENTITY,
            world: Mat4::IDENTITY,
            world_dirty: true,
            visible: true,
            mesh: None,
            light: None,
            camera: None,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    #[inline]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    #[inline]
    pub fn local_transform(&self) -> &Transform {
        &self.local
    }

    /// The cached world matrix.
    ///
    /// Only meaningful after [`Scene::flush_transforms`] (or a lazy
    /// [`Scene::world_matrix`] call covering this node) in the current state
    /// of the tree.
    #[inline]
    pub fn world(&self) -> Mat4 {
        debug_assert!(!self.world_dirty, "world matrix read while dirty");
        self.world
    }
}

/// The node tree.
///
/// World matrices are cached per node and recomputed lazily: mutating a local
/// transform (or the tree structure) marks the node and all its descendants
/// dirty, pruned at nodes that are already dirty — a dirty node's descendants
/// are dirty by construction.
#[derive(Debug, Default)]
pub struct Scene {
    nodes: SlotMap<NodeId, Node>,
    /// Nodes without a parent, in spawn order. Defines traversal order.
    roots: Vec<NodeId>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[inline]
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Mutable component access (`visible`, `mesh`, `light`, `camera`).
    ///
    /// Structure and transform are not reachable through this — use the
    /// dedicated `Scene` methods.
    #[inline]
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    /// First node with the given name, in an unspecified order.
    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.nodes.iter().find(|(_, n)| n.name == name).map(|(id, _)| id)
    }

    // ── structure ─────────────────────────────────────────────────────────

    /// Spawns a root-level node.
    pub fn spawn(&mut self, name: impl Into<String>) -> NodeId {
        let id = self.nodes.insert(Node::new(name.into()));
        self.roots.push(id);
        id
    }

    /// Spawns a node attached under `parent`.
    pub fn spawn_child(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
    ) -> Result<NodeId, SceneError> {
        if !self.nodes.contains_key(parent) {
            return Err(SceneError::UnknownNode);
        }
        let id = self.nodes.insert(Node::new(name.into()));
        self.nodes[id].parent = Some(parent);
        self.nodes[parent].children.push(id);
        Ok(id)
    }

    /// Moves `id` under `new_parent` (or to the root level for `None`).
    ///
    /// Fails with [`SceneError::WouldCycle`] if `new_parent` is `id` itself or
    /// one of its descendants. The node keeps its local transform, so its
    /// world transform changes with the new parent chain.
    pub fn set_parent(&mut self, id: NodeId, new_parent: Option<NodeId>) -> Result<(), SceneError> {
        if !self.nodes.contains_key(id) {
            return Err(SceneError::UnknownNode);
        }

        if let Some(p) = new_parent {
            if !self.nodes.contains_key(p) {
                return Err(SceneError::UnknownNode);
            }
            // Walk up from the new parent; hitting `id` means a cycle.
            let mut cursor = Some(p);
            while let Some(c) = cursor {
                if c == id {
                    return Err(SceneError::WouldCycle);
                }
                cursor = self.nodes[c].parent;
            }
        }

        self.detach(id);

        self.nodes[id].parent = new_parent;
        match new_parent {
            Some(p) => self.nodes[p].children.push(id),
            None => self.roots.push(id),
        }

        self.mark_subtree_dirty(id);
        Ok(())
    }

    /// Removes `id` and its whole subtree.
    pub fn remove(&mut self, id: NodeId) -> Result<(), SceneError> {
        if !self.nodes.contains_key(id) {
            return Err(SceneError::UnknownNode);
        }

        self.detach(id);

        let mut stack = vec![id];
        while let Some(n) = stack.pop() {
            if let Some(node) = self.nodes.remove(n) {
                stack.extend(node.children);
            }
        }
        Ok(())
    }

    /// Unlinks `id` from its parent's child list (or the root list).
    fn detach(&mut self, id: NodeId) {
        match self.nodes[id].parent {
            Some(p) => {
                let children = &mut self.nodes[p].children;
                children.retain(|&c| c != id);
            }
            None => self.roots.retain(|&r| r != id),
        }
        self.nodes[id].parent = None;
    }

    // ── transforms ────────────────────────────────────────────────────────

    #[inline]
    pub fn local_transform(&self, id: NodeId) -> Option<&Transform> {
        self.nodes.get(id).map(|n| &n.local)
    }

    pub fn set_local_transform(&mut self, id: NodeId, t: Transform) -> Result<(), SceneError> {
        let node = self.nodes.get_mut(id).ok_or(SceneError::UnknownNode)?;
        node.local = t;
        self.mark_subtree_dirty(id);
        Ok(())
    }

    /// In-place transform edit; marks the subtree dirty afterwards.
    pub fn update_transform(
        &mut self,
        id: NodeId,
        f: impl FnOnce(&mut Transform),
    ) -> Result<(), SceneError> {
        let node = self.nodes.get_mut(id).ok_or(SceneError::UnknownNode)?;
        f(&mut node.local);
        self.mark_subtree_dirty(id);
        Ok(())
    }

    pub fn set_position(&mut self, id: NodeId, position: glam::Vec3) -> Result<(), SceneError> {
        self.update_transform(id, |t| t.position = position)
    }

    pub fn set_rotation(&mut self, id: NodeId, rotation: glam::Quat) -> Result<(), SceneError> {
        self.update_transform(id, |t| t.rotation = rotation)
    }

    pub fn set_scale(&mut self, id: NodeId, scale: glam::Vec3) -> Result<(), SceneError> {
        self.update_transform(id, |t| t.scale = scale)
    }

    /// World matrix of `id`, recomputing lazily along the parent chain.
    pub fn world_matrix(&mut self, id: NodeId) -> Option<Mat4> {
        let node = self.nodes.get(id)?;
        if !node.world_dirty {
            return Some(node.world);
        }

        let parent_world = match node.parent {
            // Recursion depth is the tree depth; scenes are shallow.
            Some(p) => self.world_matrix(p)?,
            None => Mat4::IDENTITY,
        };

        let node = &mut self.nodes[id];
        node.world = parent_world * node.local.matrix();
        node.world_dirty = false;
        Some(node.world)
    }

    /// Recomputes every dirty world matrix in one pass.
    ///
    /// Clean subtrees whose ancestors are also clean are skipped entirely;
    /// after this call [`Node::world`] is valid for every node.
    pub fn flush_transforms(&mut self) {
        let mut stack: Vec<(NodeId, Mat4, bool)> = self
            .roots
            .iter()
            .rev()
            .map(|&r| (r, Mat4::IDENTITY, false))
            .collect();

        while let Some((id, parent_world, parent_changed)) = stack.pop() {
            let Some(node) = self.nodes.get_mut(id) else {
                continue;
            };

            let changed = node.world_dirty || parent_changed;
            if changed {
                node.world = parent_world * node.local.matrix();
                node.world_dirty = false;
            }

            let world = node.world;
            stack.extend(node.children.iter().rev().map(|&c| (c, world, changed)));
        }
    }

    /// Marks `id` and all descendants dirty.
    ///
    /// Pruned at already-dirty nodes: their descendants were marked when they
    /// became dirty, so the invariant "dirty implies descendants dirty" holds.
    fn mark_subtree_dirty(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(n) = stack.pop() {
            let Some(node) = self.nodes.get_mut(n) else {
                continue;
            };
            if node.world_dirty {
                continue;
            }
            node.world_dirty = true;
            stack.extend(node.children.iter().copied());
        }
    }

    // ── traversal ─────────────────────────────────────────────────────────

    /// Depth-first pre-order walk over visible nodes.
    ///
    /// Children are visited in insertion order; an invisible node prunes its
    /// subtree. Call [`Scene::flush_transforms`] first if the callback reads
    /// [`Node::world`].
    pub fn visit_visible<F>(&self, mut f: F)
    where
        F: FnMut(NodeId, &Node),
    {
        let mut stack: Vec<NodeId> = self.roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get(id) else {
                continue;
            };
            if !node.visible {
                continue;
            }
            f(id, node);
            stack.extend(node.children.iter().rev().copied());
        }
    }

    /// Iterates all live nodes in arena order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Quat, Vec3};

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-4
    }

    fn world_pos(scene: &mut Scene, id: NodeId) -> Vec3 {
        scene
            .world_matrix(id)
            .expect("node exists")
            .to_scale_rotation_translation()
            .2
    }

    // ── hierarchy composition ─────────────────────────────────────────────

    #[test]
    fn child_world_composes_with_parent() {
        let mut scene = Scene::new();
        let parent = scene.spawn("parent");
        let child = scene.spawn_child(parent, "child").unwrap();

        scene.set_position(parent, Vec3::new(10.0, 0.0, 0.0)).unwrap();
        scene.set_position(child, Vec3::new(0.0, 5.0, 0.0)).unwrap();

        assert!(approx(world_pos(&mut scene, child), Vec3::new(10.0, 5.0, 0.0)));
    }

    #[test]
    fn parent_rotation_moves_child() {
        let mut scene = Scene::new();
        let parent = scene.spawn("parent");
        let child = scene.spawn_child(parent, "child").unwrap();
        scene.set_position(child, Vec3::new(1.0, 0.0, 0.0)).unwrap();

        scene
            .set_rotation(parent, Quat::from_rotation_y(std::f32::consts::FRAC_PI_2))
            .unwrap();

        // 90° about +Y carries +X onto -Z.
        assert!(approx(world_pos(&mut scene, child), Vec3::new(0.0, 0.0, -1.0)));
    }

    #[test]
    fn parent_scale_applies_to_child_offset() {
        let mut scene = Scene::new();
        let parent = scene.spawn("parent");
        let child = scene.spawn_child(parent, "child").unwrap();
        scene.set_scale(parent, Vec3::splat(2.0)).unwrap();
        scene.set_position(child, Vec3::new(1.0, 0.0, 0.0)).unwrap();

        assert!(approx(world_pos(&mut scene, child), Vec3::new(2.0, 0.0, 0.0)));
    }

    // ── dirty propagation ─────────────────────────────────────────────────

    #[test]
    fn mutating_ancestor_dirties_cached_descendant() {
        let mut scene = Scene::new();
        let a = scene.spawn("a");
        let b = scene.spawn_child(a, "b").unwrap();
        let c = scene.spawn_child(b, "c").unwrap();

        // Prime the caches.
        scene.flush_transforms();
        assert!(approx(world_pos(&mut scene, c), Vec3::ZERO));

        // Mutate the grandparent; the grandchild must observe the change.
        scene.set_position(a, Vec3::new(0.0, 0.0, 7.0)).unwrap();
        assert!(approx(world_pos(&mut scene, c), Vec3::new(0.0, 0.0, 7.0)));
    }

    #[test]
    fn flush_clears_all_dirty_flags() {
        let mut scene = Scene::new();
        let a = scene.spawn("a");
        let b = scene.spawn_child(a, "b").unwrap();
        scene.set_position(a, Vec3::X).unwrap();

        scene.flush_transforms();

        assert!(!scene.node(a).unwrap().world_dirty);
        assert!(!scene.node(b).unwrap().world_dirty);
        // After a flush the cached getter is usable directly.
        assert!(approx(
            scene.node(b).unwrap().world().to_scale_rotation_translation().2,
            Vec3::X
        ));
    }

    #[test]
    fn clean_sibling_is_not_dirtied() {
        let mut scene = Scene::new();
        let a = scene.spawn("a");
        let b = scene.spawn("b");
        scene.flush_transforms();

        scene.set_position(a, Vec3::X).unwrap();

        assert!(scene.node(a).unwrap().world_dirty);
        assert!(!scene.node(b).unwrap().world_dirty);
    }

    // ── reparenting ───────────────────────────────────────────────────────

    #[test]
    fn reparent_changes_world_transform() {
        let mut scene = Scene::new();
        let a = scene.spawn("a");
        let b = scene.spawn("b");
        scene.set_position(a, Vec3::new(100.0, 0.0, 0.0)).unwrap();
        scene.set_position(b, Vec3::new(0.0, 1.0, 0.0)).unwrap();

        assert!(approx(world_pos(&mut scene, b), Vec3::new(0.0, 1.0, 0.0)));

        scene.set_parent(b, Some(a)).unwrap();
        assert!(approx(world_pos(&mut scene, b), Vec3::new(100.0, 1.0, 0.0)));

        scene.set_parent(b, None).unwrap();
        assert!(approx(world_pos(&mut scene, b), Vec3::new(0.0, 1.0, 0.0)));
    }

    #[test]
    fn reparent_rejects_cycles() {
        let mut scene = Scene::new();
        let a = scene.spawn("a");
        let b = scene.spawn_child(a, "b").unwrap();
        let c = scene.spawn_child(b, "c").unwrap();

        assert_eq!(scene.set_parent(a, Some(c)), Err(SceneError::WouldCycle));
        assert_eq!(scene.set_parent(a, Some(a)), Err(SceneError::WouldCycle));
        // The failed attempts must not have corrupted the structure.
        assert_eq!(scene.node(b).unwrap().parent(), Some(a));
    }

    // ── removal ───────────────────────────────────────────────────────────

    #[test]
    fn remove_takes_the_whole_subtree() {
        let mut scene = Scene::new();
        let a = scene.spawn("a");
        let b = scene.spawn_child(a, "b").unwrap();
        let c = scene.spawn_child(b, "c").unwrap();
        let other = scene.spawn("other");

        scene.remove(b).unwrap();

        assert!(scene.contains(a));
        assert!(!scene.contains(b));
        assert!(!scene.contains(c));
        assert!(scene.contains(other));
        assert!(scene.node(a).unwrap().children().is_empty());
    }

    #[test]
    fn removed_ids_stay_invalid() {
        let mut scene = Scene::new();
        let a = scene.spawn("a");
        scene.remove(a).unwrap();

        assert_eq!(scene.remove(a), Err(SceneError::UnknownNode));
        assert!(scene.world_matrix(a).is_none());
        // Slot reuse must not resurrect the old id.
        let _b = scene.spawn("b");
        assert!(!scene.contains(a));
    }

    // ── traversal / visibility ────────────────────────────────────────────

    #[test]
    fn visit_order_is_preorder_insertion() {
        let mut scene = Scene::new();
        let a = scene.spawn("a");
        let _a1 = scene.spawn_child(a, "a1").unwrap();
        let _a2 = scene.spawn_child(a, "a2").unwrap();
        let _b = scene.spawn("b");

        let mut names = Vec::new();
        scene.visit_visible(|_, n| names.push(n.name().to_string()));
        assert_eq!(names, ["a", "a1", "a2", "b"]);
    }

    #[test]
    fn invisible_node_prunes_subtree() {
        let mut scene = Scene::new();
        let a = scene.spawn("a");
        let _a1 = scene.spawn_child(a, "a1").unwrap();
        let b = scene.spawn("b");

        scene.node_mut(a).unwrap().visible = false;

        let mut seen = Vec::new();
        scene.visit_visible(|id, _| seen.push(id));
        assert_eq!(seen, [b]);
    }

    #[test]
    fn invisible_node_still_has_transforms() {
        let mut scene = Scene::new();
        let a = scene.spawn("a");
        scene.node_mut(a).unwrap().visible = false;
        scene.set_position(a, Vec3::Y).unwrap();
        assert!(approx(world_pos(&mut scene, a), Vec3::Y));
    }

    #[test]
    fn find_by_name() {
        let mut scene = Scene::new();
        let _a = scene.spawn("camera-rig");
        let b = scene.spawn("hero");
        assert_eq!(scene.find("hero"), Some(b));
        assert_eq!(scene.find("missing"), None);
    }
}
