//! Single owning store for attached entities.
//!
//! All attached entities live in one map keyed by [`EntityId`]. Parent and
//! child links are plain ids, so ownership never forms a cycle and detaching
//! a subtree is one walk over the map.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use trellis_core::ConnectionId;

use super::aspect::{Aspect, CellValue, ItemFlags};
use super::entity::{Entity, EntityId, TreeEntity};
use crate::error::{ModelError, ModelResult};

/// A cell write observed on an attached entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellChange {
    pub entity: EntityId,
    pub column: usize,
    pub aspect: Aspect,
}

/// A link change between two attached entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArenaEvent {
    ChildAdded { parent: EntityId, child: EntityId },
    ChildRemoved { parent: EntityId, child: EntityId },
}

type ChangeQueue = Arc<Mutex<Vec<CellChange>>>;

struct ArenaNode {
    entity: Entity,
    parent: Option<EntityId>,
    children: Vec<EntityId>,
    /// Our slot on `entity.data_changed()`.
    hook: ConnectionId,
}

/// Owning store for one model's entity tree.
///
/// Mutations do not notify anyone directly: cell writes and link changes
/// are queued and drained by the owning model with
/// [`take_changes`](Self::take_changes) and [`take_events`](Self::take_events)
/// once its lock is released.
pub struct EntityArena {
    root: EntityId,
    nodes: HashMap<EntityId, ArenaNode>,
    changes: ChangeQueue,
    events: Vec<ArenaEvent>,
}

impl std::fmt::Debug for EntityArena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityArena")
            .field("root", &self.root)
            .field("len", &self.nodes.len())
            .finish()
    }
}

impl EntityArena {
    /// Create an arena owning `root`. The root is never addressable by row.
    pub fn new(root: Entity) -> Self {
        let mut arena = Self {
            root: root.id(),
            nodes: HashMap::new(),
            changes: Arc::new(Mutex::new(Vec::new())),
            events: Vec::new(),
        };
        arena.adopt(root, None);
        arena
    }

    pub fn root(&self) -> EntityId {
        self.root
    }

    /// Number of attached entities, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.nodes.get(&id).map(|node| &node.entity)
    }

    /// `None` for the root and for unknown ids.
    pub fn parent(&self, id: EntityId) -> Option<EntityId> {
        self.nodes.get(&id).and_then(|node| node.parent)
    }

    /// Children of `id`, in row order. Empty for unknown ids.
    pub fn children(&self, id: EntityId) -> &[EntityId] {
        self.nodes
            .get(&id)
            .map(|node| node.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn child(&self, id: EntityId, row: usize) -> Option<EntityId> {
        self.children(id).get(row).copied()
    }

    pub fn child_count(&self, id: EntityId) -> usize {
        self.children(id).len()
    }

    pub fn column_count(&self, id: EntityId) -> usize {
        self.get(id).map_or(0, Entity::column_count)
    }

    /// Position of `id` among its siblings, found by a linear scan of the
    /// parent's children. 0 for the root and for unknown ids.
    pub fn row(&self, id: EntityId) -> usize {
        self.parent(id)
            .and_then(|parent| self.children(parent).iter().position(|&c| c == id))
            .unwrap_or(0)
    }

    /// Depth-first, pre-order walk of the subtree under `id`, `id` first.
    pub fn descendants(&self, id: EntityId) -> Vec<EntityId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if !self.contains(current) {
                continue;
            }
            out.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        out
    }

    /// Write a cell on an attached entity. Returns `false` for unknown ids.
    pub fn set_data(&mut self, id: EntityId, column: usize, value: CellValue, aspect: Aspect) -> bool {
        match self.nodes.get_mut(&id) {
            Some(node) => node.entity.set_data(column, value, aspect),
            None => false,
        }
    }

    /// Remove a cell from an attached entity. Returns `false` for unknown ids.
    pub fn clear_data(&mut self, id: EntityId, column: usize, aspect: Aspect) -> bool {
        match self.nodes.get_mut(&id) {
            Some(node) => {
                node.entity.clear_data(column, aspect);
                true
            }
            None => false,
        }
    }

    pub fn insert_flags(&mut self, id: EntityId, flags: ItemFlags) {
        for current in self.descendants(id) {
            if let Some(node) = self.nodes.get_mut(&current) {
                node.entity.insert_flags(flags);
            }
        }
    }

    pub fn remove_flags(&mut self, id: EntityId, flags: ItemFlags) {
        for current in self.descendants(id) {
            if let Some(node) = self.nodes.get_mut(&current) {
                node.entity.remove_flags(flags);
            }
        }
    }

    /// Attach a detached subtree as child `position` of `parent`.
    pub fn attach(&mut self, parent: EntityId, position: usize, tree: TreeEntity) -> ModelResult<EntityId> {
        let row_count = match self.nodes.get(&parent) {
            Some(node) => node.children.len(),
            None => return Err(ModelError::UnknownEntity(parent)),
        };
        if position > row_count {
            return Err(ModelError::OutOfRange {
                position,
                count: 1,
                row_count,
            });
        }
        if self.contains(tree.id()) {
            return Err(ModelError::violation(format!("{} is already attached", tree.id())));
        }

        let id = self.adopt_tree(tree, parent);
        if let Some(node) = self.nodes.get_mut(&parent) {
            node.children.insert(position, id);
        }
        self.events.push(ArenaEvent::ChildAdded { parent, child: id });
        Ok(id)
    }

    /// Detach child `position` of `parent` together with its descendants.
    pub fn detach(&mut self, parent: EntityId, position: usize) -> ModelResult<TreeEntity> {
        let child = self
            .child(parent, position)
            .ok_or_else(|| ModelError::OutOfRange {
                position,
                count: 1,
                row_count: self.child_count(parent),
            })?;
        self.detach_child(parent, child)
    }

    /// Detach `child` from `parent`.
    ///
    /// Fails with a structural violation when `child` is not in `parent`'s
    /// children.
    pub fn detach_child(&mut self, parent: EntityId, child: EntityId) -> ModelResult<TreeEntity> {
        let position = self
            .children(parent)
            .iter()
            .position(|&c| c == child)
            .ok_or_else(|| ModelError::violation(format!("{child} is not a child of {parent}")))?;

        if let Some(node) = self.nodes.get_mut(&parent) {
            node.children.remove(position);
        }
        let tree = self.release_tree(child)?;
        self.events.push(ArenaEvent::ChildRemoved { parent, child });
        Ok(tree)
    }

    /// Drain queued cell writes.
    pub fn take_changes(&mut self) -> Vec<CellChange> {
        std::mem::take(&mut *self.changes.lock())
    }

    /// Drain queued link changes.
    pub fn take_events(&mut self) -> Vec<ArenaEvent> {
        std::mem::take(&mut self.events)
    }

    fn adopt_tree(&mut self, tree: TreeEntity, parent: EntityId) -> EntityId {
        let (entity, children) = tree.into_parts();
        let id = self.adopt(entity, Some(parent));
        let child_ids: Vec<EntityId> = children
            .into_iter()
            .map(|child| self.adopt_tree(child, id))
            .collect();
        if let Some(node) = self.nodes.get_mut(&id) {
            node.children = child_ids;
        }
        id
    }

    fn adopt(&mut self, entity: Entity, parent: Option<EntityId>) -> EntityId {
        let id = entity.id();
        let queue = self.changes.clone();
        let hook = entity.data_changed().connect(move |&(column, aspect)| {
            queue.lock().push(CellChange {
                entity: id,
                column,
                aspect,
            });
        });
        self.nodes.insert(
            id,
            ArenaNode {
                entity,
                parent,
                children: Vec::new(),
                hook,
            },
        );
        id
    }

    fn release_tree(&mut self, id: EntityId) -> ModelResult<TreeEntity> {
        let node = self
            .nodes
            .remove(&id)
            .ok_or_else(|| ModelError::violation(format!("{id} vanished during detach")))?;
        node.entity.data_changed().disconnect(node.hook);

        let mut tree = TreeEntity::new(node.entity);
        for child in node.children {
            tree.append_child(self.release_tree(child)?);
        }
        Ok(tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arena_with(names: &[&str]) -> (EntityArena, Vec<EntityId>) {
        let mut arena = EntityArena::new(Entity::from_values(["Name"]));
        let root = arena.root();
        let ids = names
            .iter()
            .enumerate()
            .map(|(row, name)| {
                arena
                    .attach(root, row, TreeEntity::from_values([*name]))
                    .unwrap()
            })
            .collect();
        (arena, ids)
    }

    #[test]
    fn test_attach_and_row() {
        let (arena, ids) = arena_with(&["a", "b", "c"]);
        assert_eq!(arena.child_count(arena.root()), 3);
        assert_eq!(arena.row(ids[2]), 2);
        assert_eq!(arena.row(arena.root()), 0);
        assert_eq!(arena.parent(ids[0]), Some(arena.root()));
        assert_eq!(arena.parent(arena.root()), None);
    }

    #[test]
    fn test_attach_subtree_keeps_ids() {
        let (mut arena, ids) = arena_with(&["a"]);
        let grandchild = TreeEntity::from_values(["leaf"]);
        let leaf_id = grandchild.id();
        let branch = TreeEntity::from_values(["branch"]).with_child(grandchild);
        let branch_id = arena.attach(ids[0], 0, branch).unwrap();

        assert_eq!(arena.child(branch_id, 0), Some(leaf_id));
        assert_eq!(arena.parent(leaf_id), Some(branch_id));
        assert_eq!(arena.descendants(ids[0]), vec![ids[0], branch_id, leaf_id]);
    }

    #[test]
    fn test_detach_removes_descendants() {
        let (mut arena, ids) = arena_with(&["a", "b"]);
        let leaf = arena.attach(ids[0], 0, TreeEntity::from_values(["leaf"])).unwrap();

        let detached = arena.detach(arena.root(), 0).unwrap();
        assert_eq!(detached.id(), ids[0]);
        assert_eq!(detached.child(0).map(TreeEntity::id), Some(leaf));
        assert!(!arena.contains(leaf));
        assert_eq!(arena.row(ids[1]), 0);
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn test_attach_out_of_range() {
        let (mut arena, _) = arena_with(&["a"]);
        let root = arena.root();
        let err = arena.attach(root, 5, TreeEntity::default()).unwrap_err();
        assert!(matches!(err, ModelError::OutOfRange { position: 5, .. }));
    }

    #[test]
    fn test_cell_changes_queue_until_drained() {
        let (mut arena, ids) = arena_with(&["a"]);
        assert!(arena.set_data(ids[0], 0, "renamed".into(), Aspect::Display));
        assert!(!arena.set_data(EntityId::from_raw(u64::MAX), 0, "x".into(), Aspect::Display));

        let changes = arena.take_changes();
        assert_eq!(
            changes,
            vec![CellChange {
                entity: ids[0],
                column: 0,
                aspect: Aspect::Display
            }]
        );
        assert!(arena.take_changes().is_empty());
    }

    #[test]
    fn test_detached_entity_stops_reporting() {
        let (mut arena, _) = arena_with(&["a"]);
        let root = arena.root();
        let mut tree = arena.detach(root, 0).unwrap();
        arena.take_changes();

        tree.entity_mut().set_data(0, "offline", Aspect::Display);
        assert!(arena.take_changes().is_empty());
    }

    #[test]
    fn test_events_record_links() {
        let (mut arena, ids) = arena_with(&["a"]);
        let root = arena.root();
        arena.detach(root, 0).unwrap();
        assert_eq!(
            arena.take_events(),
            vec![
                ArenaEvent::ChildAdded { parent: root, child: ids[0] },
                ArenaEvent::ChildRemoved { parent: root, child: ids[0] },
            ]
        );
    }

    #[test]
    fn test_recursive_flags() {
        let (mut arena, ids) = arena_with(&["a"]);
        let leaf = arena.attach(ids[0], 0, TreeEntity::from_values(["leaf"])).unwrap();
        arena.insert_flags(ids[0], ItemFlags::EDITABLE);
        assert!(arena.get(leaf).unwrap().flags(0).contains(ItemFlags::EDITABLE));
        arena.remove_flags(arena.root(), ItemFlags::EDITABLE);
        assert!(!arena.get(leaf).unwrap().flags(0).contains(ItemFlags::EDITABLE));
    }
}
