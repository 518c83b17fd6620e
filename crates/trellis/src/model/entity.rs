//! Entities: one addressable node of data.
//!
//! An [`Entity`] owns a [`CellStore`] and announces every write through a
//! pair of hooks. A [`TreeEntity`] is the owned, detached form of a whole
//! subtree: it is what callers build before insertion and what a removal
//! hands back. While attached to a model, entities live in the model's
//! [`EntityArena`](super::arena::EntityArena) instead.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use trellis_core::Signal;

use super::aspect::{Aspect, CellValue, ItemFlags};
use super::cell_store::CellStore;
use crate::error::{ModelError, ModelResult};

static NEXT_ENTITY_ID: AtomicU64 = AtomicU64::new(1);

/// Stable identity of an entity.
///
/// Ids are process-unique, never reused, and survive detaching and
/// re-attaching the entity (which is what undo and redo do).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(u64);

impl EntityId {
    fn next() -> Self {
        Self(NEXT_ENTITY_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw value, as stored in [`ModelIndex::internal_id`](super::ModelIndex::internal_id).
    pub fn raw(self) -> u64 {
        self.0
    }

    pub(crate) fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Tag naming what an entity represents ("camera", "mesh", ...).
///
/// Kinds key the [`KindRegistry`](super::schema::KindRegistry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityKind(&'static str);

impl EntityKind {
    /// Kind of entities created without one.
    pub const GENERIC: EntityKind = EntityKind("item");

    pub const fn new(tag: &'static str) -> Self {
        Self(tag)
    }

    pub fn tag(&self) -> &'static str {
        self.0
    }
}

impl Default for EntityKind {
    fn default() -> Self {
        Self::GENERIC
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// `(column, aspect)` pair carried by entity hooks.
pub type CellKey = (usize, Aspect);

/// One node of data.
///
/// Reads are lenient: a cell that was never written reads as
/// [`CellValue::None`]. Writes are never bounds-checked; only the owning
/// mediator knows how many columns an entity may expose.
pub struct Entity {
    id: EntityId,
    kind: EntityKind,
    cells: CellStore,
    data_changing: Signal<CellKey>,
    data_changed: Signal<CellKey>,
}

impl Default for Entity {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("cells", &self.cells)
            .finish()
    }
}

impl Entity {
    /// An empty entity of the generic kind.
    pub fn new() -> Self {
        Self::with_cells(EntityKind::GENERIC, CellStore::new())
    }

    pub fn with_kind(kind: EntityKind) -> Self {
        Self::with_cells(kind, CellStore::new())
    }

    pub fn with_cells(kind: EntityKind, cells: CellStore) -> Self {
        Self {
            id: EntityId::next(),
            kind,
            cells,
            data_changing: Signal::new(),
            data_changed: Signal::new(),
        }
    }

    /// Shortcut for a generic entity built with [`CellStore::from_values`].
    pub fn from_values<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<CellValue>,
    {
        Self::with_cells(EntityKind::GENERIC, CellStore::from_values(values))
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn cells(&self) -> &CellStore {
        &self.cells
    }

    /// Value under `(column, aspect)`, or `CellValue::None`.
    pub fn data(&self, column: usize, aspect: Aspect) -> CellValue {
        self.data_or(column, aspect, CellValue::None)
    }

    pub fn data_or(&self, column: usize, aspect: Aspect, default: CellValue) -> CellValue {
        self.cells.get_or(aspect, column, default)
    }

    pub fn has_data(&self, column: usize, aspect: Aspect) -> bool {
        self.cells.has(aspect, column)
    }

    /// Write a cell, firing `data_changing` before and `data_changed` after.
    ///
    /// Both hooks fire even when the value is unchanged. Always returns
    /// `true`.
    pub fn set_data(&mut self, column: usize, value: impl Into<CellValue>, aspect: Aspect) -> bool {
        let key = (column, aspect);
        self.data_changing.emit(key);
        self.cells.set(aspect, column, value.into());
        self.data_changed.emit(key);
        true
    }

    /// Forget a cell so reads return their default again. The hooks fire
    /// as for a write; the removed value is returned.
    pub fn clear_data(&mut self, column: usize, aspect: Aspect) -> Option<CellValue> {
        let key = (column, aspect);
        self.data_changing.emit(key);
        let removed = self.cells.remove(aspect, column);
        self.data_changed.emit(key);
        removed
    }

    /// Number of columns under the primary aspect.
    pub fn column_count(&self) -> usize {
        self.cells.len()
    }

    /// Flags of `column`; enabled and selectable unless set explicitly.
    pub fn flags(&self, column: usize) -> ItemFlags {
        self.cells
            .get(Aspect::Flags, column)
            .and_then(CellValue::as_flags)
            .unwrap_or_default()
    }

    pub fn set_flags(&mut self, column: usize, flags: ItemFlags) -> bool {
        self.set_data(column, flags, Aspect::Flags)
    }

    /// OR `flags` into every column of this entity.
    pub fn insert_flags(&mut self, flags: ItemFlags) {
        for column in self.cells.all_columns() {
            let current = self.flags(column);
            self.set_flags(column, current | flags);
        }
    }

    /// Clear `flags` from every column of this entity.
    pub fn remove_flags(&mut self, flags: ItemFlags) {
        for column in self.cells.all_columns() {
            let current = self.flags(column);
            self.set_flags(column, current - flags);
        }
    }

    /// Fired with `(column, aspect)` before a cell is written.
    pub fn data_changing(&self) -> &Signal<CellKey> {
        &self.data_changing
    }

    /// Fired with `(column, aspect)` after a cell is written.
    ///
    /// While the entity is attached, its model observes this hook and
    /// the slot runs with the model locked; observe the model's
    /// `data_changed` signal instead of reading the model from here.
    pub fn data_changed(&self) -> &Signal<CellKey> {
        &self.data_changed
    }
}

/// An entity together with its owned, ordered children.
///
/// This is the detached form of a subtree. It has no parent; a node's row
/// only exists once it is attached to a model.
#[derive(Debug, Default)]
pub struct TreeEntity {
    entity: Entity,
    children: Vec<TreeEntity>,
}

impl From<Entity> for TreeEntity {
    fn from(entity: Entity) -> Self {
        Self::new(entity)
    }
}

impl TreeEntity {
    pub fn new(entity: Entity) -> Self {
        Self {
            entity,
            children: Vec::new(),
        }
    }

    pub fn from_values<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<CellValue>,
    {
        Self::new(Entity::from_values(values))
    }

    /// Builder-style [`append_child`](Self::append_child).
    pub fn with_child(mut self, child: impl Into<TreeEntity>) -> Self {
        self.append_child(child);
        self
    }

    pub fn id(&self) -> EntityId {
        self.entity.id()
    }

    pub fn entity(&self) -> &Entity {
        &self.entity
    }

    pub fn entity_mut(&mut self) -> &mut Entity {
        &mut self.entity
    }

    pub fn children(&self) -> &[TreeEntity] {
        &self.children
    }

    pub fn append_child(&mut self, child: impl Into<TreeEntity>) {
        self.children.push(child.into());
    }

    /// Insert at `position`; positions past the end append.
    pub fn insert_child(&mut self, position: usize, child: impl Into<TreeEntity>) {
        let position = position.min(self.children.len());
        self.children.insert(position, child.into());
    }

    /// Remove the child with identity `id`.
    ///
    /// Asking for an entity that is not a child of this one breaks the
    /// caller's idea of the tree and is reported as a structural violation.
    pub fn remove_child(&mut self, id: EntityId) -> ModelResult<TreeEntity> {
        match self.child_position(id) {
            Some(position) => Ok(self.children.remove(position)),
            None => Err(ModelError::StructuralViolation(format!(
                "{id} is not a child of {}",
                self.id()
            ))),
        }
    }

    pub fn remove_position(&mut self, position: usize) -> Option<TreeEntity> {
        (position < self.children.len()).then(|| self.children.remove(position))
    }

    pub fn child(&self, position: usize) -> Option<&TreeEntity> {
        self.children.get(position)
    }

    pub fn child_mut(&mut self, position: usize) -> Option<&mut TreeEntity> {
        self.children.get_mut(position)
    }

    /// Linear scan for `id` among the direct children.
    pub fn child_position(&self, id: EntityId) -> Option<usize> {
        self.children.iter().position(|child| child.id() == id)
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    pub fn row_count(&self) -> usize {
        self.child_count()
    }

    pub fn column_count(&self) -> usize {
        self.entity.column_count()
    }

    /// This node plus all of its descendants.
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(TreeEntity::subtree_len).sum::<usize>()
    }

    /// OR `flags` into this entity and every descendant.
    pub fn insert_flags(&mut self, flags: ItemFlags) {
        self.entity.insert_flags(flags);
        for child in &mut self.children {
            child.insert_flags(flags);
        }
    }

    /// Clear `flags` from this entity and every descendant.
    pub fn remove_flags(&mut self, flags: ItemFlags) {
        self.entity.remove_flags(flags);
        for child in &mut self.children {
            child.remove_flags(flags);
        }
    }

    pub fn into_parts(self) -> (Entity, Vec<TreeEntity>) {
        (self.entity, self.children)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;

    #[test]
    fn test_write_then_read() {
        let mut entity = Entity::new();
        assert!(entity.set_data(2, "bar", Aspect::Edit));
        assert_eq!(entity.data(2, Aspect::Edit), CellValue::from("bar"));
        assert!(entity.has_data(2, Aspect::Edit));
    }

    #[test]
    fn test_unwritten_cell_is_lenient() {
        let entity = Entity::new();
        assert_eq!(entity.data(40, Aspect::ToolTip), CellValue::None);
        assert_eq!(
            entity.data_or(40, Aspect::ToolTip, CellValue::Int(-1)),
            CellValue::Int(-1)
        );
    }

    #[test]
    fn test_hooks_fire_in_order_even_for_equal_values() {
        let mut entity = Entity::from_values(["same"]);
        let events = Arc::new(Mutex::new(Vec::new()));

        let before = events.clone();
        entity
            .data_changing()
            .connect(move |&(column, aspect)| before.lock().push(("changing", column, aspect)));
        let after = events.clone();
        entity
            .data_changed()
            .connect(move |&(column, aspect)| after.lock().push(("changed", column, aspect)));

        entity.set_data(0, "same", Aspect::Display);

        assert_eq!(
            *events.lock(),
            vec![
                ("changing", 0, Aspect::Display),
                ("changed", 0, Aspect::Display)
            ]
        );
    }

    #[test]
    fn test_flags_default_and_edit() {
        let mut entity = Entity::from_values(["a", "b"]);
        assert_eq!(entity.flags(1), ItemFlags::default());

        entity.insert_flags(ItemFlags::EDITABLE);
        assert!(entity.flags(0).contains(ItemFlags::EDITABLE));
        assert!(entity.flags(1).contains(ItemFlags::EDITABLE | ItemFlags::ENABLED));

        entity.remove_flags(ItemFlags::SELECTABLE);
        assert!(!entity.flags(0).contains(ItemFlags::SELECTABLE));
        assert!(entity.flags(0).contains(ItemFlags::EDITABLE));
    }

    #[test]
    fn test_ids_are_unique() {
        let a = Entity::new();
        let b = Entity::new();
        assert_ne!(a.id(), b.id());
        assert_eq!(EntityId::from_raw(a.id().raw()), a.id());
    }

    #[test]
    fn test_tree_entity_children() {
        let mut parent = TreeEntity::from_values(["parent"]);
        let first = TreeEntity::from_values(["first"]);
        let third = TreeEntity::from_values(["third"]);
        let first_id = first.id();
        let third_id = third.id();

        parent.append_child(first);
        parent.append_child(third);
        parent.insert_child(1, TreeEntity::from_values(["second"]));
        parent.insert_child(99, TreeEntity::from_values(["last"]));

        assert_eq!(parent.child_count(), 4);
        assert_eq!(parent.child_position(third_id), Some(2));

        let removed = parent.remove_child(first_id).unwrap();
        assert_eq!(removed.id(), first_id);
        assert_eq!(parent.child_position(third_id), Some(1));
        assert!(parent.remove_position(10).is_none());
    }

    #[test]
    fn test_remove_foreign_child_is_violation() {
        let mut parent = TreeEntity::from_values(["parent"]);
        let stranger = Entity::new();
        assert!(matches!(
            parent.remove_child(stranger.id()),
            Err(ModelError::StructuralViolation(_))
        ));
    }

    #[test]
    fn test_recursive_flags() {
        let mut root = TreeEntity::from_values(["root"])
            .with_child(TreeEntity::from_values(["child"]).with_child(Entity::from_values(["leaf"])));
        root.insert_flags(ItemFlags::EDITABLE);

        let leaf = root.child(0).and_then(|c| c.child(0)).unwrap();
        assert!(leaf.entity().flags(0).contains(ItemFlags::EDITABLE));
        assert_eq!(root.subtree_len(), 3);

        root.remove_flags(ItemFlags::EDITABLE);
        let leaf = root.child(0).and_then(|c| c.child(0)).unwrap();
        assert!(!leaf.entity().flags(0).contains(ItemFlags::EDITABLE));
    }
}
