//! Core traits for the model layer.
//!
//! [`ItemModel`] is the read interface every view (and every
//! [`FilterView`](super::FilterView)) consumes. [`EditableModel`] is the
//! write interface commands use; it addresses entities by stable
//! [`EntityId`] rather than by row, so a command recorded on the undo log
//! keeps working after unrelated rows shift.

use std::fmt;

use trellis_core::Signal;

use super::arena::EntityArena;
use super::aspect::{Aspect, CellValue, CheckState, ItemFlags};
use super::entity::{EntityId, TreeEntity};
use super::index::ModelIndex;
use super::mediator::ModelCore;
use crate::error::{ModelError, ModelResult};

/// The read interface of a model.
///
/// At minimum, implement:
/// - [`row_count`](ItemModel::row_count) - Number of rows under a parent
/// - [`column_count`](ItemModel::column_count) - Number of columns
/// - [`data`](ItemModel::data) - Value for a given index and aspect
/// - [`index`](ItemModel::index) - Create an index for a position
/// - [`parent`](ItemModel::parent) - Get the parent of an index
///
/// Every accessor answers a bad address with an invalid index, `0`, `false`
/// or [`CellValue::None`]. None of them fail loudly.
pub trait ItemModel: Send + Sync {
    /// Number of rows under `parent` (the invisible root when invalid).
    fn row_count(&self, parent: &ModelIndex) -> usize;

    /// Number of columns for children of `parent`.
    fn column_count(&self, parent: &ModelIndex) -> usize;

    /// Value stored under `aspect` for the cell at `index`.
    fn data(&self, index: &ModelIndex, aspect: Aspect) -> CellValue;

    /// Handle for `(row, column)` under `parent`, or an invalid index when
    /// out of range.
    fn index(&self, row: usize, column: usize, parent: &ModelIndex) -> ModelIndex;

    /// Parent of `index`; invalid for top-level items.
    fn parent(&self, index: &ModelIndex) -> ModelIndex;

    /// Signals views connect to.
    fn signals(&self) -> &ModelSignals;

    /// Write a value directly, bypassing any undo log.
    ///
    /// Returns `false` for invalid handles and for read-only models (the
    /// default). Prefer routing edits through a
    /// [`CommandExecutor`](crate::command::CommandExecutor).
    fn set_data(&self, _index: &ModelIndex, _value: CellValue, _aspect: Aspect) -> bool {
        false
    }

    fn flags(&self, _index: &ModelIndex) -> ItemFlags {
        ItemFlags::default()
    }

    fn has_children(&self, parent: &ModelIndex) -> bool {
        self.row_count(parent) > 0
    }

    /// Header value for a column (horizontal) or row (vertical) section.
    fn header_data(&self, _section: usize, _orientation: Orientation, _aspect: Aspect) -> CellValue {
        CellValue::None
    }

    fn set_header_data(
        &self,
        _section: usize,
        _orientation: Orientation,
        _value: CellValue,
        _aspect: Aspect,
    ) -> bool {
        false
    }

    // -------------------------------------------------------------------------
    // Convenience methods
    // -------------------------------------------------------------------------

    /// Display text of an item, if it is a string.
    fn display_text(&self, index: &ModelIndex) -> Option<String> {
        match self.data(index, Aspect::Display) {
            CellValue::String(s) => Some(s),
            _ => None,
        }
    }

    fn check_state(&self, index: &ModelIndex) -> Option<CheckState> {
        self.data(index, Aspect::CheckState).as_check_state()
    }

    /// Sibling of `index` at `(row, column)`, validated against the model.
    fn sibling(&self, index: &ModelIndex, row: usize, column: usize) -> ModelIndex {
        if !index.is_valid() {
            return ModelIndex::invalid();
        }
        self.index(row, column, &self.parent(index))
    }
}

/// Header orientation for `header_data`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    /// Column headers.
    Horizontal,
    /// Row headers.
    Vertical,
}

/// Kind of a structural bracket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StructuralKind {
    Insert,
    Remove,
}

impl fmt::Display for StructuralKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StructuralKind::Insert => f.write_str("insert"),
            StructuralKind::Remove => f.write_str("remove"),
        }
    }
}

/// Collection of signals emitted by item models.
///
/// # Signal Usage
///
/// - **Structural brackets**: `rows_about_to_be_*` before the mutation,
///   `rows_*` after it, both with `(parent, first, last)`. The bracket kind
///   is given by which pair fires.
/// - **Data changes**: `data_changed` with `(top_left, bottom_right, aspects)`
/// - **Re-derived layouts** (filter views): `layout_*`
/// - **Wholesale replacement**: `model_*`
pub struct ModelSignals {
    /// Args: (parent index, first row, last row)
    pub rows_about_to_be_inserted: Signal<(ModelIndex, usize, usize)>,
    /// Args: (parent index, first row, last row)
    pub rows_inserted: Signal<(ModelIndex, usize, usize)>,
    /// Args: (parent index, first row, last row)
    pub rows_about_to_be_removed: Signal<(ModelIndex, usize, usize)>,
    /// Args: (parent index, first row, last row)
    pub rows_removed: Signal<(ModelIndex, usize, usize)>,

    /// Args: (top-left index, bottom-right index, changed aspects)
    pub data_changed: Signal<(ModelIndex, ModelIndex, Vec<Aspect>)>,
    /// Args: (orientation, first section, last section)
    pub header_data_changed: Signal<(Orientation, usize, usize)>,

    pub layout_about_to_change: Signal<()>,
    pub layout_changed: Signal<()>,
}

impl Default for ModelSignals {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ModelSignals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelSignals").finish_non_exhaustive()
    }
}

impl ModelSignals {
    pub fn new() -> Self {
        Self {
            rows_about_to_be_inserted: Signal::new(),
            rows_inserted: Signal::new(),
            rows_about_to_be_removed: Signal::new(),
            rows_removed: Signal::new(),
            data_changed: Signal::new(),
            header_data_changed: Signal::new(),
            layout_about_to_change: Signal::new(),
            layout_changed: Signal::new(),
        }
    }

    /// Runs `insert_fn` between `rows_about_to_be_inserted` and
    /// `rows_inserted`.
    pub fn emit_rows_inserted<R>(
        &self,
        parent: ModelIndex,
        first: usize,
        last: usize,
        insert_fn: impl FnOnce() -> R,
    ) -> R {
        self.rows_about_to_be_inserted.emit((parent.clone(), first, last));
        let result = insert_fn();
        self.rows_inserted.emit((parent, first, last));
        result
    }

    /// Runs `remove_fn` between `rows_about_to_be_removed` and
    /// `rows_removed`.
    pub fn emit_rows_removed<R>(
        &self,
        parent: ModelIndex,
        first: usize,
        last: usize,
        remove_fn: impl FnOnce() -> R,
    ) -> R {
        self.rows_about_to_be_removed.emit((parent.clone(), first, last));
        let result = remove_fn();
        self.rows_removed.emit((parent, first, last));
        result
    }

    pub fn emit_data_changed_single(&self, index: ModelIndex, aspects: Vec<Aspect>) {
        self.data_changed.emit((index.clone(), index, aspects));
    }

    pub fn emit_layout_changed<R>(&self, change_fn: impl FnOnce() -> R) -> R {
        self.layout_about_to_change.emit(());
        let result = change_fn();
        self.layout_changed.emit(());
        result
    }
}

/// Factory for blank entities created by `insert_rows`.
pub type EntityFactory = std::sync::Arc<dyn Fn() -> TreeEntity + Send + Sync>;

/// The write interface commands are built on.
///
/// Implementors only supply [`core`](EditableModel::core) and, for flat
/// models, [`accepts_parent`](EditableModel::accepts_parent); everything
/// else is provided on top of the shared [`ModelCore`].
pub trait EditableModel: ItemModel {
    /// Shared mediator machinery.
    fn core(&self) -> &ModelCore;

    /// Whether `parent` may hold children. Flat models only accept the root.
    fn accepts_parent(&self, _parent: EntityId) -> bool {
        true
    }

    /// Build a blank entity for `insert_rows`.
    fn create_entity(&self) -> TreeEntity {
        self.core().create_entity()
    }

    fn root_id(&self) -> EntityId {
        self.core().root_id()
    }

    /// Entity addressed by `index`: the root for an invalid index, `None`
    /// for a handle that no longer resolves.
    fn entity_id(&self, index: &ModelIndex) -> Option<EntityId> {
        self.core().resolve(index)
    }

    /// Reverse lookup: the current handle of `id` at `column`. Invalid for
    /// the root and for detached entities.
    fn item_index(&self, id: EntityId, column: usize) -> ModelIndex {
        self.core().index_of(id, column)
    }

    fn child_ids(&self, parent: EntityId) -> Vec<EntityId> {
        self.core().read(|arena: &EntityArena| arena.children(parent).to_vec())
    }

    fn read_cell(&self, id: EntityId, column: usize, aspect: Aspect) -> CellValue {
        self.core()
            .read(|arena| arena.get(id).map(|e| e.data(column, aspect)))
            .unwrap_or_default()
    }

    /// The value actually stored at `(column, aspect)`; `None` when the
    /// cell was never written or the entity is not attached.
    fn stored_cell(&self, id: EntityId, column: usize, aspect: Aspect) -> Option<CellValue> {
        self.core()
            .read(|arena| arena.get(id).and_then(|e| e.cells().get(aspect, column).cloned()))
    }

    /// Write one cell and notify `data_changed`.
    fn write_cell(&self, id: EntityId, column: usize, value: CellValue, aspect: Aspect) -> ModelResult<()> {
        self.core().write_cell(id, column, value, aspect)
    }

    /// Drop one cell and notify `data_changed`.
    fn clear_cell(&self, id: EntityId, column: usize, aspect: Aspect) -> ModelResult<()> {
        self.core().clear_cell(id, column, aspect)
    }

    /// Fail the way an insert or remove run would, without touching the
    /// model.
    fn check_run(&self, kind: StructuralKind, parent: EntityId, position: usize, count: usize) -> ModelResult<()> {
        if !self.accepts_parent(parent) {
            return Err(ModelError::InvalidParent(parent));
        }
        self.core().check_run(kind, parent, position, count)
    }

    /// Attach `entities` as rows `position..` of `parent` inside one
    /// insert bracket.
    fn insert_entities(
        &self,
        parent: EntityId,
        position: usize,
        entities: Vec<TreeEntity>,
    ) -> ModelResult<Vec<EntityId>> {
        if !self.accepts_parent(parent) {
            return Err(ModelError::InvalidParent(parent));
        }
        self.core().insert(parent, position, entities)
    }

    /// Detach rows `position..position + count` of `parent` inside one
    /// remove bracket. The entities come back in row order.
    fn remove_entities(&self, parent: EntityId, position: usize, count: usize) -> ModelResult<Vec<TreeEntity>> {
        if !self.accepts_parent(parent) {
            return Err(ModelError::InvalidParent(parent));
        }
        self.core().remove(parent, position, count)
    }

    // -------------------------------------------------------------------------
    // Direct structural edits (not recorded on any undo log)
    // -------------------------------------------------------------------------

    /// Entity behind a parent handle, or `InvalidIndex` when it is stale.
    fn parent_id(&self, parent: &ModelIndex) -> ModelResult<EntityId> {
        self.entity_id(parent).ok_or(ModelError::InvalidIndex)
    }

    /// Append `entity` as the last row under `parent`.
    fn append_entity(&self, parent: &ModelIndex, entity: TreeEntity) -> ModelResult<ModelIndex> {
        let parent_id = self.parent_id(parent)?;
        let position = self.row_count(parent);
        let ids = self.insert_entities(parent_id, position, vec![entity])?;
        Ok(ids
            .first()
            .map_or_else(ModelIndex::invalid, |&id| self.item_index(id, 0)))
    }

    /// Insert `count` factory-made rows at `position` under `parent`.
    fn insert_rows(&self, position: usize, count: usize, parent: &ModelIndex) -> ModelResult<Vec<ModelIndex>> {
        let parent_id = self.parent_id(parent)?;
        let entities = (0..count).map(|_| self.create_entity()).collect();
        let ids = self.insert_entities(parent_id, position, entities)?;
        Ok(ids.into_iter().map(|id| self.item_index(id, 0)).collect())
    }

    /// Remove `count` rows at `position` under `parent`.
    fn remove_rows(&self, position: usize, count: usize, parent: &ModelIndex) -> ModelResult<Vec<TreeEntity>> {
        let parent_id = self.parent_id(parent)?;
        self.remove_entities(parent_id, position, count)
    }
}
