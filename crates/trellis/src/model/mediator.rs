//! Shared machinery behind the list, table and tree models.
//!
//! [`ModelCore`] owns the entity arena and the model signals. It turns
//! `(row, column, parent)` handles into entity ids and back, and wraps every
//! structural mutation in a bracket:
//!
//! ```text
//!   open bracket ── rows_about_to_be_* ── mutate arena ── rows_* ── close
//!        │                                                            │
//!        └── any structural mutation requested in here is rejected ───┘
//! ```
//!
//! After a mutation the arena's queued link events and cell writes are
//! flushed as `child_added`/`child_removed`/`data_changed` notifications.
//! No lock is held while any observer runs.

use parking_lot::{Mutex, RwLock};
use trellis_core::Signal;
use trellis_core::logging::targets;

use super::arena::{ArenaEvent, EntityArena};
use super::aspect::{Aspect, CellValue, ItemFlags};
use super::entity::{Entity, EntityId, TreeEntity};
use super::index::ModelIndex;
use super::traits::{EntityFactory, ModelSignals, Orientation, StructuralKind};
use crate::error::{ModelError, ModelResult};

#[derive(Debug, Clone, Copy)]
struct OpenBracket {
    kind: StructuralKind,
    parent: EntityId,
    first: usize,
    last: usize,
}

/// Closes the bracket when dropped, including on early return.
struct BracketGuard<'a> {
    slot: &'a Mutex<Option<OpenBracket>>,
}

impl Drop for BracketGuard<'_> {
    fn drop(&mut self) {
        if let Some(bracket) = self.slot.lock().take() {
            tracing::trace!(
                target: targets::MODEL,
                kind = %bracket.kind,
                parent = %bracket.parent,
                first = bracket.first,
                last = bracket.last,
                "bracket closed"
            );
        }
    }
}

/// Entity arena, signals and bracket state of one model.
pub struct ModelCore {
    root: EntityId,
    arena: RwLock<EntityArena>,
    signals: ModelSignals,
    bracket: Mutex<Option<OpenBracket>>,
    factory: RwLock<Option<EntityFactory>>,
    child_added: Signal<(EntityId, EntityId)>,
    child_removed: Signal<(EntityId, EntityId)>,
}

impl std::fmt::Debug for ModelCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelCore")
            .field("root", &self.root)
            .field("arena", &*self.arena.read())
            .field("bracket", &*self.bracket.lock())
            .finish_non_exhaustive()
    }
}

impl ModelCore {
    /// A model whose invisible root is `root`.
    pub fn new(root: Entity) -> Self {
        Self {
            root: root.id(),
            arena: RwLock::new(EntityArena::new(root)),
            signals: ModelSignals::new(),
            bracket: Mutex::new(None),
            factory: RwLock::new(None),
            child_added: Signal::new(),
            child_removed: Signal::new(),
        }
    }

    pub fn signals(&self) -> &ModelSignals {
        &self.signals
    }

    /// Fired with `(parent, child)` after `child` was attached.
    pub fn child_added(&self) -> &Signal<(EntityId, EntityId)> {
        &self.child_added
    }

    /// Fired with `(parent, child)` after `child` was detached.
    pub fn child_removed(&self) -> &Signal<(EntityId, EntityId)> {
        &self.child_removed
    }

    pub fn root_id(&self) -> EntityId {
        self.root
    }

    /// Run `f` with shared access to the arena.
    ///
    /// `f` must not call back into this model's mutating methods.
    pub fn read<R>(&self, f: impl FnOnce(&EntityArena) -> R) -> R {
        f(&self.arena.read())
    }

    /// Whether a structural bracket is currently open.
    pub fn in_bracket(&self) -> bool {
        self.bracket.lock().is_some()
    }

    pub fn set_factory(&self, factory: EntityFactory) {
        *self.factory.write() = Some(factory);
    }

    pub fn create_entity(&self) -> TreeEntity {
        let factory = self.factory.read().clone();
        factory.map_or_else(TreeEntity::default, |make| make())
    }

    // -------------------------------------------------------------------------
    // Addressing
    // -------------------------------------------------------------------------

    /// Entity behind `index`: the root for an invalid index, `None` when a
    /// valid handle no longer resolves to an attached entity.
    pub fn resolve(&self, index: &ModelIndex) -> Option<EntityId> {
        if !index.is_valid() {
            return Some(self.root);
        }
        let id = EntityId::from_raw(index.internal_id());
        (id != self.root && self.arena.read().contains(id)).then_some(id)
    }

    /// Current handle of `id`. Invalid for the root and detached entities.
    pub fn index_of(&self, id: EntityId, column: usize) -> ModelIndex {
        Self::index_in(&self.arena.read(), id, column)
    }

    fn index_in(arena: &EntityArena, id: EntityId, column: usize) -> ModelIndex {
        if id == arena.root() || !arena.contains(id) {
            return ModelIndex::invalid();
        }
        let parent = match arena.parent(id) {
            Some(parent) => Self::index_in(arena, parent, 0),
            None => ModelIndex::invalid(),
        };
        ModelIndex::new(arena.row(id), column, parent, id.raw())
    }

    /// Handle of child `row` of `parent`.
    ///
    /// `columns` bounds the column; `None` uses the parent entity's own
    /// column count.
    pub fn child_index(
        &self,
        row: usize,
        column: usize,
        parent: &ModelIndex,
        columns: Option<usize>,
    ) -> ModelIndex {
        let Some(parent_id) = self.resolve(parent) else {
            return ModelIndex::invalid();
        };
        let arena = self.arena.read();
        let Some(child) = arena.child(parent_id, row) else {
            return ModelIndex::invalid();
        };
        if column >= columns.unwrap_or_else(|| arena.column_count(parent_id)) {
            return ModelIndex::invalid();
        }
        ModelIndex::new(row, column, Self::index_in(&arena, parent_id, 0), child.raw())
    }

    pub fn row_count(&self, parent: &ModelIndex) -> usize {
        self.resolve(parent)
            .map_or(0, |id| self.arena.read().child_count(id))
    }

    /// Column count of the entity behind `parent` (the root when invalid).
    pub fn entity_column_count(&self, parent: &ModelIndex) -> usize {
        self.resolve(parent)
            .map_or(0, |id| self.arena.read().column_count(id))
    }

    pub fn parent(&self, index: &ModelIndex) -> ModelIndex {
        if !index.is_valid() {
            return ModelIndex::invalid();
        }
        let Some(id) = self.resolve(index) else {
            return ModelIndex::invalid();
        };
        let arena = self.arena.read();
        match arena.parent(id) {
            Some(parent) => Self::index_in(&arena, parent, 0),
            None => ModelIndex::invalid(),
        }
    }

    // -------------------------------------------------------------------------
    // Cells
    // -------------------------------------------------------------------------

    pub fn data(&self, index: &ModelIndex, aspect: Aspect) -> CellValue {
        if !index.is_valid() {
            return CellValue::None;
        }
        self.resolve(index)
            .and_then(|id| {
                self.arena
                    .read()
                    .get(id)
                    .map(|entity| entity.data(index.column(), aspect))
            })
            .unwrap_or_default()
    }

    pub fn flags(&self, index: &ModelIndex) -> ItemFlags {
        if !index.is_valid() {
            return ItemFlags::empty();
        }
        self.resolve(index)
            .and_then(|id| self.arena.read().get(id).map(|e| e.flags(index.column())))
            .unwrap_or(ItemFlags::empty())
    }

    /// Direct write through a handle. `false` for invalid handles.
    pub fn set_data(&self, index: &ModelIndex, value: CellValue, aspect: Aspect) -> bool {
        if !index.is_valid() {
            return false;
        }
        match self.resolve(index) {
            Some(id) => self.write_cell(id, index.column(), value, aspect).is_ok(),
            None => false,
        }
    }

    /// Write one cell of an attached entity and flush notifications.
    pub fn write_cell(&self, id: EntityId, column: usize, value: CellValue, aspect: Aspect) -> ModelResult<()> {
        let written = self.arena.write().set_data(id, column, value, aspect);
        if !written {
            return Err(ModelError::UnknownEntity(id));
        }
        self.flush();
        Ok(())
    }

    /// Drop one cell of an attached entity so reads fall back to their
    /// default again, and flush notifications.
    pub fn clear_cell(&self, id: EntityId, column: usize, aspect: Aspect) -> ModelResult<()> {
        let cleared = self.arena.write().clear_data(id, column, aspect);
        if !cleared {
            return Err(ModelError::UnknownEntity(id));
        }
        self.flush();
        Ok(())
    }

    /// Root cells double as the horizontal header in tree models.
    pub fn root_data(&self, column: usize, aspect: Aspect) -> CellValue {
        self.arena
            .read()
            .get(self.root)
            .map(|root| root.data(column, aspect))
            .unwrap_or_default()
    }

    /// OR `flags` into every attached entity except the root.
    pub fn insert_flags(&self, flags: ItemFlags) {
        {
            let mut arena = self.arena.write();
            for top in arena.children(self.root).to_vec() {
                arena.insert_flags(top, flags);
            }
        }
        self.flush();
    }

    /// Clear `flags` from every attached entity except the root.
    pub fn remove_flags(&self, flags: ItemFlags) {
        {
            let mut arena = self.arena.write();
            for top in arena.children(self.root).to_vec() {
                arena.remove_flags(top, flags);
            }
        }
        self.flush();
    }

    // -------------------------------------------------------------------------
    // Structure
    // -------------------------------------------------------------------------

    /// Attach `entities` as rows `position..position + len` of `parent`
    /// inside one insert bracket.
    pub fn insert(&self, parent: EntityId, position: usize, entities: Vec<TreeEntity>) -> ModelResult<Vec<EntityId>> {
        if entities.is_empty() {
            return Ok(Vec::new());
        }
        let count = entities.len();
        let last = self.run_last(parent, position, count)?;
        let bracket = self.open_bracket(StructuralKind::Insert, parent, position, last)?;

        let parent_index = {
            let arena = self.arena.read();
            Self::validate_run(&arena, StructuralKind::Insert, parent, position, count)?;
            Self::index_in(&arena, parent, 0)
        };

        let attached = self
            .signals
            .emit_rows_inserted(parent_index, position, last, || -> ModelResult<Vec<EntityId>> {
                let mut arena = self.arena.write();
                entities
                    .into_iter()
                    .enumerate()
                    .map(|(offset, entity)| arena.attach(parent, position + offset, entity))
                    .collect()
            });

        drop(bracket);
        self.flush();
        attached
    }

    /// Detach rows `position..position + count` of `parent` inside one
    /// remove bracket, last row first. Returned in row order.
    pub fn remove(&self, parent: EntityId, position: usize, count: usize) -> ModelResult<Vec<TreeEntity>> {
        if count == 0 {
            return Ok(Vec::new());
        }
        let last = self.run_last(parent, position, count)?;
        let bracket = self.open_bracket(StructuralKind::Remove, parent, position, last)?;

        let parent_index = {
            let arena = self.arena.read();
            Self::validate_run(&arena, StructuralKind::Remove, parent, position, count)?;
            Self::index_in(&arena, parent, 0)
        };

        let removed = self
            .signals
            .emit_rows_removed(parent_index, position, last, || -> ModelResult<Vec<TreeEntity>> {
                let mut arena = self.arena.write();
                let mut removed = Vec::with_capacity(count);
                for row in (position..=last).rev() {
                    removed.push(arena.detach(parent, row)?);
                }
                removed.reverse();
                Ok(removed)
            });

        drop(bracket);
        self.flush();
        removed
    }

    /// The checks an insert or remove run would fail, without running it.
    pub fn check_run(&self, kind: StructuralKind, parent: EntityId, position: usize, count: usize) -> ModelResult<()> {
        if let Some(open) = *self.bracket.lock() {
            return Err(ModelError::ReentrantMutation { open: open.kind });
        }
        Self::validate_run(&self.arena.read(), kind, parent, position, count)
    }

    fn validate_run(
        arena: &EntityArena,
        kind: StructuralKind,
        parent: EntityId,
        position: usize,
        count: usize,
    ) -> ModelResult<()> {
        if !arena.contains(parent) {
            return Err(ModelError::UnknownEntity(parent));
        }
        let row_count = arena.child_count(parent);
        let end = match kind {
            StructuralKind::Insert => Some(position),
            StructuralKind::Remove => position.checked_add(count),
        };
        match end {
            Some(end) if end <= row_count => Ok(()),
            _ => Err(ModelError::OutOfRange {
                position,
                count,
                row_count,
            }),
        }
    }

    /// Last row of a non-empty run, or `OutOfRange` when it does not fit
    /// in `usize`.
    fn run_last(&self, parent: EntityId, position: usize, count: usize) -> ModelResult<usize> {
        position
            .checked_add(count - 1)
            .ok_or_else(|| ModelError::OutOfRange {
                position,
                count,
                row_count: self.arena.read().child_count(parent),
            })
    }

    /// Remove every top-level row in one bracket.
    pub fn clear(&self) -> ModelResult<Vec<TreeEntity>> {
        let count = self.arena.read().child_count(self.root);
        self.remove(self.root, 0, count)
    }

    /// Emit queued link events and cell writes.
    pub fn flush(&self) {
        let (events, changes) = {
            let mut arena = self.arena.write();
            (arena.take_events(), arena.take_changes())
        };

        for event in events {
            match event {
                ArenaEvent::ChildAdded { parent, child } => self.child_added.emit((parent, child)),
                ArenaEvent::ChildRemoved { parent, child } => self.child_removed.emit((parent, child)),
            }
        }

        for change in changes {
            if change.entity == self.root {
                self.signals
                    .header_data_changed
                    .emit((Orientation::Horizontal, change.column, change.column));
                continue;
            }
            let index = self.index_of(change.entity, change.column);
            if index.is_valid() {
                self.signals
                    .emit_data_changed_single(index, vec![change.aspect]);
            }
        }
    }

    fn open_bracket(
        &self,
        kind: StructuralKind,
        parent: EntityId,
        first: usize,
        last: usize,
    ) -> ModelResult<BracketGuard<'_>> {
        let mut slot = self.bracket.lock();
        if let Some(open) = *slot {
            tracing::warn!(
                target: targets::MODEL,
                open = %open.kind,
                open_parent = %open.parent,
                requested = %kind,
                %parent,
                "structural mutation requested inside an open bracket"
            );
            return Err(ModelError::ReentrantMutation { open: open.kind });
        }
        tracing::trace!(target: targets::MODEL, %kind, %parent, first, last, "bracket opened");
        *slot = Some(OpenBracket {
            kind,
            parent,
            first,
            last,
        });
        Ok(BracketGuard { slot: &self.bracket })
    }
}

static_assertions::assert_impl_all!(ModelCore: Send, Sync);
