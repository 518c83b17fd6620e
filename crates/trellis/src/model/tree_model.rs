//! Hierarchical model over an arena of tree entities.
//!
//! The invisible root entity doubles as the horizontal header: its cells
//! are the column labels, and its column count is the number of columns
//! shown for top-level rows. Nested rows expose as many columns as their
//! parent entity has cells.

use trellis_core::logging::{DebugTree, TreeDebug, TreeFormatOptions};
use trellis_core::Signal;

use super::arena::EntityArena;
use super::aspect::{Aspect, CellValue, ItemFlags};
use super::cell_store::CellStore;
use super::entity::{Entity, EntityId, EntityKind, TreeEntity};
use super::index::ModelIndex;
use super::mediator::ModelCore;
use super::traits::{EditableModel, EntityFactory, ItemModel, ModelSignals, Orientation};
use crate::error::ModelResult;

/// A tree model whose rows are arena-owned entities.
///
/// # Example
///
/// ```
/// use trellis::model::{EditableModel, ItemModel, ModelIndex, TreeEntity, TreeModel};
///
/// let tree = TreeModel::with_header(["Name", "Type"]);
/// let scene = tree
///     .append(&ModelIndex::invalid(), TreeEntity::from_values(["Scene", "group"]))
///     .unwrap();
/// let cube = tree
///     .append(&scene, TreeEntity::from_values(["Cube", "mesh"]))
///     .unwrap();
///
/// assert_eq!(tree.row_count(&scene), 1);
/// assert_eq!(tree.parent(&cube), scene);
/// ```
#[derive(Debug)]
pub struct TreeModel {
    core: ModelCore,
}

impl Default for TreeModel {
    fn default() -> Self {
        Self::new(Entity::new())
    }
}

impl TreeModel {
    /// A tree whose invisible root is `root`.
    pub fn new(root: Entity) -> Self {
        Self {
            core: ModelCore::new(root),
        }
    }

    /// A tree whose header labels are `labels`.
    pub fn with_header<I, V>(labels: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<CellValue>,
    {
        let header = CellStore::build_from(labels.into_iter().enumerate(), &[Aspect::Display]);
        Self::new(Entity::with_cells(EntityKind::GENERIC, header))
    }

    pub fn with_factory(self, factory: EntityFactory) -> Self {
        self.core.set_factory(factory);
        self
    }

    /// Fired with `(parent, child)` after a subtree root was attached.
    pub fn child_added(&self) -> &Signal<(EntityId, EntityId)> {
        self.core.child_added()
    }

    /// Fired with `(parent, child)` after a subtree root was detached.
    pub fn child_removed(&self) -> &Signal<(EntityId, EntityId)> {
        self.core.child_removed()
    }

    /// Number of attached entities, excluding the root.
    pub fn entity_count(&self) -> usize {
        self.core.read(|arena| arena.len().saturating_sub(1))
    }

    /// Run `f` with the attached entity `id`, if any.
    ///
    /// `f` must not call back into this model's mutating methods.
    pub fn with_entity<R>(&self, id: EntityId, f: impl FnOnce(&Entity) -> R) -> Option<R> {
        self.core.read(|arena| arena.get(id).map(f))
    }

    /// Append `entity` as the last child of `parent`.
    pub fn append(&self, parent: &ModelIndex, entity: impl Into<TreeEntity>) -> ModelResult<ModelIndex> {
        self.append_entity(parent, entity.into())
    }

    /// Insert `entity` at `position` under `parent`.
    pub fn insert(
        &self,
        parent: &ModelIndex,
        position: usize,
        entity: impl Into<TreeEntity>,
    ) -> ModelResult<ModelIndex> {
        let parent_id = self.parent_id(parent)?;
        let ids = self.insert_entities(parent_id, position, vec![entity.into()])?;
        Ok(ids
            .first()
            .map_or_else(ModelIndex::invalid, |&id| self.item_index(id, 0)))
    }

    /// Remove every top-level row (and with it every descendant).
    pub fn clear(&self) -> ModelResult<()> {
        self.core.clear().map(drop)
    }

    /// OR `flags` into every entity in the tree.
    pub fn insert_flags(&self, flags: ItemFlags) {
        self.core.insert_flags(flags);
    }

    /// Clear `flags` from every entity in the tree.
    pub fn remove_flags(&self, flags: ItemFlags) {
        self.core.remove_flags(flags);
    }

    /// Render the entity tree for debugging.
    pub fn format_tree(&self, options: TreeFormatOptions) -> String {
        self.core
            .read(|arena| TreeDebug::with_options(options).format(&ArenaView { arena }))
    }
}

struct ArenaView<'a> {
    arena: &'a EntityArena,
}

impl DebugTree for ArenaView<'_> {
    type Node = EntityId;

    fn title(&self) -> String {
        format!("Entity tree ({} entities):", self.arena.len().saturating_sub(1))
    }

    fn roots(&self) -> Vec<EntityId> {
        self.arena.children(self.arena.root()).to_vec()
    }

    fn children(&self, node: EntityId) -> Vec<EntityId> {
        self.arena.children(node).to_vec()
    }

    fn label(&self, node: EntityId) -> String {
        self.arena
            .get(node)
            .and_then(|entity| entity.data(0, Aspect::Display).to_text())
            .unwrap_or_default()
    }

    fn id(&self, node: EntityId) -> String {
        node.to_string()
    }

    fn kind(&self, node: EntityId) -> Option<String> {
        self.arena.get(node).map(|entity| entity.kind().to_string())
    }
}

impl ItemModel for TreeModel {
    fn row_count(&self, parent: &ModelIndex) -> usize {
        self.core.row_count(parent)
    }

    fn column_count(&self, parent: &ModelIndex) -> usize {
        self.core.entity_column_count(parent)
    }

    fn data(&self, index: &ModelIndex, aspect: Aspect) -> CellValue {
        self.core.data(index, aspect)
    }

    fn index(&self, row: usize, column: usize, parent: &ModelIndex) -> ModelIndex {
        self.core.child_index(row, column, parent, None)
    }

    fn parent(&self, index: &ModelIndex) -> ModelIndex {
        self.core.parent(index)
    }

    fn signals(&self) -> &ModelSignals {
        self.core.signals()
    }

    fn set_data(&self, index: &ModelIndex, value: CellValue, aspect: Aspect) -> bool {
        self.core.set_data(index, value, aspect)
    }

    fn flags(&self, index: &ModelIndex) -> ItemFlags {
        self.core.flags(index)
    }

    fn header_data(&self, section: usize, orientation: Orientation, aspect: Aspect) -> CellValue {
        match orientation {
            Orientation::Horizontal => self.core.root_data(section, aspect),
            Orientation::Vertical => CellValue::None,
        }
    }

    fn set_header_data(&self, section: usize, orientation: Orientation, value: CellValue, aspect: Aspect) -> bool {
        orientation == Orientation::Horizontal
            && self
                .core
                .write_cell(self.core.root_id(), section, value, aspect)
                .is_ok()
    }
}

impl EditableModel for TreeModel {
    fn core(&self) -> &ModelCore {
        &self.core
    }
}

static_assertions::assert_impl_all!(TreeModel: Send, Sync);
