//! Table model for 2D grid data.
//!
//! `TableModel` is a flat model whose column count follows its horizontal
//! header. Row headers live in a separate cell store and are optional.

use parking_lot::RwLock;

use super::aspect::{Aspect, CellValue, ItemFlags};
use super::cell_store::CellStore;
use super::entity::{Entity, EntityId, EntityKind, TreeEntity};
use super::index::ModelIndex;
use super::mediator::ModelCore;
use super::traits::{EditableModel, EntityFactory, ItemModel, ModelSignals, Orientation};
use crate::error::ModelResult;

/// A flat table of entities with horizontal and vertical headers.
///
/// The horizontal header is the root entity's cells, so writing it fires
/// `header_data_changed` through the same path as any other cell write.
///
/// # Example
///
/// ```
/// use trellis::model::{Aspect, ItemModel, ModelIndex, Orientation, TableModel};
///
/// let table = TableModel::new(["Name", "Department"]);
/// table.append_row(["Alice", "Engineering"]).unwrap();
/// table.append_row(["Bob", "Sales"]).unwrap();
///
/// let root = ModelIndex::invalid();
/// assert_eq!(table.row_count(&root), 2);
/// assert_eq!(table.column_count(&root), 2);
/// assert_eq!(
///     table.header_data(1, Orientation::Horizontal, Aspect::Display).as_str(),
///     Some("Department")
/// );
/// ```
#[derive(Debug)]
pub struct TableModel {
    core: ModelCore,
    vertical: RwLock<CellStore>,
}

impl TableModel {
    /// A table with one column per header label.
    pub fn new<I, V>(headers: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<CellValue>,
    {
        let header = CellStore::build_from(headers.into_iter().enumerate(), &[Aspect::Display]);
        Self::with_header(header)
    }

    /// A table whose horizontal header is `header`.
    pub fn with_header(header: CellStore) -> Self {
        Self {
            core: ModelCore::new(Entity::with_cells(EntityKind::GENERIC, header)),
            vertical: RwLock::new(CellStore::new()),
        }
    }

    pub fn with_factory(self, factory: EntityFactory) -> Self {
        self.core.set_factory(factory);
        self
    }

    /// Number of data rows.
    pub fn row_count_value(&self) -> usize {
        self.core.row_count(&ModelIndex::invalid())
    }

    /// Number of columns, i.e. the horizontal header length.
    pub fn column_count_value(&self) -> usize {
        self.core.entity_column_count(&ModelIndex::invalid())
    }

    pub fn is_empty(&self) -> bool {
        self.row_count_value() == 0
    }

    /// Replace the horizontal header labels, one per column.
    pub fn set_headers<I, V>(&self, labels: I)
    where
        I: IntoIterator<Item = V>,
        V: Into<CellValue>,
    {
        let root = self.core.root_id();
        for (column, label) in labels.into_iter().enumerate() {
            // The root is always attached.
            let written = self.core.write_cell(root, column, label.into(), Aspect::Display);
            debug_assert!(written.is_ok(), "header write failed: {written:?}");
        }
    }

    /// Replace the vertical header labels, one per row.
    pub fn set_row_headers<I, V>(&self, labels: I)
    where
        I: IntoIterator<Item = V>,
        V: Into<CellValue>,
    {
        let mut last = None;
        {
            let mut vertical = self.vertical.write();
            for (row, label) in labels.into_iter().enumerate() {
                vertical.set(Aspect::Display, row, label.into());
                last = Some(row);
            }
        }
        if let Some(last) = last {
            self.signals()
                .header_data_changed
                .emit((Orientation::Vertical, 0, last));
        }
    }

    /// Append one row built from `values`, one per column.
    pub fn append_row<I, V>(&self, values: I) -> ModelResult<ModelIndex>
    where
        I: IntoIterator<Item = V>,
        V: Into<CellValue>,
    {
        self.append_entity(&ModelIndex::invalid(), TreeEntity::from_values(values))
    }

    /// Insert a prepared entity at `position`.
    pub fn insert_row(&self, position: usize, entity: impl Into<TreeEntity>) -> ModelResult<ModelIndex> {
        let ids = self.insert_entities(self.root_id(), position, vec![entity.into()])?;
        Ok(ids
            .first()
            .map_or_else(ModelIndex::invalid, |&id| self.item_index(id, 0)))
    }

    /// Write one cell under the display aspect.
    pub fn set_cell(&self, row: usize, column: usize, value: impl Into<CellValue>) -> bool {
        let index = self.index(row, column, &ModelIndex::invalid());
        self.set_data(&index, value.into(), Aspect::Display)
    }

    pub fn clear(&self) -> ModelResult<()> {
        self.core.clear().map(drop)
    }

    pub fn insert_flags(&self, flags: ItemFlags) {
        self.core.insert_flags(flags);
    }

    pub fn remove_flags(&self, flags: ItemFlags) {
        self.core.remove_flags(flags);
    }
}

impl ItemModel for TableModel {
    fn row_count(&self, parent: &ModelIndex) -> usize {
        if parent.is_valid() {
            0
        } else {
            self.core.row_count(parent)
        }
    }

    fn column_count(&self, parent: &ModelIndex) -> usize {
        if parent.is_valid() {
            0
        } else {
            self.column_count_value()
        }
    }

    fn data(&self, index: &ModelIndex, aspect: Aspect) -> CellValue {
        self.core.data(index, aspect)
    }

    fn index(&self, row: usize, column: usize, parent: &ModelIndex) -> ModelIndex {
        if parent.is_valid() {
            return ModelIndex::invalid();
        }
        self.core
            .child_index(row, column, parent, Some(self.column_count_value()))
    }

    fn parent(&self, _index: &ModelIndex) -> ModelIndex {
        ModelIndex::invalid()
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
            Orientation::Vertical => self
                .vertical
                .read()
                .get(aspect, section)
                .cloned()
                .unwrap_or_default(),
        }
    }

    fn set_header_data(&self, section: usize, orientation: Orientation, value: CellValue, aspect: Aspect) -> bool {
        match orientation {
            Orientation::Horizontal => self
                .core
                .write_cell(self.core.root_id(), section, value, aspect)
                .is_ok(),
            Orientation::Vertical => {
                self.vertical.write().set(aspect, section, value);
                self.signals()
                    .header_data_changed
                    .emit((Orientation::Vertical, section, section));
                true
            }
        }
    }
}

impl EditableModel for TableModel {
    fn core(&self) -> &ModelCore {
        &self.core
    }

    fn accepts_parent(&self, parent: EntityId) -> bool {
        parent == self.core.root_id()
    }
}

static_assertions::assert_impl_all!(TableModel: Send, Sync);
