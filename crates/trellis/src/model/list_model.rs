//! Flat, single-column list model.

use super::aspect::{Aspect, CellValue, ItemFlags};
use super::entity::{Entity, EntityId, TreeEntity};
use super::index::ModelIndex;
use super::mediator::ModelCore;
use super::traits::{EditableModel, EntityFactory, ItemModel, ModelSignals};
use crate::error::ModelResult;

/// A flat list of entities, one column wide.
///
/// Every row is a direct child of the invisible root; asking for children
/// of a row yields nothing, and inserting under a row is rejected with
/// [`ModelError::InvalidParent`](crate::ModelError::InvalidParent).
///
/// # Example
///
/// ```
/// use trellis::model::{Aspect, EditableModel, ItemModel, ListModel, ModelIndex};
///
/// let model = ListModel::from_values(["Apple", "Banana"]);
/// model.insert_rows(1, 1, &ModelIndex::invalid()).unwrap();
///
/// assert_eq!(model.len(), 3);
/// let first = model.index(0, 0, &ModelIndex::invalid());
/// assert_eq!(model.display_text(&first).as_deref(), Some("Apple"));
/// ```
#[derive(Debug)]
pub struct ListModel {
    core: ModelCore,
}

impl Default for ListModel {
    fn default() -> Self {
        Self::new()
    }
}

impl ListModel {
    pub fn new() -> Self {
        Self {
            core: ModelCore::new(Entity::new()),
        }
    }

    /// One row per value, with the value under the default build aspects.
    pub fn from_values<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<CellValue>,
    {
        let model = Self::new();
        let rows: Vec<TreeEntity> = values
            .into_iter()
            .map(|value| TreeEntity::from_values([value]))
            .collect();
        // A fresh model has no observers and no open bracket.
        let inserted = model.core.insert(model.core.root_id(), 0, rows);
        debug_assert!(inserted.is_ok(), "seeding a fresh list failed: {inserted:?}");
        model
    }

    /// Use `factory` for rows created by `insert_rows`.
    pub fn with_factory(self, factory: EntityFactory) -> Self {
        self.core.set_factory(factory);
        self
    }

    pub fn len(&self) -> usize {
        self.core.row_count(&ModelIndex::invalid())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append a row, returning its handle.
    pub fn push(&self, entity: impl Into<TreeEntity>) -> ModelResult<ModelIndex> {
        self.append_entity(&ModelIndex::invalid(), entity.into())
    }

    /// Insert a row at `position`, returning its handle.
    pub fn insert(&self, position: usize, entity: impl Into<TreeEntity>) -> ModelResult<ModelIndex> {
        let ids = self.insert_entities(self.root_id(), position, vec![entity.into()])?;
        Ok(ids
            .first()
            .map_or_else(ModelIndex::invalid, |&id| self.item_index(id, 0)))
    }

    /// Remove every row in one bracket.
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

impl ItemModel for ListModel {
    fn row_count(&self, parent: &ModelIndex) -> usize {
        if parent.is_valid() {
            0
        } else {
            self.core.row_count(parent)
        }
    }

    fn column_count(&self, parent: &ModelIndex) -> usize {
        if parent.is_valid() { 0 } else { 1 }
    }

    fn data(&self, index: &ModelIndex, aspect: Aspect) -> CellValue {
        self.core.data(index, aspect)
    }

    fn index(&self, row: usize, column: usize, parent: &ModelIndex) -> ModelIndex {
        if parent.is_valid() {
            return ModelIndex::invalid();
        }
        self.core.child_index(row, column, parent, Some(1))
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
}

impl EditableModel for ListModel {
    fn core(&self) -> &ModelCore {
        &self.core
    }

    fn accepts_parent(&self, parent: EntityId) -> bool {
        parent == self.core.root_id()
    }
}

static_assertions::assert_impl_all!(ListModel: Send, Sync);

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;
    use crate::error::ModelError;

    fn texts(model: &ListModel) -> Vec<String> {
        (0..model.len())
            .filter_map(|row| model.display_text(&model.index(row, 0, &ModelIndex::invalid())))
            .collect()
    }

    #[test]
    fn test_from_values() {
        let model = ListModel::from_values(["a", "b", "c"]);
        assert_eq!(model.len(), 3);
        assert_eq!(model.column_count(&ModelIndex::invalid()), 1);
        assert_eq!(texts(&model), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_flat_addressing() {
        let model = ListModel::from_values(["a"]);
        let root = ModelIndex::invalid();
        let item = model.index(0, 0, &root);
        assert!(item.is_valid());
        assert!(!model.index(0, 1, &root).is_valid());
        assert!(!model.index(1, 0, &root).is_valid());
        assert!(!model.index(0, 0, &item).is_valid());
        assert_eq!(model.row_count(&item), 0);
        assert_eq!(model.parent(&item), ModelIndex::invalid());
    }

    #[test]
    fn test_push_and_signals() {
        let model = ListModel::new();
        let inserted = Arc::new(Mutex::new(Vec::new()));
        let sink = inserted.clone();
        model
            .signals()
            .rows_inserted
            .connect(move |(_, first, last)| sink.lock().push((*first, *last)));

        let index = model.push(Entity::from_values(["one"])).unwrap();
        model.insert(0, Entity::from_values(["zero"])).unwrap();

        assert_eq!(index.row(), 0);
        assert_eq!(texts(&model), vec!["zero", "one"]);
        assert_eq!(*inserted.lock(), vec![(0, 0), (0, 0)]);
    }

    #[test]
    fn test_insert_rows_uses_factory() {
        let factory: EntityFactory = Arc::new(|| TreeEntity::from_values(["new"]));
        let model = ListModel::from_values(["a", "b"]).with_factory(factory);
        let created = model.insert_rows(1, 2, &ModelIndex::invalid()).unwrap();

        assert_eq!(created.iter().map(ModelIndex::row).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(texts(&model), vec!["a", "new", "new", "b"]);
    }

    #[test]
    fn test_nesting_is_rejected() {
        let model = ListModel::from_values(["a"]);
        let item = model.index(0, 0, &ModelIndex::invalid());
        let id = model.entity_id(&item).unwrap();
        assert_eq!(
            model.insert_entities(id, 0, vec![TreeEntity::default()]),
            Err(ModelError::InvalidParent(id))
        );
    }

    #[test]
    fn test_remove_rows_and_clear() {
        let model = ListModel::from_values(["a", "b", "c", "d"]);
        let removed = model.remove_rows(1, 2, &ModelIndex::invalid()).unwrap();
        assert_eq!(removed.len(), 2);
        assert_eq!(texts(&model), vec!["a", "d"]);

        model.clear().unwrap();
        assert!(model.is_empty());
    }

    #[test]
    fn test_set_data_and_flags() {
        let model = ListModel::from_values(["a"]);
        let item = model.index(0, 0, &ModelIndex::invalid());
        assert!(model.set_data(&item, "b".into(), Aspect::Display));
        assert_eq!(model.display_text(&item).as_deref(), Some("b"));
        assert!(!model.set_data(&ModelIndex::invalid(), "x".into(), Aspect::Display));

        model.insert_flags(ItemFlags::EDITABLE);
        assert!(model.flags(&item).contains(ItemFlags::EDITABLE));
        model.remove_flags(ItemFlags::EDITABLE);
        assert!(!model.flags(&item).contains(ItemFlags::EDITABLE));
    }
}
