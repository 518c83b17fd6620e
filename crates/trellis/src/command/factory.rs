//! Command construction from view-facing handles.

use std::sync::Arc;

use super::command::{Command, ModelHandle};
use crate::error::ModelResult;
use crate::model::{Aspect, CellValue, EditableModel, ModelIndex, StructuralKind, TreeEntity};

/// Builds commands against a shared mediator.
///
/// Implemented for `Arc<M>` of every [`EditableModel`] and for
/// [`ModelHandle`] itself, so call sites hold whichever they already have.
/// Nothing here mutates the model; pass the result to
/// [`CommandExecutor::execute`](super::CommandExecutor::execute).
pub trait CommandFactory {
    /// The model as a command target.
    fn model_handle(&self) -> ModelHandle;

    /// A cell edit, or `None` when `index` does not resolve or the cell
    /// already holds `value`.
    fn set_data_command(&self, index: &ModelIndex, value: CellValue, aspect: Aspect) -> Option<Command> {
        if !index.is_valid() {
            return None;
        }
        let model = self.model_handle();
        let entity = model.entity_id(index)?;
        let old = model.stored_cell(entity, index.column(), aspect);
        if old.as_ref().unwrap_or(&CellValue::None) == &value {
            return None;
        }
        Some(Command::set_cell(model, entity, index.column(), aspect, old, value))
    }

    /// Insert `count` factory-made rows at `position` under `parent`.
    fn insert_rows_command(&self, position: usize, count: usize, parent: &ModelIndex) -> ModelResult<Command> {
        let model = self.model_handle();
        let entities = (0..count).map(|_| model.create_entity()).collect();
        self.insert_entities_command(position, entities, parent)
    }

    /// Insert prepared `entities` at `position` under `parent`.
    fn insert_entities_command(
        &self,
        position: usize,
        entities: Vec<TreeEntity>,
        parent: &ModelIndex,
    ) -> ModelResult<Command> {
        let model = self.model_handle();
        let parent = model.parent_id(parent)?;
        model.check_run(StructuralKind::Insert, parent, position, entities.len())?;
        Ok(Command::insert_run(model, parent, position, entities))
    }

    fn remove_rows_command(&self, position: usize, count: usize, parent: &ModelIndex) -> ModelResult<Command> {
        let model = self.model_handle();
        let parent = model.parent_id(parent)?;
        Command::remove_run(model, parent, position, count)
    }

    /// Append `entity` after the last row of `parent`.
    fn append_command(&self, entity: TreeEntity, parent: &ModelIndex) -> ModelResult<Command> {
        let position = self.model_handle().row_count(parent);
        self.insert_entities_command(position, vec![entity], parent)
    }
}

impl<M: EditableModel + 'static> CommandFactory for Arc<M> {
    fn model_handle(&self) -> ModelHandle {
        self.clone()
    }
}

impl CommandFactory for ModelHandle {
    fn model_handle(&self) -> ModelHandle {
        Arc::clone(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModelError;
    use crate::model::{ItemModel, ListModel, TreeModel};

    #[test]
    fn equal_edit_is_not_a_command() {
        let model = Arc::new(ListModel::from_values(["foo"]));
        let index = model.index(0, 0, &ModelIndex::invalid());

        assert!(model.set_data_command(&index, "foo".into(), Aspect::Display).is_none());
        assert!(model.set_data_command(&index, "bar".into(), Aspect::Display).is_some());
    }

    #[test]
    fn nan_over_nan_is_not_a_command() {
        let model = Arc::new(ListModel::from_values([f64::NAN]));
        let index = model.index(0, 0, &ModelIndex::invalid());
        assert!(model
            .set_data_command(&index, f64::NAN.into(), Aspect::Display)
            .is_none());
    }

    #[test]
    fn unset_cell_records_no_prior_value() {
        let model = Arc::new(ListModel::from_values(["foo"]));
        let index = model.index(0, 0, &ModelIndex::invalid());
        assert!(model
            .set_data_command(&index, CellValue::None, Aspect::User(2))
            .is_none());

        let mut command = model
            .set_data_command(&index, "note".into(), Aspect::User(2))
            .unwrap();
        command.redo().unwrap();
        command.undo().unwrap();
        let id = model.entity_id(&index).unwrap();
        assert_eq!(model.stored_cell(id, 0, Aspect::User(2)), None);
    }

    #[test]
    fn invalid_index_is_not_a_command() {
        let model = Arc::new(ListModel::from_values(["foo"]));
        assert!(model
            .set_data_command(&ModelIndex::invalid(), "bar".into(), Aspect::Display)
            .is_none());
    }

    #[test]
    fn construction_leaves_model_alone() {
        let model = Arc::new(ListModel::from_values(["a", "b"]));
        let root = ModelIndex::invalid();
        let _insert = model.insert_rows_command(1, 3, &root).unwrap();
        let _remove = model.remove_rows_command(0, 2, &root).unwrap();
        assert_eq!(model.len(), 2);
    }

    #[test]
    fn append_targets_end_of_parent() {
        let tree = Arc::new(TreeModel::with_header(["Name"]));
        let root = ModelIndex::invalid();
        tree.append(&root, TreeEntity::from_values(["a"])).unwrap();
        let parent = tree.index(0, 0, &root);

        let mut command = tree.append_command(TreeEntity::from_values(["b"]), &parent).unwrap();
        command.redo().unwrap();
        assert_eq!(tree.row_count(&parent), 1);
        assert_eq!(command.text(), "Inserted 1 row");
    }

    #[test]
    fn flat_models_reject_nesting() {
        let model = Arc::new(ListModel::from_values(["a"]));
        let row = model.index(0, 0, &ModelIndex::invalid());
        let parent = model.entity_id(&row).unwrap();
        assert_eq!(
            model.insert_rows_command(0, 1, &row).unwrap_err(),
            ModelError::InvalidParent(parent)
        );
    }

    #[test]
    fn dyn_handle_builds_commands() {
        let handle: ModelHandle = Arc::new(ListModel::from_values(["a"]));
        let command = handle.remove_rows_command(0, 1, &ModelIndex::invalid()).unwrap();
        assert_eq!(command.text(), "Removed 1 row");
    }
}
