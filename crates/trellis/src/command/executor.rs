//! Command execution, macros and the attached undo log.

use std::fmt;

use trellis_core::logging::{span_names, targets};

use super::command::{Command, CommandResult, roll_back};
use super::factory::CommandFactory;
use super::history::{ExecutorConfig, UndoStack};
use crate::error::{ModelError, ModelResult};
use crate::model::{Aspect, CellValue, ModelIndex, TreeEntity};

struct OpenMacro {
    label: String,
    members: Vec<Command>,
    /// `begin_macro` calls not yet matched by `end_macro`.
    depth: usize,
}

/// Runs commands and records them.
///
/// Without an attached [`UndoStack`] commands are applied and dropped.
/// With one, every executed command (or every closed macro) becomes one
/// undo entry.
///
/// Macros nest by flattening: an inner `begin_macro`/`end_macro` pair adds
/// its commands to the outermost macro, which alone reaches the log under
/// the outer label. A command that fails while a macro is open aborts the
/// whole macro: members applied so far are undone in reverse order and
/// the error is returned.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use trellis::command::{CommandExecutor, ExecutorConfig};
/// use trellis::model::{Aspect, ItemModel, ListModel, ModelIndex};
///
/// let model = Arc::new(ListModel::from_values(["foo"]));
/// let mut executor = CommandExecutor::with_history(ExecutorConfig::default());
///
/// let index = model.index(0, 0, &ModelIndex::invalid());
/// executor.set_data(&model, &index, "bar".into(), Aspect::Display).unwrap();
/// assert_eq!(model.display_text(&index).as_deref(), Some("bar"));
///
/// executor.undo().unwrap();
/// assert_eq!(model.display_text(&index).as_deref(), Some("foo"));
/// ```
#[derive(Default)]
pub struct CommandExecutor {
    history: Option<UndoStack>,
    open_macro: Option<OpenMacro>,
}

impl fmt::Debug for CommandExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandExecutor")
            .field("history", &self.history)
            .field("macro_open", &self.is_macro_open())
            .finish()
    }
}

impl CommandExecutor {
    /// An executor without an undo log.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_history(config: ExecutorConfig) -> Self {
        Self {
            history: Some(UndoStack::with_config(config)),
            open_macro: None,
        }
    }

    /// Attach `history`, returning the log it replaces.
    pub fn attach_history(&mut self, history: UndoStack) -> Option<UndoStack> {
        self.history.replace(history)
    }

    pub fn detach_history(&mut self) -> Option<UndoStack> {
        self.history.take()
    }

    pub fn history(&self) -> Option<&UndoStack> {
        self.history.as_ref()
    }

    pub fn history_mut(&mut self) -> Option<&mut UndoStack> {
        self.history.as_mut()
    }

    pub fn is_macro_open(&self) -> bool {
        self.open_macro.is_some()
    }

    /// Apply `command`, record it, and return its result.
    pub fn execute(&mut self, mut command: Command) -> ModelResult<CommandResult> {
        let span = tracing::debug_span!(target: targets::COMMAND, span_names::COMMAND, command = command.text());
        let _entered = span.enter();

        let result = match command.apply() {
            Ok(result) => result,
            Err(err) => {
                if self.open_macro.is_some() {
                    tracing::warn!(target: targets::COMMAND, %err, "command failed inside a macro");
                    self.abort_macro();
                }
                return Err(err);
            }
        };
        tracing::debug!(target: targets::COMMAND, command = command.text(), "executed");

        if let Some(open) = &mut self.open_macro {
            open.members.push(command);
        } else if let Some(history) = &mut self.history {
            history.push(command);
        }
        Ok(result)
    }

    /// Start collecting executed commands into one entry labelled `label`.
    ///
    /// Inside an open macro this only deepens it; the outer label wins.
    pub fn begin_macro(&mut self, label: impl Into<String>) {
        match &mut self.open_macro {
            Some(open) => {
                open.depth += 1;
                tracing::debug!(target: targets::COMMAND, depth = open.depth, "nested macro flattened");
            }
            None => {
                let label = label.into();
                tracing::debug!(target: targets::COMMAND, label = %label, "macro opened");
                self.open_macro = Some(OpenMacro {
                    label,
                    members: Vec::new(),
                    depth: 1,
                });
            }
        }
    }

    /// Close the innermost macro. Closing the outermost one records the
    /// collected commands as a single entry; an empty macro records nothing.
    pub fn end_macro(&mut self) -> ModelResult<()> {
        let open = self.open_macro.as_mut().ok_or(ModelError::NoOpenMacro)?;
        open.depth -= 1;
        if open.depth > 0 {
            return Ok(());
        }
        let Some(open) = self.open_macro.take() else {
            return Err(ModelError::NoOpenMacro);
        };
        tracing::debug!(
            target: targets::COMMAND,
            label = %open.label,
            members = open.members.len(),
            "macro closed"
        );
        if open.members.is_empty() {
            return Ok(());
        }
        let command = Command::applied_macro(open.label, open.members);
        if let Some(history) = &mut self.history {
            history.push(command);
        }
        Ok(())
    }

    /// Undo everything the open macro applied and discard it. Returns
    /// `false` when no macro was open.
    pub fn abort_macro(&mut self) -> bool {
        let Some(mut open) = self.open_macro.take() else {
            return false;
        };
        tracing::warn!(
            target: targets::COMMAND,
            label = %open.label,
            members = open.members.len(),
            "rolling back macro"
        );
        roll_back(&mut open.members);
        true
    }

    /// Run `f` inside a macro that is closed on success and aborted on
    /// error.
    pub fn with_macro<R>(
        &mut self,
        label: impl Into<String>,
        f: impl FnOnce(&mut Self) -> ModelResult<R>,
    ) -> ModelResult<R> {
        self.begin_macro(label);
        match f(self) {
            Ok(value) => {
                self.end_macro()?;
                Ok(value)
            }
            Err(err) => {
                self.abort_macro();
                Err(err)
            }
        }
    }

    /// Undo the newest log entry. `Ok(false)` when there is nothing to
    /// undo, no log, or a macro is open.
    pub fn undo(&mut self) -> ModelResult<bool> {
        if self.open_macro.is_some() {
            tracing::warn!(target: targets::COMMAND, "undo ignored while a macro is open");
            return Ok(false);
        }
        let Some(history) = &mut self.history else {
            return Ok(false);
        };
        let label = history.undo_text().map(str::to_owned);
        let undone = history.undo()?;
        if undone {
            tracing::debug!(target: targets::COMMAND, command = label.as_deref(), "undone");
        }
        Ok(undone)
    }

    /// Redo the most recently undone entry. Same no-op rules as
    /// [`undo`](Self::undo).
    pub fn redo(&mut self) -> ModelResult<bool> {
        if self.open_macro.is_some() {
            tracing::warn!(target: targets::COMMAND, "redo ignored while a macro is open");
            return Ok(false);
        }
        let Some(history) = &mut self.history else {
            return Ok(false);
        };
        let label = history.redo_text().map(str::to_owned);
        let redone = history.redo()?;
        if redone {
            tracing::debug!(target: targets::COMMAND, command = label.as_deref(), "redone");
        }
        Ok(redone)
    }

    pub fn can_undo(&self) -> bool {
        self.history.as_ref().is_some_and(UndoStack::can_undo)
    }

    pub fn can_redo(&self) -> bool {
        self.history.as_ref().is_some_and(UndoStack::can_redo)
    }

    // -------------------------------------------------------------------------
    // Convenience routes
    // -------------------------------------------------------------------------

    /// Edit one cell through the log. `Ok(false)` when `index` does not
    /// resolve or the cell already holds `value`.
    pub fn set_data(
        &mut self,
        model: &impl CommandFactory,
        index: &ModelIndex,
        value: CellValue,
        aspect: Aspect,
    ) -> ModelResult<bool> {
        match model.set_data_command(index, value, aspect) {
            Some(command) => self.execute(command).map(|_| true),
            None => Ok(false),
        }
    }

    /// Insert `count` blank rows; returns their handles.
    pub fn insert_rows(
        &mut self,
        model: &impl CommandFactory,
        position: usize,
        count: usize,
        parent: &ModelIndex,
    ) -> ModelResult<Vec<ModelIndex>> {
        let result = self.execute(model.insert_rows_command(position, count, parent)?)?;
        let handle = model.model_handle();
        Ok(result
            .entity_ids()
            .iter()
            .map(|&id| handle.item_index(id, 0))
            .collect())
    }

    pub fn remove_rows(
        &mut self,
        model: &impl CommandFactory,
        position: usize,
        count: usize,
        parent: &ModelIndex,
    ) -> ModelResult<()> {
        self.execute(model.remove_rows_command(position, count, parent)?)
            .map(drop)
    }

    /// Append `entity` under `parent`; returns its handle.
    pub fn append(
        &mut self,
        model: &impl CommandFactory,
        entity: TreeEntity,
        parent: &ModelIndex,
    ) -> ModelResult<ModelIndex> {
        let result = self.execute(model.append_command(entity, parent)?)?;
        let handle = model.model_handle();
        Ok(result
            .entity_ids()
            .first()
            .map_or_else(ModelIndex::invalid, |&id| handle.item_index(id, 0)))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::model::{ItemModel, ListModel, TreeModel};

    fn texts(model: &ListModel) -> Vec<String> {
        (0..model.len())
            .filter_map(|row| model.display_text(&model.index(row, 0, &ModelIndex::invalid())))
            .collect()
    }

    fn executor() -> CommandExecutor {
        CommandExecutor::with_history(ExecutorConfig::default())
    }

    #[test]
    fn without_history_nothing_is_kept() {
        let model = Arc::new(ListModel::from_values(["a"]));
        let mut executor = CommandExecutor::new();
        let index = model.index(0, 0, &ModelIndex::invalid());

        assert!(executor.set_data(&model, &index, "b".into(), Aspect::Display).unwrap());
        assert_eq!(texts(&model), vec!["b"]);
        assert!(!executor.can_undo());
        assert!(!executor.undo().unwrap());
    }

    #[test]
    fn equal_edit_skips_the_log() {
        let model = Arc::new(ListModel::from_values(["a"]));
        let mut executor = executor();
        let index = model.index(0, 0, &ModelIndex::invalid());

        assert!(!executor.set_data(&model, &index, "a".into(), Aspect::Display).unwrap());
        assert!(!executor.can_undo());
    }

    #[test]
    fn execute_returns_result() {
        let model = Arc::new(ListModel::from_values(["a", "b"]));
        let mut executor = executor();
        let root = ModelIndex::invalid();

        let result = executor
            .execute(model.remove_rows_command(0, 1, &root).unwrap())
            .unwrap();
        assert!(matches!(result, CommandResult::Removed(ref ids) if ids.len() == 1));
        assert_eq!(executor.history().unwrap().undo_text(), Some("Removed 1 row"));
    }

    #[test]
    fn undo_on_empty_is_noop() {
        let mut executor = executor();
        assert!(!executor.undo().unwrap());
        assert!(!executor.redo().unwrap());
    }

    #[test]
    fn macro_is_one_entry() {
        let model = Arc::new(ListModel::from_values(["a"]));
        let mut executor = executor();
        let root = ModelIndex::invalid();

        executor.begin_macro("Batch");
        executor.insert_rows(&model, 1, 2, &root).unwrap();
        executor.remove_rows(&model, 0, 1, &root).unwrap();
        executor.end_macro().unwrap();

        assert_eq!(model.len(), 2);
        let history = executor.history().unwrap();
        assert_eq!(history.undo_count(), 1);
        assert_eq!(history.undo_text(), Some("Batch"));

        executor.undo().unwrap();
        assert_eq!(texts(&model), vec!["a"]);
        executor.redo().unwrap();
        assert_eq!(model.len(), 2);
    }

    #[test]
    fn nested_macros_flatten() {
        let model = Arc::new(ListModel::from_values(["a"]));
        let mut executor = executor();
        let root = ModelIndex::invalid();

        executor.begin_macro("Outer");
        executor.begin_macro("Inner");
        executor.insert_rows(&model, 0, 1, &root).unwrap();
        executor.end_macro().unwrap();
        assert!(executor.is_macro_open());
        executor.insert_rows(&model, 0, 1, &root).unwrap();
        executor.end_macro().unwrap();

        let history = executor.history().unwrap();
        assert_eq!(history.undo_count(), 1);
        assert_eq!(history.undo_text(), Some("Outer"));
        executor.undo().unwrap();
        assert_eq!(model.len(), 1);
    }

    #[test]
    fn end_without_begin() {
        let mut executor = executor();
        assert_eq!(executor.end_macro(), Err(ModelError::NoOpenMacro));
    }

    #[test]
    fn empty_macro_records_nothing() {
        let mut executor = executor();
        executor.begin_macro("Nothing");
        executor.end_macro().unwrap();
        assert!(!executor.can_undo());
    }

    #[test]
    fn undo_ignored_inside_macro() {
        let model = Arc::new(ListModel::from_values(["a"]));
        let mut executor = executor();
        let index = model.index(0, 0, &ModelIndex::invalid());
        executor.set_data(&model, &index, "b".into(), Aspect::Display).unwrap();

        executor.begin_macro("Open");
        assert!(!executor.undo().unwrap());
        executor.end_macro().unwrap();
        assert_eq!(texts(&model), vec!["b"]);
    }

    #[test]
    fn failure_rolls_back_macro() {
        let model = Arc::new(ListModel::from_values(["a", "b"]));
        let mut executor = executor();
        let root = ModelIndex::invalid();

        let outcome = executor.with_macro("Broken", |exec| {
            exec.insert_rows(&model, 0, 1, &root)?;
            let index = model.index(1, 0, &root);
            exec.set_data(&model, &index, "changed".into(), Aspect::Display)?;
            exec.remove_rows(&model, 10, 1, &root)
        });

        assert!(matches!(outcome, Err(ModelError::OutOfRange { .. })));
        assert!(!executor.is_macro_open());
        assert!(!executor.can_undo());
        assert_eq!(texts(&model), vec!["a", "b"]);
    }

    #[test]
    fn with_macro_closes_on_success() {
        let tree = Arc::new(TreeModel::with_header(["Name"]));
        let mut executor = executor();
        let root = ModelIndex::invalid();

        let index = executor
            .with_macro("Add Node", |exec| {
                let index = exec.append(&tree, TreeEntity::from_values(["node"]), &root)?;
                exec.set_data(&tree, &index, "Cube".into(), Aspect::Display)?;
                Ok(index)
            })
            .unwrap();

        assert_eq!(tree.display_text(&index).as_deref(), Some("Cube"));
        assert_eq!(executor.history().unwrap().undo_count(), 1);
        executor.undo().unwrap();
        assert_eq!(tree.row_count(&root), 0);
    }

    #[test]
    fn history_can_be_swapped() {
        let model = Arc::new(ListModel::from_values(["a"]));
        let mut executor = CommandExecutor::new();
        let index = model.index(0, 0, &ModelIndex::invalid());

        assert!(executor.attach_history(UndoStack::new()).is_none());
        executor.set_data(&model, &index, "b".into(), Aspect::Display).unwrap();
        let history = executor.detach_history().unwrap();
        assert_eq!(history.undo_count(), 1);
        assert!(!executor.can_undo());
    }
}
