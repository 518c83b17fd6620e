//! Undoable editing.
//!
//! A [`Command`] is one reversible mutation of a mediator: a cell write, an
//! insert run or a remove run, or a macro grouping several of them. Build
//! commands with the [`CommandFactory`] methods every shared mediator has,
//! then hand them to a [`CommandExecutor`], which applies them and records
//! them on its [`UndoStack`].
//!
//! ```
//! use std::sync::Arc;
//! use trellis::command::{CommandExecutor, CommandFactory, ExecutorConfig};
//! use trellis::model::{ItemModel, ModelIndex, TreeEntity, TreeModel};
//!
//! let tree = Arc::new(TreeModel::with_header(["Name"]));
//! let mut executor = CommandExecutor::with_history(ExecutorConfig::default());
//! let root = ModelIndex::invalid();
//!
//! executor.begin_macro("Add Node");
//! let command = tree.append_command(TreeEntity::from_values(["Cube"]), &root).unwrap();
//! executor.execute(command).unwrap();
//! executor.end_macro().unwrap();
//! assert_eq!(tree.row_count(&root), 1);
//!
//! executor.undo().unwrap();
//! assert_eq!(tree.row_count(&root), 0);
//! ```

#[allow(clippy::module_inception)]
mod command;
mod executor;
mod factory;
mod history;

pub use command::{Command, CommandResult, ModelHandle};
pub use executor::CommandExecutor;
pub use factory::CommandFactory;
pub use history::{DEFAULT_MAX_UNDO, ExecutorConfig, UndoStack};
