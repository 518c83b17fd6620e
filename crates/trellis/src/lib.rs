//! Observable hierarchical document models with undoable editing.
//!
//! Trellis keeps application data in entities: a stable id, a kind tag and
//! sparse `(aspect, column)` cells. A mediator owns a tree of them and
//! presents it to views as rows and columns, bracketing every structural
//! change with about-to/done notifications. Edits go through reversible
//! commands so they can be undone, and read-only filter views can be
//! layered on top of any mediator.
//!
//! # Modules
//!
//! - [`model`]: Entities, cell storage, list/table/tree mediators, filter
//!   views and the kind registry
//! - [`command`]: Commands, the command executor and the undo log
//! - [`error`]: [`ModelError`] and [`ModelResult`]
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use trellis::command::{CommandExecutor, ExecutorConfig};
//! use trellis::model::{Aspect, ItemModel, ModelIndex, TreeEntity, TreeModel};
//!
//! let scene = Arc::new(TreeModel::with_header(["Name"]));
//! let mut executor = CommandExecutor::with_history(ExecutorConfig::default());
//! let root = ModelIndex::invalid();
//!
//! let camera = executor
//!     .append(&scene, TreeEntity::from_values(["Camera"]), &root)
//!     .unwrap();
//! executor
//!     .set_data(&scene, &camera, "Main Camera".into(), Aspect::Display)
//!     .unwrap();
//!
//! executor.undo().unwrap();
//! assert_eq!(scene.display_text(&camera).as_deref(), Some("Camera"));
//! ```

pub mod command;
pub mod error;
pub mod model;

pub use error::{ModelError, ModelResult};
