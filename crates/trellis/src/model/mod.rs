//! Observable document model.
//!
//! Data lives in [`Entity`] values: a stable id, a kind tag and a sparse
//! [`CellStore`] of `(aspect, column)` cells. Entities compose into trees
//! ([`TreeEntity`]) and are attached to a mediator, which owns them in an
//! [`EntityArena`] and presents them to views through `(row, column,
//! parent)` handles.
//!
//! # Core Types
//!
//! - [`ModelIndex`]: Identifies an item's position in a model
//! - [`Aspect`]: Which facet of a cell to access (display, edit, ...)
//! - [`CellValue`]: Type-erased cell value
//! - [`ItemModel`]: The read interface views consume
//! - [`EditableModel`]: The id-addressed write interface commands use
//! - [`ModelSignals`]: Structural brackets and change notifications
//!
//! # Model Implementations
//!
//! - [`ListModel`]: Flat, single-column list
//! - [`TableModel`]: Flat grid whose columns follow its horizontal header
//! - [`TreeModel`]: Hierarchy whose root cells double as the header
//! - [`FilterView`]: Read-only filtering layer over any of the above
//!
//! # Example
//!
//! ```
//! use trellis::model::{ItemModel, ListModel, ModelIndex};
//!
//! let model = ListModel::from_values(["Apple", "Banana"]);
//!
//! let root = ModelIndex::invalid();
//! let first_item = model.index(0, 0, &root);
//! assert_eq!(model.display_text(&first_item).as_deref(), Some("Apple"));
//!
//! model.signals().rows_inserted.connect(|(_parent, first, last)| {
//!     println!("rows {first}..={last} inserted");
//! });
//! ```
//!
//! # Architecture Overview
//!
//! ```text
//! ┌──────────────┐  bracket   ┌─────────────┐     ┌─────────────┐
//! │   Mediator   │───────────>│   Signals   │────>│    View     │
//! │ (ModelCore)  │            │             │     │ (external)  │
//! └──────────────┘            └─────────────┘     └─────────────┘
//!        │ owns                                          │
//!        v                    ┌─────────────┐            │
//! ┌──────────────┐  resolves  │ ModelIndex  │<───────────┘
//! │ EntityArena  │<───────────│   Aspect    │
//! │  (entities)  │            │  CellValue  │
//! └──────────────┘            └─────────────┘
//! ```
//!
//! Views read through [`ItemModel`]. Edits meant to be undoable go through
//! a [`CommandExecutor`](crate::command::CommandExecutor) instead of
//! [`ItemModel::set_data`].

pub(crate) mod arena;
pub(crate) mod aspect;
pub(crate) mod cell_store;
pub(crate) mod entity;
pub(crate) mod filter_view;
pub(crate) mod index;
pub(crate) mod list_model;
pub(crate) mod mediator;
pub(crate) mod schema;
pub(crate) mod table_model;
pub(crate) mod traits;
pub(crate) mod tree_model;

pub use arena::{ArenaEvent, CellChange, EntityArena};
pub use aspect::{Aspect, CellValue, CheckState, ItemFlags};
pub use cell_store::{CellStore, DEFAULT_BUILD_ASPECTS};
pub use entity::{CellKey, Entity, EntityId, EntityKind, TreeEntity};
pub use filter_view::{ColumnFilter, FilterFn, FilterView, FilterViewBuilder};
pub use index::ModelIndex;
pub use list_model::ListModel;
pub use mediator::ModelCore;
pub use schema::{FieldDef, FieldSchema, KindRegistry};
pub use table_model::TableModel;
pub use traits::{EditableModel, EntityFactory, ItemModel, ModelSignals, Orientation, StructuralKind};
pub use tree_model::TreeModel;
