//! Core primitives for Trellis.
//!
//! This crate provides the pieces the model layer is built on:
//!
//! - **Signals**: A synchronous, ordered observer list ([`Signal`]) used for
//!   every change notification.
//! - **Logging**: `tracing` target names and tree debug formatting
//!   ([`logging`]).
//!
//! # Quick Start
//!
//! ```
//! use trellis_core::Signal;
//!
//! let rows_inserted = Signal::<(usize, usize)>::new();
//! rows_inserted.connect(|(first, last)| {
//!     println!("rows {first}..={last} inserted");
//! });
//! rows_inserted.emit((0, 2));
//! ```
//!
//! # Related Crates
//!
//! - `trellis` - Entities, mediators, commands and filter views

pub mod logging;
pub mod signal;

pub use logging::{DebugTree, TreeDebug, TreeFormatOptions, TreeStyle};
pub use signal::{ConnectionGuard, ConnectionId, Signal};
