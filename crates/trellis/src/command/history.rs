//! Linear undo/redo log.
//!
//! [`UndoStack`] owns executed [`Command`]s. Pushing after an undo discards
//! the redo tail.

use std::collections::VecDeque;
use std::fmt;

use super::command::Command;
use crate::error::ModelResult;

/// Default maximum number of undo steps.
pub const DEFAULT_MAX_UNDO: usize = 100;

/// Undo log settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutorConfig {
    /// Entries kept before the oldest is dropped. `0` keeps everything.
    pub max_undo: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_undo: DEFAULT_MAX_UNDO,
        }
    }
}

impl ExecutorConfig {
    pub fn unlimited() -> Self {
        Self { max_undo: 0 }
    }

    pub fn with_max_undo(mut self, max_undo: usize) -> Self {
        self.max_undo = max_undo;
        self
    }
}

/// Applied commands available to undo, and undone ones available to redo.
///
/// The undo side is a bounded [`VecDeque`]: once it exceeds `max_undo` the
/// oldest entry falls off the front.
pub struct UndoStack {
    undo_stack: VecDeque<Command>,
    redo_stack: Vec<Command>,
    max_undo: usize,
    /// Distance from the clean state.
    ///
    /// - `Some(0)`: the current state is clean.
    /// - `Some(n)`, `n > 0`: `n` undos reach the clean state.
    /// - `Some(n)`, `n < 0`: `|n|` redos reach the clean state.
    /// - `None`: the clean state is unreachable (dropped by the bound or
    ///   discarded with the redo tail).
    clean_distance: Option<i64>,
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::with_config(ExecutorConfig::default())
    }
}

impl UndoStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ExecutorConfig) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            max_undo: config.max_undo,
            clean_distance: Some(0),
        }
    }

    /// Record an already-applied command as the newest entry.
    pub fn push(&mut self, command: Command) {
        self.redo_stack.clear();
        if let Some(d) = self.clean_distance
            && d < 0
        {
            self.clean_distance = None;
        }
        if let Some(d) = &mut self.clean_distance {
            *d += 1;
        }
        self.undo_stack.push_back(command);
        self.enforce_bound();
    }

    /// Undo the newest entry. `Ok(false)` when there is nothing to undo.
    ///
    /// A failing entry stays on the undo side.
    pub fn undo(&mut self) -> ModelResult<bool> {
        let Some(mut command) = self.undo_stack.pop_back() else {
            return Ok(false);
        };
        if let Err(err) = command.undo() {
            self.undo_stack.push_back(command);
            return Err(err);
        }
        self.redo_stack.push(command);
        if let Some(d) = &mut self.clean_distance {
            *d -= 1;
        }
        Ok(true)
    }

    /// Redo the most recently undone entry. `Ok(false)` when there is
    /// nothing to redo.
    pub fn redo(&mut self) -> ModelResult<bool> {
        let Some(mut command) = self.redo_stack.pop() else {
            return Ok(false);
        };
        if let Err(err) = command.redo() {
            self.redo_stack.push(command);
            return Err(err);
        }
        self.undo_stack.push_back(command);
        if let Some(d) = &mut self.clean_distance {
            *d += 1;
        }
        self.enforce_bound();
        Ok(true)
    }

    fn enforce_bound(&mut self) {
        if self.max_undo == 0 || self.undo_stack.len() <= self.max_undo {
            return;
        }
        self.undo_stack.pop_front();
        if let Some(d) = self.clean_distance
            && d > self.undo_stack.len() as i64
        {
            self.clean_distance = None;
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Label of the entry `undo` would reverse.
    pub fn undo_text(&self) -> Option<&str> {
        self.undo_stack.back().map(Command::text)
    }

    /// Label of the entry `redo` would reapply.
    pub fn redo_text(&self) -> Option<&str> {
        self.redo_stack.last().map(Command::text)
    }

    /// Undo labels, most recent first.
    pub fn undo_descriptions(&self) -> impl Iterator<Item = &str> {
        self.undo_stack.iter().rev().map(Command::text)
    }

    /// Redo labels, most recent first.
    pub fn redo_descriptions(&self) -> impl Iterator<Item = &str> {
        self.redo_stack.iter().rev().map(Command::text)
    }

    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn max_undo(&self) -> usize {
        self.max_undo
    }

    /// Mark the current state as clean (saved).
    pub fn set_clean(&mut self) {
        self.clean_distance = Some(0);
    }

    pub fn is_clean(&self) -> bool {
        self.clean_distance == Some(0)
    }

    /// Drop every entry without touching the model.
    ///
    /// A clean state stays clean; otherwise it becomes unreachable.
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        if self.clean_distance != Some(0) {
            self.clean_distance = None;
        }
    }
}

impl fmt::Debug for UndoStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UndoStack")
            .field("undo_count", &self.undo_stack.len())
            .field("redo_count", &self.redo_stack.len())
            .field("max_undo", &self.max_undo)
            .field("clean_distance", &self.clean_distance)
            .finish()
    }
}
