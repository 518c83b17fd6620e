//! Reversible model mutations.

use std::fmt;
use std::sync::Arc;

use crate::error::{ModelError, ModelResult};
use crate::model::{Aspect, CellValue, EditableModel, EntityId, StructuralKind, TreeEntity};

/// Shared handle to the model a command edits.
pub type ModelHandle = Arc<dyn EditableModel>;

/// What the last `redo` produced.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandResult {
    /// A cell write; `true` when the entity was found and written.
    Written(bool),
    /// Ids of the inserted entities, in row order.
    Inserted(Vec<EntityId>),
    /// Ids of the removed entities, in row order.
    Removed(Vec<EntityId>),
    /// One result per macro member, in execution order.
    Macro(Vec<CommandResult>),
}

impl CommandResult {
    /// Entities a structural command touched; empty otherwise.
    pub fn entity_ids(&self) -> &[EntityId] {
        match self {
            CommandResult::Inserted(ids) | CommandResult::Removed(ids) => ids,
            _ => &[],
        }
    }
}

enum Payload {
    SetCell {
        model: ModelHandle,
        entity: EntityId,
        column: usize,
        aspect: Aspect,
        /// `None` when the cell was unset before the write.
        old: Option<CellValue>,
        new: CellValue,
    },
    InsertRun {
        model: ModelHandle,
        parent: EntityId,
        position: usize,
        ids: Vec<EntityId>,
        /// The entities while they are not attached.
        detached: Vec<TreeEntity>,
    },
    RemoveRun {
        model: ModelHandle,
        parent: EntityId,
        position: usize,
        ids: Vec<EntityId>,
        /// The entities while they are removed.
        detached: Vec<TreeEntity>,
    },
    Macro {
        members: Vec<Command>,
    },
}

/// One reversible mutation, or a macro of them.
///
/// A command captures everything it needs to reverse itself: the old cell
/// value, or the identities and (while detached) the entities of a run.
/// Structural commands check those identities before touching the model,
/// so replaying a command against a tree that was changed behind the
/// executor's back fails with a structural violation instead of removing
/// the wrong rows.
///
/// `redo` on an applied command and `undo` on an unapplied one are no-ops.
pub struct Command {
    text: String,
    payload: Payload,
    /// Set while applied.
    result: Option<CommandResult>,
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.payload {
            Payload::SetCell { .. } => "SetCell",
            Payload::InsertRun { .. } => "InsertRun",
            Payload::RemoveRun { .. } => "RemoveRun",
            Payload::Macro { .. } => "Macro",
        };
        f.debug_struct("Command")
            .field("kind", &kind)
            .field("text", &self.text)
            .field("applied", &self.is_applied())
            .finish_non_exhaustive()
    }
}

fn rows_label(verb: &str, count: usize) -> String {
    if count == 1 {
        format!("{verb} 1 row")
    } else {
        format!("{verb} {count} rows")
    }
}

impl Command {
    /// Write `new` into `(entity, column, aspect)`; undo restores `old`,
    /// or unsets the cell again when `old` is `None`.
    pub fn set_cell(
        model: ModelHandle,
        entity: EntityId,
        column: usize,
        aspect: Aspect,
        old: Option<CellValue>,
        new: CellValue,
    ) -> Self {
        Self::from_payload(
            format!("Set {aspect}"),
            Payload::SetCell {
                model,
                entity,
                column,
                aspect,
                old,
                new,
            },
        )
    }

    /// Attach `entities` as rows `position..` of `parent`.
    pub fn insert_run(model: ModelHandle, parent: EntityId, position: usize, entities: Vec<TreeEntity>) -> Self {
        Self::from_payload(
            rows_label("Inserted", entities.len()),
            Payload::InsertRun {
                model,
                parent,
                position,
                ids: entities.iter().map(TreeEntity::id).collect(),
                detached: entities,
            },
        )
    }

    /// Detach rows `position..position + count` of `parent`.
    ///
    /// The identities of those rows are captured now; the run must still
    /// hold exactly them when the command is applied.
    pub fn remove_run(model: ModelHandle, parent: EntityId, position: usize, count: usize) -> ModelResult<Self> {
        model.check_run(StructuralKind::Remove, parent, position, count)?;
        let ids = model.child_ids(parent)[position..position + count].to_vec();
        Ok(Self::from_payload(
            rows_label("Removed", count),
            Payload::RemoveRun {
                model,
                parent,
                position,
                ids,
                detached: Vec::new(),
            },
        ))
    }

    /// Group already-applied `members` into one macro entry.
    pub(crate) fn applied_macro(label: impl Into<String>, members: Vec<Command>) -> Self {
        let result = CommandResult::Macro(members.iter().filter_map(|m| m.result.clone()).collect());
        Self {
            text: label.into(),
            payload: Payload::Macro { members },
            result: Some(result),
        }
    }

    fn from_payload(text: String, payload: Payload) -> Self {
        Self {
            text,
            payload,
            result: None,
        }
    }

    /// Replace the label shown in undo menus.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_applied(&self) -> bool {
        self.result.is_some()
    }

    /// Number of primitive commands, counting macro members.
    pub fn len(&self) -> usize {
        match &self.payload {
            Payload::Macro { members } => members.iter().map(Command::len).sum(),
            _ => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Result of the last `redo`; `None` before the first one and after
    /// an `undo`.
    pub fn result(&self) -> Option<&CommandResult> {
        self.result.as_ref()
    }

    /// Apply the mutation.
    pub fn redo(&mut self) -> ModelResult<()> {
        self.apply().map(drop)
    }

    /// Apply the mutation and hand back its result.
    pub(crate) fn apply(&mut self) -> ModelResult<CommandResult> {
        if let Some(result) = &self.result {
            return Ok(result.clone());
        }
        let result = match &mut self.payload {
            Payload::SetCell {
                model,
                entity,
                column,
                aspect,
                new,
                ..
            } => {
                model.write_cell(*entity, *column, new.clone(), *aspect)?;
                CommandResult::Written(true)
            }
            Payload::InsertRun {
                model,
                parent,
                position,
                ids,
                detached,
            } => {
                model.check_run(StructuralKind::Insert, *parent, *position, detached.len())?;
                let attached = model.insert_entities(*parent, *position, std::mem::take(detached))?;
                if attached != *ids {
                    return Err(ModelError::violation(format!(
                        "inserted run under {parent} does not match the recorded entities"
                    )));
                }
                CommandResult::Inserted(attached)
            }
            Payload::RemoveRun {
                model,
                parent,
                position,
                ids,
                detached,
            } => {
                *detached = take_run(model.as_ref(), *parent, *position, ids)?;
                CommandResult::Removed(ids.clone())
            }
            Payload::Macro { members } => {
                let mut results = Vec::with_capacity(members.len());
                for applied in 0..members.len() {
                    match members[applied].apply() {
                        Ok(result) => results.push(result),
                        Err(err) => {
                            roll_back(&mut members[..applied]);
                            return Err(err);
                        }
                    }
                }
                CommandResult::Macro(results)
            }
        };
        self.result = Some(result.clone());
        Ok(result)
    }

    /// Reverse the mutation.
    pub fn undo(&mut self) -> ModelResult<()> {
        if !self.is_applied() {
            return Ok(());
        }
        match &mut self.payload {
            Payload::SetCell {
                model,
                entity,
                column,
                aspect,
                old,
                ..
            } => match old {
                Some(old) => model.write_cell(*entity, *column, old.clone(), *aspect)?,
                None => model.clear_cell(*entity, *column, *aspect)?,
            },
            Payload::InsertRun {
                model,
                parent,
                position,
                ids,
                detached,
            } => {
                *detached = take_run(model.as_ref(), *parent, *position, ids)?;
            }
            Payload::RemoveRun {
                model,
                parent,
                position,
                detached,
                ..
            } => {
                model.check_run(StructuralKind::Insert, *parent, *position, detached.len())?;
                model.insert_entities(*parent, *position, std::mem::take(detached))?;
            }
            Payload::Macro { members } => {
                for undone in (0..members.len()).rev() {
                    if let Err(err) = members[undone].undo() {
                        // Put the members after the failing one back.
                        redo_all(&mut members[undone + 1..]);
                        return Err(err);
                    }
                }
            }
        }
        self.result = None;
        Ok(())
    }
}

/// Detach the run `ids` at `position` under `parent`, checking identities
/// first.
fn take_run(
    model: &dyn EditableModel,
    parent: EntityId,
    position: usize,
    ids: &[EntityId],
) -> ModelResult<Vec<TreeEntity>> {
    model.check_run(StructuralKind::Remove, parent, position, ids.len())?;
    let current = model.child_ids(parent);
    if current[position..position + ids.len()] != *ids {
        return Err(ModelError::violation(format!(
            "rows {position}..{} under {parent} are not the recorded entities",
            position + ids.len()
        )));
    }
    model.remove_entities(parent, position, ids.len())
}

/// Undo `members` last first, logging instead of failing.
pub(crate) fn roll_back(members: &mut [Command]) {
    for member in members.iter_mut().rev() {
        if let Err(err) = member.undo() {
            tracing::error!(
                target: trellis_core::logging::targets::COMMAND,
                command = member.text(),
                %err,
                "rollback step failed"
            );
        }
    }
}

fn redo_all(members: &mut [Command]) {
    for member in members.iter_mut() {
        if let Err(err) = member.redo() {
            tracing::error!(
                target: trellis_core::logging::targets::COMMAND,
                command = member.text(),
                %err,
                "restoring macro member failed"
            );
        }
    }
}
