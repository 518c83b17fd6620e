//! Model index for addressing items in hierarchical models.
//!
//! A `ModelIndex` is the opaque handle views use to address a cell: row and
//! column within a parent, the parent's own handle, and an internal id the
//! model uses to find the entity behind it.

use std::hash::{Hash, Hasher};

/// Represents a position within an `ItemModel`.
///
/// Every model in this crate stores the [`EntityId`](super::EntityId) of
/// the addressed entity as the internal id, so a handle keeps resolving to
/// the same entity while it stays attached. Row and column are still only
/// a snapshot: after a structural bracket that shifts rows at or below the
/// handle, re-acquire it from the model.
///
/// # Example
///
/// ```ignore
/// use trellis::model::{ItemModel, ModelIndex};
///
/// // Top-level item
/// let index = model.index(0, 0, &ModelIndex::invalid());
///
/// // Its first child
/// let child = model.index(0, 0, &index);
/// assert_eq!(child.parent(), index);
/// ```
#[derive(Clone)]
pub struct ModelIndex {
    row: usize,
    column: usize,
    /// `None` for top-level items.
    parent: Option<Box<ModelIndex>>,
    internal_id: u64,
    valid: bool,
}

impl Default for ModelIndex {
    fn default() -> Self {
        Self::invalid()
    }
}

impl ModelIndex {
    /// The null handle.
    ///
    /// Used for the invisible root (as a parent reference) and for
    /// anything that failed to resolve.
    #[inline]
    pub const fn invalid() -> Self {
        Self {
            row: 0,
            column: 0,
            parent: None,
            internal_id: 0,
            valid: false,
        }
    }

    /// Creates a valid index. Called by model implementations.
    #[inline]
    pub fn new(row: usize, column: usize, parent: ModelIndex, internal_id: u64) -> Self {
        Self {
            row,
            column,
            parent: parent.is_valid().then(|| Box::new(parent)),
            internal_id,
            valid: true,
        }
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Row within the parent. 0 for invalid indices.
    #[inline]
    pub fn row(&self) -> usize {
        self.row
    }

    /// Column within the parent. 0 for invalid indices.
    #[inline]
    pub fn column(&self) -> usize {
        self.column
    }

    /// The parent index, or an invalid index for top-level items.
    #[inline]
    pub fn parent(&self) -> ModelIndex {
        match &self.parent {
            Some(parent) => (**parent).clone(),
            None => ModelIndex::invalid(),
        }
    }

    /// Model-specific identifier of the addressed item.
    #[inline]
    pub fn internal_id(&self) -> u64 {
        self.internal_id
    }

    /// Same row and parent, different column. Not validated against a model.
    pub fn with_column(&self, column: usize) -> ModelIndex {
        if !self.is_valid() {
            return ModelIndex::invalid();
        }
        Self {
            column,
            ..self.clone()
        }
    }

    /// Depth in the hierarchy; top-level items (and invalid indices) are 0.
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut current = self.parent.as_deref();
        while let Some(parent) = current {
            depth += 1;
            current = parent.parent.as_deref();
        }
        depth
    }
}

impl std::fmt::Debug for ModelIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_valid() {
            f.debug_struct("ModelIndex")
                .field("row", &self.row)
                .field("column", &self.column)
                .field("depth", &self.depth())
                .field("internal_id", &self.internal_id)
                .finish()
        } else {
            write!(f, "ModelIndex(invalid)")
        }
    }
}

impl PartialEq for ModelIndex {
    fn eq(&self, other: &Self) -> bool {
        match (self.valid, other.valid) {
            (false, false) => true,
            (true, true) => {
                self.row == other.row
                    && self.column == other.column
                    && self.internal_id == other.internal_id
                    && self.parent == other.parent
            }
            _ => false,
        }
    }
}

impl Eq for ModelIndex {}

impl Hash for ModelIndex {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.valid.hash(state);
        if self.valid {
            self.row.hash(state);
            self.column.hash(state);
            // The internal id already identifies the parent chain.
            self.internal_id.hash(state);
        }
    }
}
