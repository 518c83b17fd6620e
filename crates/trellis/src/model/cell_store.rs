//! Sparse, aspect-keyed storage for one entity's cells.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::aspect::{Aspect, CellValue};

/// Aspects populated by [`CellStore::from_values`] when none are given:
/// the display text doubles as edit value, tooltip and accessible text.
pub const DEFAULT_BUILD_ASPECTS: [Aspect; 4] = [
    Aspect::ToolTip,
    Aspect::AccessibleText,
    Aspect::Display,
    Aspect::Edit,
];

/// Mapping from `(aspect, column)` to a value.
///
/// At most one value is held per pair. Reads never fail: a missing pair
/// yields the caller's default. The store's [`len`](Self::len) is the
/// number of columns set under [`Aspect::PRIMARY`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CellStore {
    buckets: HashMap<Aspect, BTreeMap<usize, CellValue>>,
}

impl CellStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Populate every listed aspect with the same value for each column.
    pub fn build_from<I, V>(entries: I, aspects: &[Aspect]) -> Self
    where
        I: IntoIterator<Item = (usize, V)>,
        V: Into<CellValue>,
    {
        let mut store = Self::new();
        for (column, value) in entries {
            let value = value.into();
            for aspect in aspects {
                store.set(*aspect, column, value.clone());
            }
        }
        store
    }

    /// Like [`build_from`](Self::build_from) for a positional list, using
    /// [`DEFAULT_BUILD_ASPECTS`].
    pub fn from_values<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<CellValue>,
    {
        Self::build_from(values.into_iter().enumerate(), &DEFAULT_BUILD_ASPECTS)
    }

    /// Borrow the stored value, if any.
    pub fn get(&self, aspect: Aspect, column: usize) -> Option<&CellValue> {
        self.buckets.get(&aspect)?.get(&column)
    }

    /// The stored value, or `default` when the pair was never written.
    pub fn get_or(&self, aspect: Aspect, column: usize, default: CellValue) -> CellValue {
        self.get(aspect, column).cloned().unwrap_or(default)
    }

    /// Store a value, creating the aspect bucket on first use.
    pub fn set(&mut self, aspect: Aspect, column: usize, value: CellValue) {
        self.buckets.entry(aspect).or_default().insert(column, value);
    }

    pub fn remove(&mut self, aspect: Aspect, column: usize) -> Option<CellValue> {
        let bucket = self.buckets.get_mut(&aspect)?;
        let removed = bucket.remove(&column);
        if bucket.is_empty() {
            self.buckets.remove(&aspect);
        }
        removed
    }

    pub fn has(&self, aspect: Aspect, column: usize) -> bool {
        self.get(aspect, column).is_some()
    }

    /// Number of columns under the primary aspect.
    pub fn len(&self) -> usize {
        self.buckets.get(&Aspect::PRIMARY).map_or(0, BTreeMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.values().all(BTreeMap::is_empty)
    }

    /// Columns written under `aspect`, ascending.
    pub fn columns(&self, aspect: Aspect) -> impl Iterator<Item = usize> + '_ {
        self.buckets
            .get(&aspect)
            .into_iter()
            .flat_map(|bucket| bucket.keys().copied())
    }

    /// Every column written under any aspect, ascending.
    pub fn all_columns(&self) -> BTreeSet<usize> {
        self.buckets
            .values()
            .flat_map(|bucket| bucket.keys().copied())
            .collect()
    }

    pub fn aspects(&self) -> impl Iterator<Item = Aspect> + '_ {
        self.buckets.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_pair_returns_default() {
        let store = CellStore::new();
        assert_eq!(store.get(Aspect::Display, 3), None);
        assert_eq!(
            store.get_or(Aspect::Edit, 7, CellValue::from("fallback")),
            CellValue::from("fallback")
        );
    }

    #[test]
    fn test_set_overwrites() {
        let mut store = CellStore::new();
        store.set(Aspect::Edit, 0, "foo".into());
        store.set(Aspect::Edit, 0, "bar".into());
        assert_eq!(store.get(Aspect::Edit, 0), Some(&CellValue::from("bar")));
        assert_eq!(store.columns(Aspect::Edit).count(), 1);
    }

    #[test]
    fn test_len_counts_primary_aspect_only() {
        let mut store = CellStore::new();
        store.set(Aspect::ToolTip, 0, "tip".into());
        store.set(Aspect::ToolTip, 1, "tip".into());
        assert_eq!(store.len(), 0);
        assert!(!store.is_empty());

        store.set(Aspect::Display, 4, "name".into());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_from_values_fills_default_aspects() {
        let store = CellStore::from_values(["Name", "Value"]);
        assert_eq!(store.len(), 2);
        for aspect in DEFAULT_BUILD_ASPECTS {
            assert_eq!(store.get(aspect, 1), Some(&CellValue::from("Value")));
        }
        assert!(!store.has(Aspect::Decoration, 0));
    }

    #[test]
    fn test_build_from_mapping() {
        let store = CellStore::build_from([(2, 10), (5, 20)], &[Aspect::Edit]);
        assert_eq!(store.columns(Aspect::Edit).collect::<Vec<_>>(), vec![2, 5]);
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_remove_drops_empty_bucket() {
        let mut store = CellStore::new();
        store.set(Aspect::Flags, 0, CellValue::Bool(true));
        assert!(store.remove(Aspect::Flags, 0).is_some());
        assert_eq!(store.aspects().count(), 0);
        assert!(store.remove(Aspect::Flags, 0).is_none());
    }
}
