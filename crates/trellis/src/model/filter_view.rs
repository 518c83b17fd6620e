//! Read-only filtering layer over another model.
//!
//! `FilterView` wraps any [`ItemModel`] (a mediator or another view) and
//! shows the subset of its rows accepted by a predicate. In recursive mode a
//! row that fails the predicate stays visible when one of its descendants
//! passes, so matches deep in a tree keep their ancestors as scaffolding.
//!
//! Row mappings are derived lazily per source parent and thrown away on
//! every source notification; the view re-announces the change as a
//! `layout_about_to_change`/`layout_changed` pair.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use trellis_core::logging::targets;
use trellis_core::{ConnectionId, Signal};

use super::aspect::{Aspect, CellValue, ItemFlags};
use super::index::ModelIndex;
use super::traits::{ItemModel, ModelSignals, Orientation};

/// Row predicate: `(source, source_row, source_parent) -> keep`.
pub type FilterFn<S> = Arc<dyn Fn(&S, usize, &ModelIndex) -> bool + Send + Sync>;

/// Predicate over one cell value of the filter aspect.
pub type ColumnFilter = Arc<dyn Fn(&CellValue) -> bool + Send + Sync>;

/// Visible rows under one source parent.
#[derive(Debug, Default)]
struct RowMapping {
    /// View row -> source row.
    proxy_to_source: Vec<usize>,
    /// Source row -> view row, `None` when hidden.
    source_to_proxy: Vec<Option<usize>>,
}

impl RowMapping {
    fn with_source_rows(count: usize) -> Self {
        Self {
            proxy_to_source: Vec::new(),
            source_to_proxy: vec![None; count],
        }
    }

    fn push(&mut self, source_row: usize) {
        self.source_to_proxy[source_row] = Some(self.proxy_to_source.len());
        self.proxy_to_source.push(source_row);
    }

    fn len(&self) -> usize {
        self.proxy_to_source.len()
    }

    fn map_to_source(&self, proxy_row: usize) -> Option<usize> {
        self.proxy_to_source.get(proxy_row).copied()
    }

    fn map_from_source(&self, source_row: usize) -> Option<usize> {
        self.source_to_proxy.get(source_row).and_then(|&x| x)
    }
}

struct FilterState<S> {
    predicate: Option<FilterFn<S>>,
    columns: Vec<(usize, ColumnFilter)>,
    aspect: Aspect,
    recursive: bool,
}

impl<S> Default for FilterState<S> {
    fn default() -> Self {
        Self {
            predicate: None,
            columns: Vec::new(),
            aspect: Aspect::Display,
            recursive: false,
        }
    }
}

/// Our slots on the source's signals.
struct SourceConnections {
    rows_about_to_be_inserted: ConnectionId,
    rows_inserted: ConnectionId,
    rows_about_to_be_removed: ConnectionId,
    rows_removed: ConnectionId,
    data_changed: ConnectionId,
    header_data_changed: ConnectionId,
    layout_about_to_change: ConnectionId,
    layout_changed: ConnectionId,
}

/// A filtering view over a source model.
///
/// Views are always shared: [`FilterViewBuilder::build`] returns an
/// `Arc<FilterView<S>>`, which can itself be the source of another view.
///
/// # Example
///
/// ```
/// use trellis::model::{FilterView, ItemModel, ListModel, ModelIndex};
/// use std::sync::Arc;
///
/// let source = Arc::new(ListModel::from_values(["Alice", "Bob", "Charlie"]));
/// let view = FilterView::builder(source.clone())
///     .text_contains(0, "li")
///     .build();
///
/// assert_eq!(view.row_count(&ModelIndex::invalid()), 2);
/// ```
pub struct FilterView<S: ItemModel> {
    source: Arc<S>,
    state: RwLock<FilterState<S>>,
    overrides: RwLock<HashMap<Aspect, CellValue>>,
    /// Keyed by the source parent's internal id, `None` for the root.
    mappings: RwLock<HashMap<Option<u64>, RowMapping>>,
    signals: ModelSignals,
    connections: SourceConnections,
}

impl<S: ItemModel> std::fmt::Debug for FilterView<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("FilterView")
            .field("has_predicate", &state.predicate.is_some())
            .field("column_filters", &state.columns.len())
            .field("aspect", &state.aspect)
            .field("recursive", &state.recursive)
            .field("cached_parents", &self.mappings.read().len())
            .finish_non_exhaustive()
    }
}

impl<S: ItemModel + 'static> FilterView<S> {
    /// A view that shows every source row.
    pub fn new(source: Arc<S>) -> Arc<Self> {
        Self::builder(source).build()
    }

    pub fn builder(source: Arc<S>) -> FilterViewBuilder<S> {
        FilterViewBuilder::new(source)
    }

    fn from_parts(
        source: Arc<S>,
        state: FilterState<S>,
        overrides: HashMap<Aspect, CellValue>,
        weak: &Weak<Self>,
    ) -> Self {
        let connections = Self::connect_source(&source, weak);
        Self {
            source,
            state: RwLock::new(state),
            overrides: RwLock::new(overrides),
            mappings: RwLock::new(HashMap::new()),
            signals: ModelSignals::new(),
            connections,
        }
    }

    fn connect_source(source: &S, weak: &Weak<Self>) -> SourceConnections {
        let signals = source.signals();
        SourceConnections {
            rows_about_to_be_inserted: relay(&signals.rows_about_to_be_inserted, weak, |view, _| {
                view.signals.layout_about_to_change.emit(());
            }),
            rows_inserted: relay(&signals.rows_inserted, weak, |view, _| view.rederive()),
            rows_about_to_be_removed: relay(&signals.rows_about_to_be_removed, weak, |view, _| {
                view.signals.layout_about_to_change.emit(());
            }),
            rows_removed: relay(&signals.rows_removed, weak, |view, _| view.rederive()),
            data_changed: relay(&signals.data_changed, weak, |view, (top_left, bottom_right, aspects)| {
                view.source_data_changed(top_left, bottom_right, aspects);
            }),
            header_data_changed: relay(&signals.header_data_changed, weak, |view, args| {
                view.signals.header_data_changed.emit(*args);
            }),
            layout_about_to_change: relay(&signals.layout_about_to_change, weak, |view, _| {
                view.signals.layout_about_to_change.emit(());
            }),
            layout_changed: relay(&signals.layout_changed, weak, |view, _| view.rederive()),
        }
    }

    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    // -------------------------------------------------------------------------
    // Filter configuration
    // -------------------------------------------------------------------------

    pub fn set_filter<F>(&self, filter: F)
    where
        F: Fn(&S, usize, &ModelIndex) -> bool + Send + Sync + 'static,
    {
        self.state.write().predicate = Some(Arc::new(filter));
        self.invalidate();
    }

    pub fn clear_filter(&self) {
        self.state.write().predicate = None;
        self.invalidate();
    }

    /// Require the filter-aspect value of `column` to satisfy `filter`.
    /// Replaces any earlier filter on the same column.
    pub fn set_column_filter<F>(&self, column: usize, filter: F)
    where
        F: Fn(&CellValue) -> bool + Send + Sync + 'static,
    {
        {
            let mut state = self.state.write();
            state.columns.retain(|(c, _)| *c != column);
            state.columns.push((column, Arc::new(filter)));
        }
        self.invalidate();
    }

    pub fn clear_column_filters(&self) {
        self.state.write().columns.clear();
        self.invalidate();
    }

    /// Aspect read by column filters. Defaults to [`Aspect::Display`].
    pub fn set_filter_aspect(&self, aspect: Aspect) {
        self.state.write().aspect = aspect;
        self.invalidate();
    }

    pub fn filter_aspect(&self) -> Aspect {
        self.state.read().aspect
    }

    /// Keep non-matching rows that have a matching descendant.
    pub fn set_recursive(&self, recursive: bool) {
        self.state.write().recursive = recursive;
        self.invalidate();
    }

    pub fn is_recursive(&self) -> bool {
        self.state.read().recursive
    }

    /// Substitute `value` for `aspect` on rows shown only as scaffolding.
    pub fn set_override(&self, aspect: Aspect, value: impl Into<CellValue>) {
        self.overrides.write().insert(aspect, value.into());
        self.invalidate();
    }

    pub fn clear_overrides(&self) {
        self.overrides.write().clear();
        self.invalidate();
    }

    /// Throw away every row mapping and announce a layout change.
    pub fn invalidate(&self) {
        self.signals.emit_layout_changed(|| {
            self.mappings.write().clear();
        });
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// Whether source row `row` under `source_parent` passes the predicate
    /// on its own cells.
    pub fn row_matches(&self, row: usize, source_parent: &ModelIndex) -> bool {
        let state = self.state.read();
        if let Some(predicate) = &state.predicate {
            if !predicate(&self.source, row, source_parent) {
                return false;
            }
        }
        state.columns.iter().all(|(column, filter)| {
            let index = self.source.index(row, *column, source_parent);
            filter(&self.source.data(&index, state.aspect))
        })
    }

    /// Whether source row `row` under `source_parent` is shown.
    ///
    /// Hidden parents hide their whole subtree; this only answers for the
    /// level under `source_parent`.
    pub fn row_visible(&self, row: usize, source_parent: &ModelIndex) -> bool {
        self.with_mapping(source_parent, |mapping| mapping.map_from_source(row).is_some())
    }

    /// Source handle behind a view handle.
    pub fn map_to_source(&self, index: &ModelIndex) -> ModelIndex {
        if !index.is_valid() {
            return ModelIndex::invalid();
        }
        let Some(source_parent) = self.source_parent(&index.parent()) else {
            return ModelIndex::invalid();
        };
        let Some(source_row) = self.with_mapping(&source_parent, |m| m.map_to_source(index.row())) else {
            return ModelIndex::invalid();
        };
        let source_index = self.source.index(source_row, index.column(), &source_parent);
        // A handle from before the last re-derivation may point elsewhere now.
        if source_index.internal_id() != index.internal_id() {
            return ModelIndex::invalid();
        }
        source_index
    }

    /// View handle for a source handle; invalid when the row is hidden.
    pub fn map_from_source(&self, source_index: &ModelIndex) -> ModelIndex {
        if !source_index.is_valid() {
            return ModelIndex::invalid();
        }
        let source_parent = self.source.parent(source_index);
        let view_parent = if source_parent.is_valid() {
            let parent = self.map_from_source(&source_parent);
            if !parent.is_valid() {
                return ModelIndex::invalid();
            }
            parent
        } else {
            ModelIndex::invalid()
        };
        match self.with_mapping(&source_parent, |m| m.map_from_source(source_index.row())) {
            Some(row) => ModelIndex::new(row, source_index.column(), view_parent, source_index.internal_id()),
            None => ModelIndex::invalid(),
        }
    }

    // -------------------------------------------------------------------------
    // Mapping
    // -------------------------------------------------------------------------

    /// Source parent for a view parent; `None` when the view parent is stale.
    fn source_parent(&self, view_parent: &ModelIndex) -> Option<ModelIndex> {
        if !view_parent.is_valid() {
            return Some(ModelIndex::invalid());
        }
        let source = self.map_to_source(view_parent);
        source.is_valid().then_some(source)
    }

    fn with_mapping<R>(&self, source_parent: &ModelIndex, f: impl FnOnce(&RowMapping) -> R) -> R {
        let key = source_parent.is_valid().then(|| source_parent.internal_id());
        if let Some(mapping) = self.mappings.read().get(&key) {
            return f(mapping);
        }
        let mapping = self.derive_mapping(source_parent);
        let result = f(&mapping);
        self.mappings.write().insert(key, mapping);
        result
    }

    fn derive_mapping(&self, source_parent: &ModelIndex) -> RowMapping {
        let count = self.source.row_count(source_parent);
        let recursive = self.is_recursive();
        let mut mapping = RowMapping::with_source_rows(count);
        for row in 0..count {
            if self.row_matches(row, source_parent)
                || (recursive && self.has_matching_descendant(row, source_parent))
            {
                mapping.push(row);
            }
        }
        tracing::trace!(
            target: targets::FILTER,
            parent = ?source_parent,
            visible = mapping.len(),
            total = count,
            "row mapping derived"
        );
        mapping
    }

    fn has_matching_descendant(&self, row: usize, source_parent: &ModelIndex) -> bool {
        let index = self.source.index(row, 0, source_parent);
        if !index.is_valid() {
            return false;
        }
        (0..self.source.row_count(&index))
            .any(|child| self.row_matches(child, &index) || self.has_matching_descendant(child, &index))
    }

    fn rederive(&self) {
        self.mappings.write().clear();
        self.signals.layout_changed.emit(());
    }

    fn source_data_changed(&self, top_left: &ModelIndex, bottom_right: &ModelIndex, aspects: &[Aspect]) {
        self.invalidate();
        let top_left = self.map_from_source(top_left);
        let bottom_right = self.map_from_source(bottom_right);
        if top_left.is_valid() && bottom_right.is_valid() {
            self.signals
                .data_changed
                .emit((top_left, bottom_right, aspects.to_vec()));
        }
    }
}

fn relay<S, Args>(
    signal: &Signal<Args>,
    view: &Weak<FilterView<S>>,
    on: fn(&FilterView<S>, &Args),
) -> ConnectionId
where
    S: ItemModel + 'static,
    Args: 'static,
{
    let view = view.clone();
    signal.connect(move |args| {
        if let Some(view) = view.upgrade() {
            on(&view, args);
        }
    })
}

impl<S: ItemModel> Drop for FilterView<S> {
    fn drop(&mut self) {
        let signals = self.source.signals();
        let c = &self.connections;
        signals.rows_about_to_be_inserted.disconnect(c.rows_about_to_be_inserted);
        signals.rows_inserted.disconnect(c.rows_inserted);
        signals.rows_about_to_be_removed.disconnect(c.rows_about_to_be_removed);
        signals.rows_removed.disconnect(c.rows_removed);
        signals.data_changed.disconnect(c.data_changed);
        signals.header_data_changed.disconnect(c.header_data_changed);
        signals.layout_about_to_change.disconnect(c.layout_about_to_change);
        signals.layout_changed.disconnect(c.layout_changed);
    }
}

impl<S: ItemModel + 'static> ItemModel for FilterView<S> {
    fn row_count(&self, parent: &ModelIndex) -> usize {
        match self.source_parent(parent) {
            Some(source_parent) => self.with_mapping(&source_parent, RowMapping::len),
            None => 0,
        }
    }

    fn column_count(&self, parent: &ModelIndex) -> usize {
        match self.source_parent(parent) {
            Some(source_parent) => self.source.column_count(&source_parent),
            None => 0,
        }
    }

    fn data(&self, index: &ModelIndex, aspect: Aspect) -> CellValue {
        let source_index = self.map_to_source(index);
        if !source_index.is_valid() {
            return CellValue::None;
        }
        let substitute = self.overrides.read().get(&aspect).cloned();
        if let Some(value) = substitute {
            let source_parent = self.source.parent(&source_index);
            if !self.row_matches(source_index.row(), &source_parent) {
                return value;
            }
        }
        self.source.data(&source_index, aspect)
    }

    fn index(&self, row: usize, column: usize, parent: &ModelIndex) -> ModelIndex {
        let Some(source_parent) = self.source_parent(parent) else {
            return ModelIndex::invalid();
        };
        let Some(source_row) = self.with_mapping(&source_parent, |m| m.map_to_source(row)) else {
            return ModelIndex::invalid();
        };
        let source_index = self.source.index(source_row, column, &source_parent);
        if !source_index.is_valid() {
            return ModelIndex::invalid();
        }
        ModelIndex::new(row, column, parent.clone(), source_index.internal_id())
    }

    fn parent(&self, index: &ModelIndex) -> ModelIndex {
        let source_index = self.map_to_source(index);
        self.map_from_source(&self.source.parent(&source_index))
    }

    fn signals(&self) -> &ModelSignals {
        &self.signals
    }

    fn flags(&self, index: &ModelIndex) -> ItemFlags {
        let source_index = self.map_to_source(index);
        if !source_index.is_valid() {
            return ItemFlags::empty();
        }
        self.source.flags(&source_index)
    }

    fn header_data(&self, section: usize, orientation: Orientation, aspect: Aspect) -> CellValue {
        self.source.header_data(section, orientation, aspect)
    }
}

/// Builder for [`FilterView`].
pub struct FilterViewBuilder<S: ItemModel> {
    source: Arc<S>,
    state: FilterState<S>,
    overrides: HashMap<Aspect, CellValue>,
}

impl<S: ItemModel + 'static> FilterViewBuilder<S> {
    pub fn new(source: Arc<S>) -> Self {
        Self {
            source,
            state: FilterState::default(),
            overrides: HashMap::new(),
        }
    }

    /// Custom row predicate.
    pub fn filter<F>(mut self, f: F) -> Self
    where
        F: Fn(&S, usize, &ModelIndex) -> bool + Send + Sync + 'static,
    {
        self.state.predicate = Some(Arc::new(f));
        self
    }

    /// Predicate over the filter-aspect value of `column`.
    pub fn column_filter<F>(mut self, column: usize, f: F) -> Self
    where
        F: Fn(&CellValue) -> bool + Send + Sync + 'static,
    {
        self.state.columns.retain(|(c, _)| *c != column);
        self.state.columns.push((column, Arc::new(f)));
        self
    }

    /// Case-insensitive substring match on the text of `column`.
    pub fn text_contains(self, column: usize, needle: &str) -> Self {
        let needle = needle.to_lowercase();
        self.column_filter(column, move |value| {
            value
                .to_text()
                .is_some_and(|text| text.to_lowercase().contains(&needle))
        })
    }

    pub fn filter_aspect(mut self, aspect: Aspect) -> Self {
        self.state.aspect = aspect;
        self
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.state.recursive = recursive;
        self
    }

    pub fn override_value(mut self, aspect: Aspect, value: impl Into<CellValue>) -> Self {
        self.overrides.insert(aspect, value.into());
        self
    }

    pub fn build(self) -> Arc<FilterView<S>> {
        let Self {
            source,
            state,
            overrides,
        } = self;
        Arc::new_cyclic(|weak| FilterView::from_parts(source, state, overrides, weak))
    }
}

static_assertions::assert_impl_all!(FilterView<crate::model::ListModel>: Send, Sync);

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;

    use super::*;
    use crate::model::{Entity, ListModel, TreeEntity, TreeModel};

    fn names() -> Arc<ListModel> {
        Arc::new(ListModel::from_values(["Alice", "Bob", "Charlie", "Diana"]))
    }

    fn texts<M: ItemModel>(model: &M, parent: &ModelIndex) -> Vec<String> {
        (0..model.row_count(parent))
            .filter_map(|row| model.display_text(&model.index(row, 0, parent)))
            .collect()
    }

    /// Scene
    /// ├── Lights
    /// │   └── Key light
    /// ├── Props
    /// │   └── Box
    /// └── Xenon lamp
    fn scene() -> Arc<TreeModel> {
        let tree = Arc::new(TreeModel::with_header(["Name"]));
        tree.append(
            &ModelIndex::invalid(),
            TreeEntity::from_values(["Scene"])
                .with_child(TreeEntity::from_values(["Lights"]).with_child(Entity::from_values(["Key light"])))
                .with_child(TreeEntity::from_values(["Props"]).with_child(Entity::from_values(["Box"])))
                .with_child(Entity::from_values(["Xenon lamp"])),
        )
        .unwrap();
        tree
    }

    #[test]
    fn test_no_filter_shows_everything() {
        let view = FilterView::new(names());
        assert_eq!(texts(&*view, &ModelIndex::invalid()), vec!["Alice", "Bob", "Charlie", "Diana"]);
    }

    #[test]
    fn test_column_filter() {
        let view = FilterView::builder(names()).text_contains(0, "A").build();
        assert_eq!(texts(&*view, &ModelIndex::invalid()), vec!["Alice", "Charlie", "Diana"]);
        assert!(!view.row_visible(1, &ModelIndex::invalid()));
        assert!(view.row_visible(3, &ModelIndex::invalid()));
    }

    #[test]
    fn test_custom_predicate() {
        let view = FilterView::builder(names())
            .filter(|_, row, _| row % 2 == 1)
            .build();
        assert_eq!(texts(&*view, &ModelIndex::invalid()), vec!["Bob", "Diana"]);

        view.clear_filter();
        assert_eq!(view.row_count(&ModelIndex::invalid()), 4);
    }

    #[test]
    fn test_map_to_and_from_source() {
        let source = names();
        let view = FilterView::builder(source.clone()).text_contains(0, "i").build();
        let root = ModelIndex::invalid();

        let charlie = view.index(1, 0, &root);
        let source_charlie = view.map_to_source(&charlie);
        assert_eq!(source_charlie.row(), 2);
        assert_eq!(view.map_from_source(&source_charlie), charlie);

        let bob = source.index(1, 0, &root);
        assert!(!view.map_from_source(&bob).is_valid());
    }

    #[test]
    fn test_recursive_keeps_ancestors() {
        let view = FilterView::builder(scene())
            .text_contains(0, "light")
            .recursive(true)
            .build();

        let root = ModelIndex::invalid();
        assert_eq!(texts(&*view, &root), vec!["Scene"]);
        let scene_index = view.index(0, 0, &root);
        assert_eq!(texts(&*view, &scene_index), vec!["Lights"]);
        let lights = view.index(0, 0, &scene_index);
        assert_eq!(texts(&*view, &lights), vec!["Key light"]);
        assert_eq!(view.parent(&lights), scene_index);
    }

    #[test]
    fn test_non_recursive_hides_subtrees() {
        let view = FilterView::builder(scene()).text_contains(0, "light").build();
        assert_eq!(view.row_count(&ModelIndex::invalid()), 0);
    }

    #[test]
    fn test_overrides_apply_to_scaffolding_only() {
        let view = FilterView::builder(scene())
            .text_contains(0, "box")
            .recursive(true)
            .override_value(Aspect::Decoration, "dimmed")
            .build();

        let scene_index = view.index(0, 0, &ModelIndex::invalid());
        let props = view.index(0, 0, &scene_index);
        let boxed = view.index(0, 0, &props);

        assert_eq!(view.data(&props, Aspect::Decoration), CellValue::from("dimmed"));
        assert_eq!(view.display_text(&props).as_deref(), Some("Props"));
        assert_eq!(view.data(&boxed, Aspect::Decoration), CellValue::None);
        assert!(!view.set_data(&props, "x".into(), Aspect::Display));
    }

    #[test]
    fn test_rederives_on_source_change() {
        let source = names();
        let view = FilterView::builder(source.clone()).text_contains(0, "e").build();
        let layouts = Arc::new(Mutex::new(0));
        let counter = layouts.clone();
        view.signals().layout_changed.connect(move |_| *counter.lock() += 1);

        assert_eq!(view.row_count(&ModelIndex::invalid()), 2);
        source.push(Entity::from_values(["Eve"])).unwrap();
        assert_eq!(texts(&*view, &ModelIndex::invalid()), vec!["Alice", "Charlie", "Eve"]);

        let bob = source.index(1, 0, &ModelIndex::invalid());
        source.set_data(&bob, "Bea".into(), Aspect::Display);
        assert_eq!(view.row_count(&ModelIndex::invalid()), 4);
        assert!(*layouts.lock() >= 2);
    }

    #[test]
    fn test_chained_views() {
        let source = names();
        let outer_source = FilterView::builder(source.clone()).text_contains(0, "a").build();
        let view = FilterView::builder(outer_source.clone())
            .text_contains(0, "i")
            .build();

        assert_eq!(texts(&*view, &ModelIndex::invalid()), vec!["Alice", "Charlie", "Diana"]);
        source.push(Entity::from_values(["Mia"])).unwrap();
        assert_eq!(view.row_count(&ModelIndex::invalid()), 4);

        let mia = view.index(3, 0, &ModelIndex::invalid());
        let inner = view.map_to_source(&mia);
        assert_eq!(outer_source.map_to_source(&inner).row(), 4);
    }

    #[test]
    fn test_drop_disconnects_from_source() {
        let source = names();
        let view = FilterView::new(source.clone());
        assert_eq!(source.signals().rows_inserted.connection_count(), 1);
        drop(view);
        assert_eq!(source.signals().rows_inserted.connection_count(), 0);
    }
}
