//! Logging and debugging facilities for Trellis.
//!
//! This module provides:
//! - Target and span names for filtering `tracing` output by subsystem
//! - Debug visualization for entity trees
//!
//! # Tracing Integration
//!
//! Trellis uses the `tracing` crate for instrumentation and never installs a
//! subscriber itself. To see logs, install one in your application:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("trellis::command=debug,trellis::model=trace")
//!     .init();
//! ```
//!
//! # Debug Visualization
//!
//! Anything that implements [`DebugTree`] can be rendered with
//! [`TreeDebug`]:
//!
//! ```ignore
//! use trellis_core::logging::{TreeDebug, TreeFormatOptions};
//!
//! let debug = TreeDebug::with_options(TreeFormatOptions::minimal());
//! println!("{}", debug.format(&model));
//! ```

/// Span names used throughout Trellis for tracing.
pub mod span_names {
    /// Command execution span.
    pub const COMMAND: &str = "trellis::command";
}

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Signal/slot system target.
    pub const SIGNAL: &str = "trellis_core::signal";
    /// Mediators, entities and the entity arena.
    pub const MODEL: &str = "trellis::model";
    /// Commands, the executor and the undo log.
    pub const COMMAND: &str = "trellis::command";
    /// Filter views.
    pub const FILTER: &str = "trellis::filter";
}

/// Style options for tree visualization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TreeStyle {
    /// ASCII characters for tree branches.
    Ascii,
    /// Unicode box-drawing characters.
    #[default]
    Unicode,
    /// Compact single-line representation.
    Compact,
}

/// Configuration for tree debug output.
#[derive(Debug, Clone)]
pub struct TreeFormatOptions {
    /// The style of tree visualization.
    pub style: TreeStyle,
    /// Whether to show node ids.
    pub show_ids: bool,
    /// Whether to show node kind tags.
    pub show_kinds: bool,
    /// Maximum depth to traverse (None for unlimited).
    pub max_depth: Option<usize>,
    /// Indent size for each level.
    pub indent_size: usize,
}

impl Default for TreeFormatOptions {
    fn default() -> Self {
        Self {
            style: TreeStyle::default(),
            show_ids: true,
            show_kinds: true,
            max_depth: None,
            indent_size: 2,
        }
    }
}

impl TreeFormatOptions {
    /// Everything, including ids and kinds.
    pub fn detailed() -> Self {
        Self::default()
    }

    /// Labels only.
    pub fn minimal() -> Self {
        Self {
            show_ids: false,
            show_kinds: false,
            ..Default::default()
        }
    }
}

/// A tree that [`TreeDebug`] knows how to walk.
pub trait DebugTree {
    /// Cheap node handle.
    type Node: Copy;

    /// Header line printed above the tree.
    fn title(&self) -> String;
    /// Top-level nodes, in order.
    fn roots(&self) -> Vec<Self::Node>;
    /// Children of `node`, in order.
    fn children(&self, node: Self::Node) -> Vec<Self::Node>;
    /// Human-readable label of `node`. Empty labels print as `(unnamed)`.
    fn label(&self, node: Self::Node) -> String;
    /// Identifier printed when [`TreeFormatOptions::show_ids`] is set.
    fn id(&self, node: Self::Node) -> String;
    /// Kind tag printed when [`TreeFormatOptions::show_kinds`] is set.
    fn kind(&self, node: Self::Node) -> Option<String>;
}

/// Debug utility for visualizing trees.
#[derive(Debug, Clone, Default)]
pub struct TreeDebug {
    options: TreeFormatOptions,
}

impl TreeDebug {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: TreeFormatOptions) -> Self {
        Self { options }
    }

    /// Format the whole tree.
    pub fn format<T: DebugTree>(&self, tree: &T) -> String {
        let mut output = tree.title();
        output.push('\n');

        let roots = tree.roots();
        if roots.is_empty() {
            output.push_str("  (empty)\n");
            return output;
        }
        let count = roots.len();
        for (i, root) in roots.into_iter().enumerate() {
            self.format_subtree_into(tree, root, 1, i + 1 == count, &mut output);
        }
        output
    }

    fn format_subtree_into<T: DebugTree>(
        &self,
        tree: &T,
        node: T::Node,
        depth: usize,
        is_last: bool,
        output: &mut String,
    ) {
        if let Some(max) = self.options.max_depth {
            if depth > max {
                return;
            }
        }

        output.push_str(&self.build_prefix(depth, is_last));

        let label = tree.label(node);
        output.push_str(if label.is_empty() { "(unnamed)" } else { &label });

        if self.options.show_ids {
            output.push_str(&format!(" [{}]", tree.id(node)));
        }
        if self.options.show_kinds {
            if let Some(kind) = tree.kind(node) {
                output.push_str(&format!(" ({kind})"));
            }
        }
        output.push('\n');

        let children = tree.children(node);
        let count = children.len();
        for (i, child) in children.into_iter().enumerate() {
            self.format_subtree_into(tree, child, depth + 1, i + 1 == count, output);
        }
    }

    fn build_prefix(&self, depth: usize, is_last: bool) -> String {
        if depth == 0 {
            return String::new();
        }

        let (branch, tee, corner) = match self.options.style {
            TreeStyle::Ascii => ("|", "+-- ", "`-- "),
            TreeStyle::Unicode => ("\u{2502}", "\u{251c}\u{2500}\u{2500} ", "\u{2514}\u{2500}\u{2500} "),
            TreeStyle::Compact => ("", "- ", "- "),
        };

        let mut prefix = String::new();
        for _ in 0..(depth - 1) {
            prefix.push_str(branch);
            prefix.push_str(&" ".repeat(self.options.indent_size));
        }
        prefix.push_str(if is_last { corner } else { tee });
        prefix
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// (label, children) stored flat; node handles are indices.
    struct Fixture {
        nodes: Vec<(&'static str, Vec<usize>)>,
        roots: Vec<usize>,
    }

    impl DebugTree for Fixture {
        type Node = usize;

        fn title(&self) -> String {
            format!("Fixture ({} nodes):", self.nodes.len())
        }
        fn roots(&self) -> Vec<usize> {
            self.roots.clone()
        }
        fn children(&self, node: usize) -> Vec<usize> {
            self.nodes[node].1.clone()
        }
        fn label(&self, node: usize) -> String {
            self.nodes[node].0.to_string()
        }
        fn id(&self, node: usize) -> String {
            node.to_string()
        }
        fn kind(&self, _node: usize) -> Option<String> {
            Some("node".into())
        }
    }

    fn fixture() -> Fixture {
        Fixture {
            nodes: vec![("scene", vec![1, 2]), ("camera", vec![]), ("", vec![])],
            roots: vec![0],
        }
    }

    #[test]
    fn test_tree_format_empty() {
        let tree = Fixture {
            nodes: vec![],
            roots: vec![],
        };
        let output = TreeDebug::new().format(&tree);
        assert!(output.contains("(empty)"));
    }

    #[test]
    fn test_tree_format_hierarchy() {
        let output = TreeDebug::new().format(&fixture());
        assert!(output.contains("scene [0] (node)"));
        assert!(output.contains("camera"));
        assert!(output.contains("(unnamed)"));
    }

    #[test]
    fn test_tree_format_minimal() {
        let debug = TreeDebug::with_options(TreeFormatOptions::minimal());
        let output = debug.format(&fixture());
        assert!(output.contains("scene"));
        assert!(!output.contains("(node)"));
        assert!(!output.contains("["));
    }

    #[test]
    fn test_tree_format_max_depth() {
        let debug = TreeDebug::with_options(TreeFormatOptions {
            max_depth: Some(1),
            style: TreeStyle::Ascii,
            ..Default::default()
        });
        let output = debug.format(&fixture());
        assert!(output.contains("scene"));
        assert!(!output.contains("camera"));
    }
}
