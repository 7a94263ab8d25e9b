//! Traits for query evaluation.
//!
//! This module defines the [`HedQueryable`] trait that must be implemented
//! by any annotation tree that wants to be searched.
//!
//! # Architecture Note
//!
//! The evaluator never builds or changes a tree. It only walks groups,
//! follows parent links and asks the tree to look tags up. Taxonomy
//! knowledge (which tag is a descendant of which term) stays with the tree.
//!
//! # Example: Implementing HedQueryable
//!
//! ```ignore
//! use hed_query_executor::{HedQueryable, NodeId, TagMatch};
//!
//! impl HedQueryable for MyHedString {
//!     fn is_group(&self, node: NodeId) -> bool {
//!         self.node(node).is_group()
//!     }
//!
//!     fn children(&self, node: NodeId) -> &[NodeId] {
//!         self.node(node).children()
//!     }
//!
//!     fn parent(&self, node: NodeId) -> Option<NodeId> {
//!         self.node(node).parent()
//!     }
//!
//!     fn render(&self, node: NodeId) -> String {
//!         self.to_text(node)
//!     }
//!
//!     fn find_tags_with_term(&self, root: NodeId, term: &str) -> Vec<TagMatch> {
//!         self.schema_lookup(root, term)
//!     }
//!
//!     fn find_exact_tags(&self, root: NodeId, text: &str) -> Vec<TagMatch> {
//!         self.text_lookup(root, text)
//!     }
//!
//!     fn find_wildcard_tags(&self, root: NodeId, prefix: &str) -> Vec<TagMatch> {
//!         self.prefix_lookup(root, prefix)
//!     }
//! }
//! ```

/// Identity of a tag or group inside an annotation tree.
///
/// Two matches are the same only when they refer to the same node; two
/// textually identical tags at different positions have different ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeId(pub usize);

impl NodeId {
    /// Returns the raw index.
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A tag found by a lookup, together with the group directly holding it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TagMatch {
    /// The matching tag.
    pub tag: NodeId,
    /// The group whose direct child the tag is.
    pub group: NodeId,
}

impl TagMatch {
    /// Creates a tag match.
    pub fn new(tag: NodeId, group: NodeId) -> Self {
        Self { tag, group }
    }
}

/// Trait for annotation trees that can be searched with compiled queries.
///
/// Implementations must not change while a search is running. All lookups
/// are recursive from `root` and report the tag with its immediate group.
///
/// # Required Methods
///
/// - [`is_group`](Self::is_group), [`children`](Self::children),
///   [`parent`](Self::parent) - tree shape
/// - [`render`](Self::render) - canonical text, used to order merged results
/// - [`find_tags_with_term`](Self::find_tags_with_term),
///   [`find_exact_tags`](Self::find_exact_tags),
///   [`find_wildcard_tags`](Self::find_wildcard_tags) - tag lookups
///
/// # Optional Methods (with defaults)
///
/// [`all_groups`](Self::all_groups), [`tags`](Self::tags) and
/// [`groups`](Self::groups) are derived from the tree shape.
pub trait HedQueryable: Send + Sync {
    /// Returns true for groups, false for tags.
    fn is_group(&self, node: NodeId) -> bool;

    /// Direct children of a group in order. Empty for tags.
    fn children(&self, node: NodeId) -> &[NodeId];

    /// The group holding this node, or `None` at the root.
    fn parent(&self, node: NodeId) -> Option<NodeId>;

    /// Canonical text of a node.
    fn render(&self, node: NodeId) -> String;

    /// Tags equal to `term` or below it in the taxonomy.
    fn find_tags_with_term(&self, root: NodeId, term: &str) -> Vec<TagMatch>;

    /// Tags whose text is exactly `text`.
    fn find_exact_tags(&self, root: NodeId, text: &str) -> Vec<TagMatch>;

    /// Tags whose text starts with `prefix`.
    fn find_wildcard_tags(&self, root: NodeId, prefix: &str) -> Vec<TagMatch>;

    /// Every group under and including `root`, each exactly once.
    ///
    /// The default walks the tree in pre-order.
    fn all_groups(&self, root: NodeId) -> Vec<NodeId> {
        let mut groups = Vec::new();
        let mut stack = vec![root];
        while let Some(group) = stack.pop() {
            if !self.is_group(group) {
                continue;
            }
            groups.push(group);
            // Reverse so the leftmost child group is visited first
            for &child in self.children(group).iter().rev() {
                if self.is_group(child) {
                    stack.push(child);
                }
            }
        }
        groups
    }

    /// Direct children that are tags.
    fn tags(&self, group: NodeId) -> Vec<NodeId> {
        self.children(group)
            .iter()
            .copied()
            .filter(|&child| !self.is_group(child))
            .collect()
    }

    /// Direct children that are groups.
    fn groups(&self, group: NodeId) -> Vec<NodeId> {
        self.children(group)
            .iter()
            .copied()
            .filter(|&child| self.is_group(child))
            .collect()
    }
}
