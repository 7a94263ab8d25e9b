//! Arena-backed annotation tree implementing [`HedQueryable`].
//!
//! Annotations are written as comma separated tags with parentheses forming
//! groups, e.g. `Sensory-event, (Item, (Clear-throat)), Def/Def1/Value`.
//! Nodes live in a single `Vec` and refer to each other by [`NodeId`]; the
//! root is an implicit group at index 0 with no parent.
//!
//! Taxonomy knowledge comes from a [`Taxonomy`] supplied at parse time. It
//! maps short tag names to their long form (`Sensory-event` to
//! `Event/Sensory-event`) and performs no validation.

use hashbrown::HashMap;
use thiserror::Error;

use crate::traits::{HedQueryable, NodeId, TagMatch};

/// Errors raised while parsing annotation text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    /// A `(` was never closed.
    #[error("unclosed parenthesis at position {position}")]
    UnbalancedParenthesis {
        /// Byte offset of the `(`.
        position: usize,
    },

    /// A `)` without a matching `(`.
    #[error("unexpected closing parenthesis at position {position}")]
    UnexpectedCloseParenthesis {
        /// Byte offset of the `)`.
        position: usize,
    },

    /// An empty tag or group, such as `A,,B`, `()` or a trailing comma.
    #[error("empty element at position {position}")]
    EmptyElement {
        /// Byte offset where the element was expected to end.
        position: usize,
    },

    /// Two elements not separated by a comma, such as `(A) B`.
    #[error("missing comma at position {position}")]
    MissingComma {
        /// Byte offset of the second element.
        position: usize,
    },
}

// =============================================================================
// Taxonomy
// =============================================================================

/// Short tag name to long form lookup.
///
/// # Example
///
/// ```rust
/// use hed_query_executor::Taxonomy;
///
/// let taxonomy = Taxonomy::from_paths(["Event/Sensory-event"]);
/// assert_eq!(taxonomy.long_form("Sensory-event"), Some("event/sensory-event"));
/// assert_eq!(taxonomy.long_form("event"), Some("event"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Taxonomy {
    long_forms: HashMap<String, String>,
}

impl Taxonomy {
    /// Creates an empty taxonomy. Every tag is then only itself.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a taxonomy from long-form paths.
    pub fn from_paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut taxonomy = Self::new();
        for path in paths {
            taxonomy.add_path(path.as_ref());
        }
        taxonomy
    }

    /// Registers every component of a long-form path.
    pub fn add_path(&mut self, path: &str) {
        let path = path.trim().trim_matches('/').to_lowercase();
        let mut long_form = String::with_capacity(path.len());
        for component in path.split('/') {
            if !long_form.is_empty() {
                long_form.push('/');
            }
            long_form.push_str(component);
            self.long_forms
                .entry(component.to_string())
                .or_insert_with(|| long_form.clone());
        }
    }

    /// Returns the lowercased long form of a short tag name.
    pub fn long_form(&self, short_name: &str) -> Option<&str> {
        self.long_forms
            .get(&short_name.to_lowercase())
            .map(String::as_str)
    }

    /// Number of known tag names.
    pub fn len(&self) -> usize {
        self.long_forms.len()
    }

    /// Returns true if no tag names are known.
    pub fn is_empty(&self) -> bool {
        self.long_forms.is_empty()
    }

    /// Full lowercased path of a tag and how many of its leading components
    /// are taxonomy terms.
    ///
    /// The terms are the long form of the deepest known leading path
    /// component, or the first component itself when unknown. The remaining
    /// components of the tag text (value extensions such as `Def1/Value` in
    /// `Def/Def1/Value`) follow the terms but are not terms.
    fn tag_path(&self, tag_text: &str) -> (Vec<String>, usize) {
        let lower = tag_text.to_lowercase();
        let components: Vec<&str> = lower.split('/').collect();

        let Some(mut base) = self.long_forms.get(components[0]) else {
            return (components.iter().map(|c| c.to_string()).collect(), 1);
        };
        let mut consumed = 1;
        for component in &components[1..] {
            match self.long_forms.get(*component) {
                Some(long_form) => {
                    base = long_form;
                    consumed += 1;
                }
                None => break,
            }
        }

        let mut path: Vec<String> = base.split('/').map(str::to_string).collect();
        let term_count = path.len();
        path.extend(components[consumed..].iter().map(|c| c.to_string()));
        (path, term_count)
    }
}

// =============================================================================
// Tree
// =============================================================================

#[derive(Debug, Clone)]
struct TagNode {
    text: String,
    lower: String,
    path: Vec<String>,
    term_count: usize,
}

impl TagNode {
    fn terms(&self) -> &[String] {
        &self.path[..self.term_count]
    }

    /// True if the `/` separated components of `term` appear consecutively
    /// in the tag's full path.
    fn has_path(&self, term: &[&str]) -> bool {
        self.path
            .windows(term.len())
            .any(|window| window.iter().zip(term).all(|(a, b)| a == b))
    }
}

#[derive(Debug, Clone)]
enum NodeKind {
    Tag(TagNode),
    Group(Vec<NodeId>),
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    kind: NodeKind,
}

/// A parsed annotation.
///
/// # Example
///
/// ```rust
/// use hed_query_executor::{AnnotationTree, HedQueryable, Taxonomy};
///
/// let tree = AnnotationTree::parse("A, (B, C)", &Taxonomy::new()).unwrap();
/// assert_eq!(tree.all_groups(tree.root()).len(), 2);
/// assert_eq!(tree.to_string(), "A, (B, C)");
/// ```
#[derive(Debug, Clone)]
pub struct AnnotationTree {
    nodes: Vec<Node>,
}

impl AnnotationTree {
    /// Parses annotation text.
    ///
    /// Node ids are assigned in document order, starting with the root at 0.
    pub fn parse(text: &str, taxonomy: &Taxonomy) -> Result<Self, TreeError> {
        TreeBuilder::new(taxonomy).build(text)
    }

    /// The implicit top-level group.
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Number of tags and groups, the root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the annotation has no tags or groups.
    pub fn is_empty(&self) -> bool {
        self.children(self.root()).is_empty()
    }

    /// Text of a tag as written, or `None` for groups and unknown ids.
    pub fn tag_text(&self, node: NodeId) -> Option<&str> {
        match &self.nodes.get(node.0)?.kind {
            NodeKind::Tag(tag) => Some(tag.text.as_str()),
            NodeKind::Group(_) => None,
        }
    }

    /// Taxonomy terms of a tag, or `None` for groups and unknown ids.
    pub fn tag_terms(&self, node: NodeId) -> Option<&[String]> {
        match &self.nodes.get(node.0)?.kind {
            NodeKind::Tag(tag) => Some(tag.terms()),
            NodeKind::Group(_) => None,
        }
    }

    fn find_tags<F>(&self, root: NodeId, predicate: F) -> Vec<TagMatch>
    where
        F: Fn(&TagNode) -> bool,
    {
        let mut found = Vec::new();
        for group in self.all_groups(root) {
            for &child in self.children(group) {
                if let Some(NodeKind::Tag(tag)) = self.nodes.get(child.0).map(|n| &n.kind) {
                    if predicate(tag) {
                        found.push(TagMatch::new(child, group));
                    }
                }
            }
        }
        found
    }

    fn push(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent: Some(parent),
            kind,
        });
        if let Some(Node {
            kind: NodeKind::Group(children),
            ..
        }) = self.nodes.get_mut(parent.0)
        {
            children.push(id);
        }
        id
    }
}

impl HedQueryable for AnnotationTree {
    fn is_group(&self, node: NodeId) -> bool {
        matches!(
            self.nodes.get(node.0).map(|n| &n.kind),
            Some(NodeKind::Group(_))
        )
    }

    fn children(&self, node: NodeId) -> &[NodeId] {
        match self.nodes.get(node.0).map(|n| &n.kind) {
            Some(NodeKind::Group(children)) => children.as_slice(),
            _ => &[],
        }
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node.0)?.parent
    }

    fn render(&self, node: NodeId) -> String {
        match self.nodes.get(node.0).map(|n| &n.kind) {
            Some(NodeKind::Tag(tag)) => tag.text.clone(),
            Some(NodeKind::Group(children)) => {
                let inner = children
                    .iter()
                    .map(|&child| self.render(child))
                    .collect::<Vec<_>>()
                    .join(", ");
                if self.parent(node).is_some() {
                    format!("({})", inner)
                } else {
                    inner
                }
            }
            None => String::new(),
        }
    }

    fn find_tags_with_term(&self, root: NodeId, term: &str) -> Vec<TagMatch> {
        let term = term.to_lowercase();
        if term.contains('/') {
            let components: Vec<&str> = term.split('/').collect();
            return self.find_tags(root, |tag| tag.has_path(&components));
        }
        self.find_tags(root, |tag| tag.terms().iter().any(|t| *t == term))
    }

    fn find_exact_tags(&self, root: NodeId, text: &str) -> Vec<TagMatch> {
        let text = text.to_lowercase();
        self.find_tags(root, |tag| tag.lower == text)
    }

    fn find_wildcard_tags(&self, root: NodeId, prefix: &str) -> Vec<TagMatch> {
        let prefix = prefix.to_lowercase();
        self.find_tags(root, |tag| tag.lower.starts_with(&prefix))
    }
}

impl std::fmt::Display for AnnotationTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render(self.root()))
    }
}

/// Single-pass annotation parser state.
struct TreeBuilder<'a> {
    taxonomy: &'a Taxonomy,
    tree: AnnotationTree,
    /// Open groups with the position of their `(`; the root is first.
    open: Vec<(NodeId, usize)>,
    pending: String,
    /// A group was just closed and still needs a separator.
    closed_group: bool,
    saw_separator: bool,
}

impl<'a> TreeBuilder<'a> {
    fn new(taxonomy: &'a Taxonomy) -> Self {
        Self {
            taxonomy,
            tree: AnnotationTree {
                nodes: vec![Node {
                    parent: None,
                    kind: NodeKind::Group(Vec::new()),
                }],
            },
            open: vec![(NodeId(0), 0)],
            pending: String::new(),
            closed_group: false,
            saw_separator: false,
        }
    }

    fn current_group(&self) -> NodeId {
        self.open.last().map_or(NodeId(0), |(id, _)| *id)
    }

    fn build(mut self, text: &str) -> Result<AnnotationTree, TreeError> {
        for (position, ch) in text.char_indices() {
            match ch {
                '(' => {
                    if self.closed_group || !self.pending.trim().is_empty() {
                        return Err(TreeError::MissingComma { position });
                    }
                    let group = self
                        .tree
                        .push(self.current_group(), NodeKind::Group(Vec::new()));
                    self.open.push((group, position));
                }
                ')' => {
                    self.finish_element(position)?;
                    if self.open.len() == 1 {
                        return Err(TreeError::UnexpectedCloseParenthesis { position });
                    }
                    self.open.pop();
                    self.closed_group = true;
                }
                ',' => {
                    self.finish_element(position)?;
                    self.saw_separator = true;
                }
                _ if ch.is_whitespace() && self.pending.is_empty() => {}
                _ => {
                    if self.closed_group {
                        return Err(TreeError::MissingComma { position });
                    }
                    self.pending.push(ch);
                }
            }
        }

        if let Some(&(_, position)) = self.open.get(1..).and_then(|rest| rest.last()) {
            return Err(TreeError::UnbalancedParenthesis { position });
        }

        let blank = self.pending.trim().is_empty() && !self.closed_group;
        if blank && !self.saw_separator && self.tree.is_empty() {
            return Ok(self.tree);
        }
        self.finish_element(text.len())?;
        Ok(self.tree)
    }

    fn finish_element(&mut self, position: usize) -> Result<(), TreeError> {
        let text = self.pending.trim();
        if !text.is_empty() {
            let (path, term_count) = self.taxonomy.tag_path(text);
            let tag = TagNode {
                text: text.to_string(),
                lower: text.to_lowercase(),
                path,
                term_count,
            };
            self.tree.push(self.current_group(), NodeKind::Tag(tag));
            self.pending.clear();
            return Ok(());
        }
        if self.closed_group {
            self.closed_group = false;
            return Ok(());
        }
        Err(TreeError::EmptyElement { position })
    }
}
