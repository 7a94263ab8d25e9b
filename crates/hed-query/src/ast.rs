//! Expression tree types for compiled search queries.

// =============================================================================
// Term descriptors
// =============================================================================

/// How a term is looked up in an annotation tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TermMatch {
    /// The tag is the term or a taxonomic descendant of it.
    Taxonomy,
    /// The tag text is exactly the term.
    Exact,
    /// The tag text starts with the term.
    Prefix,
}

/// Immutable description of a term operand, derived once from its token.
///
/// Derivation order: a leading `@` is stripped, then a surrounding pair of
/// double quotes (only when the text is longer than two characters), then
/// every `*`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TermDescriptor {
    /// Token text as written in the query.
    pub source: String,
    /// Text left after the modifiers were stripped.
    pub core_text: String,
    /// Quoted term: match by text only, never by taxonomy.
    pub suppresses_descendant_match: bool,
    /// Term contained `*`: match tags by prefix.
    pub requires_wildcard_prefix_match: bool,
    /// Term started with `@`: satisfied only when nothing in the tree matches.
    pub must_not_appear_in_tree: bool,
}

impl TermDescriptor {
    /// Derives a descriptor from a term token's text.
    ///
    /// # Example
    ///
    /// ```rust
    /// use hed_query::{TermDescriptor, TermMatch};
    ///
    /// let term = TermDescriptor::from_token_text("@\"event\"");
    /// assert_eq!(term.core_text, "event");
    /// assert!(term.must_not_appear_in_tree);
    /// assert_eq!(term.match_mode(), TermMatch::Exact);
    /// ```
    pub fn from_token_text(text: &str) -> Self {
        let mut core = text;

        let must_not_appear_in_tree = core.starts_with('@');
        if must_not_appear_in_tree {
            core = &core[1..];
        }

        let suppresses_descendant_match =
            core.len() > 2 && core.starts_with('"') && core.ends_with('"');
        if suppresses_descendant_match {
            core = &core[1..core.len() - 1];
        }

        let requires_wildcard_prefix_match = core.contains('*');
        let core_text = core.replace('*', "");

        Self {
            source: text.to_string(),
            core_text,
            suppresses_descendant_match,
            requires_wildcard_prefix_match,
            must_not_appear_in_tree,
        }
    }

    /// Lookup mode for this term.
    ///
    /// Prefix matching wins over exact matching. Everything else, tag paths
    /// such as `def/def1` included, goes to the taxonomy lookup.
    pub fn match_mode(&self) -> TermMatch {
        if self.requires_wildcard_prefix_match {
            TermMatch::Prefix
        } else if self.suppresses_descendant_match {
            TermMatch::Exact
        } else {
            TermMatch::Taxonomy
        }
    }
}

impl std::fmt::Display for TermDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}

// =============================================================================
// Group operators
// =============================================================================

/// Which children a wildcard stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum WildcardKind {
    /// `?` - any tag or group.
    AnyTagOrGroup,
    /// `??` - any tag.
    AnyTag,
    /// `???` - any group.
    AnyGroup,
}

impl WildcardKind {
    /// Maps a wildcard token to its kind.
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "?" => Some(WildcardKind::AnyTagOrGroup),
            "??" => Some(WildcardKind::AnyTag),
            "???" => Some(WildcardKind::AnyGroup),
            _ => None,
        }
    }

    /// The query syntax for this wildcard.
    pub fn symbol(&self) -> &'static str {
        match self {
            WildcardKind::AnyTagOrGroup => "?",
            WildcardKind::AnyTag => "??",
            WildcardKind::AnyGroup => "???",
        }
    }
}

impl std::fmt::Display for WildcardKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Whether an exact match group must account for all of a group's children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CoveragePolicy {
    /// `{required}` - presence only, other children are ignored.
    Any,
    /// `{required:optional}` - no children beyond required and optional.
    None,
}

// =============================================================================
// Expression tree
// =============================================================================

/// A compiled search query.
///
/// Built once by [`parse`](crate::parse) and never modified afterwards; a
/// single tree may be evaluated against many annotations concurrently.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum QueryExpression {
    /// A term operand.
    /// Example: `Event`, `"Event"`, `Def/Def1*`, `@Agent`
    Term(TermDescriptor),

    /// Both operands in the same group, without sharing a child.
    /// Syntax: `a && b`, `a, b`, `a and b`
    And(Box<QueryExpression>, Box<QueryExpression>),

    /// Either operand.
    /// Syntax: `a || b`, `a or b`
    Or(Box<QueryExpression>, Box<QueryExpression>),

    /// Every group not matched by the operand.
    /// Syntax: `~a`
    Not(Box<QueryExpression>),

    /// Operand matched strictly below the reported group.
    /// Syntax: `[a && b]`
    DescendantGroup(Box<QueryExpression>),

    /// Operand matched by the direct children of a single group.
    /// Syntax: `{a}`, `{a:}`, `{a:b}`
    ExactMatchGroup {
        /// Clause that must match.
        required: Box<QueryExpression>,
        /// Clause allowed to account for the remaining children.
        optional: Option<Box<QueryExpression>>,
        /// Coverage requirement.
        coverage: CoveragePolicy,
    },

    /// Any direct child of a group.
    /// Syntax: `?`, `??`, `???`
    Wildcard(WildcardKind),
}

impl QueryExpression {
    /// Creates a term expression from raw term text.
    pub fn term(text: &str) -> Self {
        QueryExpression::Term(TermDescriptor::from_token_text(text))
    }

    /// Creates an AND expression.
    pub fn and(left: QueryExpression, right: QueryExpression) -> Self {
        QueryExpression::And(Box::new(left), Box::new(right))
    }

    /// Creates an OR expression.
    pub fn or(left: QueryExpression, right: QueryExpression) -> Self {
        QueryExpression::Or(Box::new(left), Box::new(right))
    }

    /// Creates a negation.
    pub fn not(inner: QueryExpression) -> Self {
        QueryExpression::Not(Box::new(inner))
    }

    /// Creates a descendant group.
    pub fn descendant_group(inner: QueryExpression) -> Self {
        QueryExpression::DescendantGroup(Box::new(inner))
    }

    /// Creates an exact match group.
    pub fn exact_match(
        required: QueryExpression,
        optional: Option<QueryExpression>,
        coverage: CoveragePolicy,
    ) -> Self {
        QueryExpression::ExactMatchGroup {
            required: Box::new(required),
            optional: optional.map(Box::new),
            coverage,
        }
    }

    /// Returns true if a wildcard appears anywhere in this expression.
    pub fn contains_wildcard(&self) -> bool {
        match self {
            QueryExpression::Wildcard(_) => true,
            QueryExpression::Term(_) => false,
            QueryExpression::And(left, right) | QueryExpression::Or(left, right) => {
                left.contains_wildcard() || right.contains_wildcard()
            }
            QueryExpression::Not(inner) | QueryExpression::DescendantGroup(inner) => {
                inner.contains_wildcard()
            }
            QueryExpression::ExactMatchGroup {
                required, optional, ..
            } => {
                required.contains_wildcard()
                    || optional.as_ref().is_some_and(|o| o.contains_wildcard())
            }
        }
    }

    /// Returns true if a negation appears anywhere in this expression.
    pub fn contains_negation(&self) -> bool {
        match self {
            QueryExpression::Not(_) => true,
            QueryExpression::Term(_) | QueryExpression::Wildcard(_) => false,
            QueryExpression::And(left, right) | QueryExpression::Or(left, right) => {
                left.contains_negation() || right.contains_negation()
            }
            QueryExpression::DescendantGroup(inner) => inner.contains_negation(),
            QueryExpression::ExactMatchGroup {
                required, optional, ..
            } => {
                required.contains_negation()
                    || optional.as_ref().is_some_and(|o| o.contains_negation())
            }
        }
    }

    /// Iterates over every term in the expression, left to right.
    pub fn terms(&self) -> Vec<&TermDescriptor> {
        let mut terms = Vec::new();
        self.collect_terms(&mut terms);
        terms
    }

    fn collect_terms<'a>(&'a self, terms: &mut Vec<&'a TermDescriptor>) {
        match self {
            QueryExpression::Term(term) => terms.push(term),
            QueryExpression::Wildcard(_) => {}
            QueryExpression::And(left, right) | QueryExpression::Or(left, right) => {
                left.collect_terms(terms);
                right.collect_terms(terms);
            }
            QueryExpression::Not(inner) | QueryExpression::DescendantGroup(inner) => {
                inner.collect_terms(terms)
            }
            QueryExpression::ExactMatchGroup {
                required, optional, ..
            } => {
                required.collect_terms(terms);
                if let Some(optional) = optional {
                    optional.collect_terms(terms);
                }
            }
        }
    }
}

impl std::fmt::Display for QueryExpression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryExpression::Term(term) => write!(f, "{}", term),
            QueryExpression::And(left, right) => write!(f, "({} && {})", left, right),
            QueryExpression::Or(left, right) => write!(f, "({} || {})", left, right),
            QueryExpression::Not(inner) => write!(f, "~{}", inner),
            QueryExpression::DescendantGroup(inner) => write!(f, "[{}]", inner),
            QueryExpression::ExactMatchGroup {
                required,
                optional,
                coverage,
            } => match (coverage, optional) {
                (CoveragePolicy::Any, _) => write!(f, "{{{}}}", required),
                (CoveragePolicy::None, None) => write!(f, "{{{}:}}", required),
                (CoveragePolicy::None, Some(optional)) => {
                    write!(f, "{{{}:{}}}", required, optional)
                }
            },
            QueryExpression::Wildcard(kind) => write!(f, "{}", kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod term_descriptor {
        use super::*;

        #[test]
        fn test_plain_term() {
            let term = TermDescriptor::from_token_text("event");
            assert_eq!(term.core_text, "event");
            assert!(!term.suppresses_descendant_match);
            assert!(!term.requires_wildcard_prefix_match);
            assert!(!term.must_not_appear_in_tree);
            assert_eq!(term.match_mode(), TermMatch::Taxonomy);
        }

        #[test]
        fn test_quoted_term() {
            let term = TermDescriptor::from_token_text("\"event\"");
            assert_eq!(term.core_text, "event");
            assert!(term.suppresses_descendant_match);
            assert_eq!(term.match_mode(), TermMatch::Exact);
        }

        #[test]
        fn test_empty_quotes_are_kept() {
            let term = TermDescriptor::from_token_text("\"\"");
            assert_eq!(term.core_text, "\"\"");
            assert!(!term.suppresses_descendant_match);
        }

        #[test]
        fn test_wildcard_suffix() {
            let term = TermDescriptor::from_token_text("def/def1*");
            assert_eq!(term.core_text, "def/def1");
            assert!(term.requires_wildcard_prefix_match);
            assert_eq!(term.match_mode(), TermMatch::Prefix);
        }

        #[test]
        fn test_path_uses_taxonomy_lookup() {
            let term = TermDescriptor::from_token_text("event/sensory-event");
            assert_eq!(term.match_mode(), TermMatch::Taxonomy);
            let quoted = TermDescriptor::from_token_text("\"def/def1\"");
            assert_eq!(quoted.match_mode(), TermMatch::Exact);
        }

        #[test]
        fn test_modifiers_stack_in_order() {
            let term = TermDescriptor::from_token_text("@\"agent*\"");
            assert!(term.must_not_appear_in_tree);
            assert!(term.suppresses_descendant_match);
            assert!(term.requires_wildcard_prefix_match);
            assert_eq!(term.core_text, "agent");
            assert_eq!(term.source, "@\"agent*\"");
        }
    }

    mod display {
        use super::*;

        #[test]
        fn test_display_compound() {
            let expr = QueryExpression::and(
                QueryExpression::term("a"),
                QueryExpression::not(QueryExpression::term("b")),
            );
            assert_eq!(expr.to_string(), "(a && ~b)");
        }

        #[test]
        fn test_display_groups() {
            let exact = QueryExpression::exact_match(
                QueryExpression::term("a"),
                Some(QueryExpression::Wildcard(WildcardKind::AnyTag)),
                CoveragePolicy::None,
            );
            assert_eq!(exact.to_string(), "{a:??}");

            let empty_optional =
                QueryExpression::exact_match(QueryExpression::term("a"), None, CoveragePolicy::None);
            assert_eq!(empty_optional.to_string(), "{a:}");

            let any = QueryExpression::exact_match(QueryExpression::term("a"), None, CoveragePolicy::Any);
            assert_eq!(any.to_string(), "{a}");

            let descendant = QueryExpression::descendant_group(QueryExpression::or(
                QueryExpression::term("a"),
                QueryExpression::term("b"),
            ));
            assert_eq!(descendant.to_string(), "[(a || b)]");
        }
    }

    mod inspection {
        use super::*;

        #[test]
        fn test_contains_wildcard() {
            let expr = QueryExpression::descendant_group(QueryExpression::and(
                QueryExpression::term("a"),
                QueryExpression::Wildcard(WildcardKind::AnyGroup),
            ));
            assert!(expr.contains_wildcard());
            assert!(!QueryExpression::term("a").contains_wildcard());
        }

        #[test]
        fn test_contains_negation_in_optional() {
            let expr = QueryExpression::exact_match(
                QueryExpression::term("a"),
                Some(QueryExpression::not(QueryExpression::term("b"))),
                CoveragePolicy::None,
            );
            assert!(expr.contains_negation());
        }

        #[test]
        fn test_terms_in_order() {
            let expr = QueryExpression::or(
                QueryExpression::term("a"),
                QueryExpression::and(QueryExpression::term("b"), QueryExpression::term("c")),
            );
            let texts: Vec<&str> = expr.terms().iter().map(|t| t.core_text.as_str()).collect();
            assert_eq!(texts, vec!["a", "b", "c"]);
        }
    }
}
