//! Expression tree evaluation.
//!
//! Every node evaluates to a list of [`SearchResult`]s. Outside exact mode a
//! term also reports each ancestor of the group it was found in, so AND and
//! OR can combine matches found at different depths. Group operators switch
//! their operand to exact mode and do their own re-keying to the parent.

use hashbrown::HashSet;
use hed_query::{CoveragePolicy, QueryExpression, TermDescriptor, TermMatch, WildcardKind};

use crate::error::HedResult;
use crate::result::{merge_and_groups, merge_or_groups, SearchResult};
use crate::traits::{HedQueryable, NodeId};

/// Evaluates compiled queries against one annotation tree.
///
/// # Example
///
/// ```rust
/// use hed_query_executor::{AnnotationTree, Evaluator, Taxonomy};
///
/// let tree = AnnotationTree::parse("A, (B, C)", &Taxonomy::new()).unwrap();
/// let expr = hed_query::parse("{b, c}").unwrap();
///
/// let results = Evaluator::new(&tree, tree.root()).evaluate(&expr, false).unwrap();
/// assert_eq!(results.len(), 1);
/// assert_eq!(results[0].group, tree.root());
/// ```
pub struct Evaluator<'a> {
    tree: &'a dyn HedQueryable,
    root: NodeId,
}

impl<'a> Evaluator<'a> {
    /// Creates an evaluator for the tree below `root`.
    pub fn new(tree: &'a dyn HedQueryable, root: NodeId) -> Self {
        Self { tree, root }
    }

    /// Evaluates an expression.
    ///
    /// With `exact` set, matches are reported only for the group directly
    /// holding them; otherwise every enclosing group is reported as well.
    pub fn evaluate(&self, expr: &QueryExpression, exact: bool) -> HedResult<Vec<SearchResult>> {
        let results = match expr {
            QueryExpression::Term(term) => self.term(term, exact),
            QueryExpression::And(left, right) => self.and(left, right, exact)?,
            QueryExpression::Or(left, right) => self.or(left, right, exact)?,
            QueryExpression::Not(inner) => self.not(inner, exact)?,
            QueryExpression::DescendantGroup(inner) => self.descendant_group(inner)?,
            QueryExpression::ExactMatchGroup {
                required,
                optional,
                coverage,
            } => self.exact_match_group(required, optional.as_deref(), *coverage)?,
            QueryExpression::Wildcard(kind) => self.wildcard(*kind),
        };

        tracing::trace!(node = %expr, exact, results = results.len(), "evaluated query node");
        Ok(results)
    }

    // ========================================================================
    // Operands
    // ========================================================================

    fn term(&self, term: &TermDescriptor, exact: bool) -> Vec<SearchResult> {
        let found = match term.match_mode() {
            TermMatch::Prefix => self.tree.find_wildcard_tags(self.root, &term.core_text),
            TermMatch::Exact => self.tree.find_exact_tags(self.root, &term.core_text),
            TermMatch::Taxonomy => self.tree.find_tags_with_term(self.root, &term.core_text),
        };

        let matches: Vec<(Option<NodeId>, NodeId)> = if term.must_not_appear_in_tree {
            if !found.is_empty() {
                return Vec::new();
            }
            self.tree
                .all_groups(self.root)
                .into_iter()
                .map(|group| (None, group))
                .collect()
        } else {
            found.into_iter().map(|m| (Some(m.tag), m.group)).collect()
        };

        let mut results = Vec::with_capacity(matches.len());
        for (child, group) in matches {
            results.push(SearchResult::new(group, child.into_iter().collect()));
            if exact {
                continue;
            }
            // Each ancestor records only the group one level below it
            let mut below = group;
            while let Some(parent) = self.tree.parent(below) {
                results.push(SearchResult::with_child(parent, below));
                below = parent;
            }
        }
        results
    }

    fn wildcard(&self, kind: WildcardKind) -> Vec<SearchResult> {
        let mut results = Vec::new();
        for group in self.tree.all_groups(self.root) {
            let children = match kind {
                WildcardKind::AnyTagOrGroup => self.tree.children(group).to_vec(),
                WildcardKind::AnyTag => self.tree.tags(group),
                WildcardKind::AnyGroup => self.tree.groups(group),
            };
            results.extend(
                children
                    .into_iter()
                    .map(|child| SearchResult::with_child(group, child)),
            );
        }
        results
    }

    // ========================================================================
    // Logical operators
    // ========================================================================

    fn and(
        &self,
        left: &QueryExpression,
        right: &QueryExpression,
        exact: bool,
    ) -> HedResult<Vec<SearchResult>> {
        let left = self.evaluate(left, exact)?;
        if left.is_empty() {
            return Ok(left);
        }
        let right = self.evaluate(right, exact)?;
        merge_and_groups(&left, &right, self.tree)
    }

    fn or(
        &self,
        left: &QueryExpression,
        right: &QueryExpression,
        exact: bool,
    ) -> HedResult<Vec<SearchResult>> {
        // Both sides always run so repeated tags are found from either branch
        let left = self.evaluate(left, exact)?;
        let right = self.evaluate(right, exact)?;
        Ok(merge_or_groups(left, right))
    }

    fn not(&self, inner: &QueryExpression, exact: bool) -> HedResult<Vec<SearchResult>> {
        let found = self.evaluate(inner, exact)?;
        let matched: HashSet<NodeId> = found.iter().map(|r| r.group).collect();

        Ok(self
            .tree
            .all_groups(self.root)
            .into_iter()
            .filter(|group| !matched.contains(group))
            .map(SearchResult::empty)
            .collect())
    }

    // ========================================================================
    // Group operators
    // ========================================================================

    fn descendant_group(&self, inner: &QueryExpression) -> HedResult<Vec<SearchResult>> {
        let found = self.evaluate(inner, true)?;
        Ok(self.parent_groups(&found))
    }

    fn exact_match_group(
        &self,
        required: &QueryExpression,
        optional: Option<&QueryExpression>,
        coverage: CoveragePolicy,
    ) -> HedResult<Vec<SearchResult>> {
        let found = self.evaluate(required, true)?;
        if coverage == CoveragePolicy::Any {
            return Ok(self.parent_groups(&found));
        }

        let covering = self.covering(&found);
        if !covering.is_empty() {
            return Ok(self.parent_groups(&covering));
        }

        let found = match optional {
            Some(optional) => {
                let optional_found = self.evaluate(optional, true)?;
                merge_and_groups(&found, &optional_found, self.tree)?
            }
            None => found,
        };

        let covering = self.covering(&found);
        Ok(self.parent_groups(&covering))
    }

    /// Keeps results that matched every direct child of their group.
    fn covering(&self, results: &[SearchResult]) -> Vec<SearchResult> {
        results
            .iter()
            .filter(|r| r.covers_group(self.tree))
            .cloned()
            .collect()
    }

    /// Re-keys each result to the parent of its group. Results for the
    /// top-level group have no parent and are dropped.
    fn parent_groups(&self, results: &[SearchResult]) -> Vec<SearchResult> {
        results
            .iter()
            .filter(|r| self.tree.is_group(r.group))
            .filter_map(|r| {
                self.tree
                    .parent(r.group)
                    .map(|parent| SearchResult::with_child(parent, r.group))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{AnnotationTree, Taxonomy};

    fn taxonomy() -> Taxonomy {
        Taxonomy::from_paths([
            "Event/Sensory-event",
            "Event/Agent-action",
            "Action/Communicate/Communicate-vocally/Clear-throat",
            "Item/Object",
            "Agent/Human-agent",
        ])
    }

    fn tree(text: &str) -> AnnotationTree {
        AnnotationTree::parse(text, &taxonomy()).unwrap()
    }

    fn eval(query: &str, tree: &AnnotationTree, exact: bool) -> Vec<SearchResult> {
        let expr = hed_query::parse(query).unwrap();
        Evaluator::new(tree, tree.root()).evaluate(&expr, exact).unwrap()
    }

    fn pairs(results: &[SearchResult]) -> Vec<(usize, Vec<usize>)> {
        results
            .iter()
            .map(|r| (r.group.0, r.children.iter().map(|c| c.0).collect()))
            .collect()
    }

    mod terms {
        use super::*;

        #[test]
        fn test_term_bubbles_to_every_ancestor() {
            // 0 root, 1 group, 2 group, 3 A
            let t = tree("((A))");
            let results = eval("a", &t, false);
            assert_eq!(pairs(&results), vec![(2, vec![3]), (1, vec![2]), (0, vec![1])]);
        }

        #[test]
        fn test_term_exact_mode_reports_holder_only() {
            let t = tree("((A))");
            let results = eval("a", &t, true);
            assert_eq!(pairs(&results), vec![(2, vec![3])]);
        }

        #[test]
        fn test_term_matches_taxonomic_descendants() {
            let t = tree("Sensory-event, Object");
            assert_eq!(pairs(&eval("event", &t, false)), vec![(0, vec![1])]);
            assert_eq!(pairs(&eval("item", &t, false)), vec![(0, vec![2])]);
        }

        #[test]
        fn test_quoted_term_ignores_taxonomy() {
            let t = tree("Sensory-event");
            assert!(eval("\"event\"", &t, false).is_empty());
            assert_eq!(eval("\"sensory-event\"", &t, false).len(), 1);
        }

        #[test]
        fn test_prefix_term() {
            let t = tree("Def/Def1/Value, Def/Def2");
            assert_eq!(pairs(&eval("def/def1*", &t, false)), vec![(0, vec![1])]);
            assert_eq!(eval("def/*", &t, false).len(), 2);
        }

        #[test]
        fn test_not_in_line_absent_matches_every_group() {
            // 0 root, 1 A, 2 group, 3 B
            let t = tree("A, (B)");
            let results = eval("@c", &t, true);
            assert_eq!(pairs(&results), vec![(0, vec![]), (2, vec![])]);
        }

        #[test]
        fn test_not_in_line_absent_bubbles_outside_exact_mode() {
            let t = tree("A, (B)");
            let results = eval("@c", &t, false);
            assert_eq!(pairs(&results), vec![(0, vec![]), (2, vec![]), (0, vec![2])]);
        }

        #[test]
        fn test_not_in_line_present_matches_nothing() {
            let t = tree("A, (B)");
            assert!(eval("@b", &t, false).is_empty());
        }
    }

    mod logical {
        use super::*;

        #[test]
        fn test_and_merges_within_group() {
            let t = tree("B, A");
            assert_eq!(pairs(&eval("a && b", &t, false)), vec![(0, vec![2, 1])]);
        }

        #[test]
        fn test_and_combines_across_levels() {
            // 0 root, 1 Object, 2 group, 3 Clear-throat
            let t = tree("Object, (Clear-throat)");
            let results = eval("item && action", &t, false);
            assert_eq!(pairs(&results), vec![(0, vec![2, 1])]);
        }

        #[test]
        fn test_and_short_circuits_on_empty_left() {
            let t = tree("A");
            assert!(eval("b && a", &t, false).is_empty());
        }

        #[test]
        fn test_and_requires_distinct_children() {
            let t = tree("(A)");
            assert!(eval("a && a", &t, false).is_empty());
            // Equal text keeps merge order, so both pairings survive
            let t = tree("(A, A)");
            assert_eq!(
                pairs(&eval("a && a", &t, true)),
                vec![(1, vec![2, 3]), (1, vec![3, 2])]
            );
        }

        #[test]
        fn test_or_keeps_both_sides() {
            let t = tree("A, B");
            assert_eq!(pairs(&eval("a || b", &t, false)), vec![(0, vec![1]), (0, vec![2])]);
        }

        #[test]
        fn test_or_drops_duplicate_from_left() {
            let t = tree("A, B");
            assert_eq!(pairs(&eval("a || a", &t, false)), vec![(0, vec![1])]);
        }

        #[test]
        fn test_not_returns_unmatched_groups() {
            // 0 root, 1 group, 2 A, 3 group, 4 B
            let t = tree("(A), (B)");
            let results = eval("~a", &t, true);
            assert_eq!(pairs(&results), vec![(0, vec![]), (3, vec![])]);
        }

        #[test]
        fn test_not_with_bubbling_excludes_ancestors() {
            let t = tree("(A), (B)");
            let results = eval("~a", &t, false);
            assert_eq!(pairs(&results), vec![(3, vec![])]);
        }
    }

    mod groups {
        use super::*;

        #[test]
        fn test_descendant_group_rekeys_to_parent() {
            // 0 root, 1 group, 2 A, 3 B
            let t = tree("(A, B)");
            assert_eq!(pairs(&eval("[a, b]", &t, false)), vec![(0, vec![1])]);
        }

        #[test]
        fn test_descendant_group_needs_an_enclosing_group() {
            let t = tree("A, B");
            assert!(eval("[a, b]", &t, false).is_empty());
        }

        #[test]
        fn test_exact_group_any_coverage() {
            let t = tree("(A, B, C)");
            assert_eq!(pairs(&eval("{a, b}", &t, false)), vec![(0, vec![1])]);
        }

        #[test]
        fn test_exact_group_complete_coverage() {
            let t = tree("(A, B, C)");
            assert!(eval("{a, b:}", &t, false).is_empty());
            assert_eq!(pairs(&eval("{a, b, c:}", &t, false)), vec![(0, vec![1])]);
        }

        #[test]
        fn test_exact_group_optional_fills_coverage() {
            let t = tree("(A, B, C)");
            assert_eq!(pairs(&eval("{a, b: c}", &t, false)), vec![(0, vec![1])]);
            assert_eq!(pairs(&eval("{a: ??, ??}", &t, false)), vec![(0, vec![1])]);
            assert!(eval("{a, b: d}", &t, false).is_empty());
        }

        #[test]
        fn test_exact_group_optional_may_be_absent() {
            let t = tree("(A, B)");
            assert_eq!(pairs(&eval("{a, b: c}", &t, false)), vec![(0, vec![1])]);
        }

        #[test]
        fn test_exact_group_is_direct_children_only() {
            // B sits one level deeper than A
            let t = tree("(A, (B))");
            assert!(eval("{a, b}", &t, false).is_empty());
        }

        #[test]
        fn test_exact_group_matches_nested_group_child() {
            // 0 root, 1 group, 2 A, 3 group, 4 B
            let t = tree("(A, (B))");
            assert_eq!(pairs(&eval("{a, {b}}", &t, false)), vec![(0, vec![1])]);
        }
    }

    mod wildcards {
        use super::*;

        #[test]
        fn test_any_child() {
            // 0 root, 1 A, 2 group, 3 B
            let t = tree("A, (B)");
            assert_eq!(
                pairs(&eval("?", &t, false)),
                vec![(0, vec![1]), (0, vec![2]), (2, vec![3])]
            );
        }

        #[test]
        fn test_any_tag() {
            let t = tree("A, (B)");
            assert_eq!(pairs(&eval("??", &t, false)), vec![(0, vec![1]), (2, vec![3])]);
        }

        #[test]
        fn test_any_group() {
            let t = tree("A, (B)");
            assert_eq!(pairs(&eval("???", &t, false)), vec![(0, vec![2])]);
        }

        #[test]
        fn test_wildcard_needs_extra_child() {
            assert!(!eval("a && b && ?", &tree("A, B, C"), false).is_empty());
            assert!(eval("a && b && ?", &tree("A, B"), false).is_empty());
        }
    }
}
