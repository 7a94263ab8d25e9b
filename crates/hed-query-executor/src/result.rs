//! Search result types and the merge operations used by AND and OR.

use std::time::Duration;

use hashbrown::HashSet;

use crate::error::{ExecutorError, HedResult};
use crate::traits::{HedQueryable, NodeId};

/// A group together with the children of it that a query matched.
///
/// Children are direct children of `group`, compared by identity, with no
/// duplicates.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SearchResult {
    /// The group the match was found in.
    pub group: NodeId,
    /// Matched tags and groups, drawn from the group's own children.
    pub children: Vec<NodeId>,
}

impl SearchResult {
    /// Creates a result.
    pub fn new(group: NodeId, children: Vec<NodeId>) -> Self {
        Self { group, children }
    }

    /// Creates a result with a single matched child.
    pub fn with_child(group: NodeId, child: NodeId) -> Self {
        Self {
            group,
            children: vec![child],
        }
    }

    /// Creates a result that matched the group but none of its children.
    pub fn empty(group: NodeId) -> Self {
        Self {
            group,
            children: Vec::new(),
        }
    }

    /// Returns true if both results are about the same group.
    pub fn is_same_group(&self, other: &SearchResult) -> bool {
        self.group == other.group
    }

    /// Returns true if both results have the same group and the same
    /// children in the same order.
    pub fn has_same_children(&self, other: &SearchResult) -> bool {
        self.group == other.group && self.children == other.children
    }

    /// Returns true if any child appears in both results.
    pub fn shares_child(&self, other: &SearchResult) -> bool {
        self.children
            .iter()
            .any(|child| other.children.contains(child))
    }

    /// Merges two results for the same group.
    ///
    /// Children are unioned by identity and ordered by their rendered text;
    /// children with equal text keep their relative order.
    pub fn merge_and(&self, other: &SearchResult, tree: &dyn HedQueryable) -> HedResult<SearchResult> {
        if self.group != other.group {
            return Err(ExecutorError::InternalMergeMismatch {
                left: self.group,
                right: other.group,
            });
        }

        let mut children = self.children.clone();
        for &child in &other.children {
            if !children.contains(&child) {
                children.push(child);
            }
        }
        children.sort_by_cached_key(|&child| tree.render(child));

        Ok(SearchResult::new(self.group, children))
    }

    /// Returns true if the result accounts for every direct child of its group.
    pub fn covers_group(&self, tree: &dyn HedQueryable) -> bool {
        self.children.len() == tree.children(self.group).len()
    }
}

/// Intersects two result lists group by group.
///
/// Pairs that share a child are dropped so a single tag never satisfies both
/// operands; identical merged results are kept once.
pub fn merge_and_groups(
    left: &[SearchResult],
    right: &[SearchResult],
    tree: &dyn HedQueryable,
) -> HedResult<Vec<SearchResult>> {
    let mut merged: Vec<SearchResult> = Vec::new();

    for result in left {
        for other in right {
            if !result.is_same_group(other) || result.shares_child(other) {
                continue;
            }
            let candidate = result.merge_and(other, tree)?;
            if merged.iter().any(|r| r.has_same_children(&candidate)) {
                continue;
            }
            merged.push(candidate);
        }
    }

    Ok(merged)
}

/// Unions two result lists.
///
/// Left results that also appear in the right list are dropped, then the
/// right list is appended in full.
pub fn merge_or_groups(left: Vec<SearchResult>, right: Vec<SearchResult>) -> Vec<SearchResult> {
    let mut combined: Vec<SearchResult> = left
        .into_iter()
        .filter(|result| !right.iter().any(|other| result.has_same_children(other)))
        .collect();
    combined.extend(right);
    combined
}

/// Result of executing a query against one annotation.
#[derive(Debug, Clone)]
pub struct QueryResult {
    /// Matches in evaluation order.
    pub results: Vec<SearchResult>,
    /// Execution statistics.
    pub stats: ExecutionStats,
}

impl QueryResult {
    /// Creates a new QueryResult.
    pub fn new(results: Vec<SearchResult>, stats: ExecutionStats) -> Self {
        Self { results, stats }
    }

    /// Creates an empty QueryResult.
    pub fn empty() -> Self {
        Self {
            results: Vec::new(),
            stats: ExecutionStats::default(),
        }
    }

    /// Returns true if the query matched anything.
    pub fn is_match(&self) -> bool {
        !self.results.is_empty()
    }

    /// Returns the number of results.
    pub fn count(&self) -> usize {
        self.results.len()
    }

    /// Returns true if there are no results.
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Distinct groups that matched, in first-seen order.
    pub fn groups(&self) -> Vec<NodeId> {
        let mut seen = HashSet::new();
        self.results
            .iter()
            .filter(|r| seen.insert(r.group))
            .map(|r| r.group)
            .collect()
    }

    /// Returns an iterator over the results.
    pub fn iter(&self) -> impl Iterator<Item = &SearchResult> {
        self.results.iter()
    }
}

impl IntoIterator for QueryResult {
    type Item = SearchResult;
    type IntoIter = std::vec::IntoIter<SearchResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.into_iter()
    }
}

impl<'a> IntoIterator for &'a QueryResult {
    type Item = &'a SearchResult;
    type IntoIter = std::slice::Iter<'a, SearchResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.iter()
    }
}

/// Statistics from query execution.
#[derive(Debug, Clone, Default)]
pub struct ExecutionStats {
    /// Total execution duration, compilation included.
    pub duration: Duration,
    /// Number of distinct groups in the results.
    pub groups_matched: usize,
    /// Whether the compiled query was served from cache.
    pub cache_hit: bool,
}

impl ExecutionStats {
    /// Creates new execution stats.
    pub fn new(duration: Duration, groups_matched: usize, cache_hit: bool) -> Self {
        Self {
            duration,
            groups_matched,
            cache_hit,
        }
    }
}
