//! Compiled search queries.

use std::str::FromStr;

use hed_query::QueryExpression;

use crate::error::{ExecutorError, HedResult};
use crate::evaluator::Evaluator;
use crate::result::SearchResult;
use crate::traits::{HedQueryable, NodeId};

/// A query compiled once and searched against any number of annotations.
///
/// Compiling does not depend on any tree, and the compiled query is never
/// modified by a search, so one instance can be shared between threads.
///
/// # Example
///
/// ```rust
/// use hed_query_executor::{AnnotationTree, HedQuery, Taxonomy};
///
/// let taxonomy = Taxonomy::from_paths(["Item/Object", "Action/Move"]);
/// let query = HedQuery::new("(Item || Agent) && Action").unwrap();
///
/// let tree = AnnotationTree::parse("Object, (Move)", &taxonomy).unwrap();
/// assert!(query.matches(&tree, tree.root()).unwrap());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct HedQuery {
    source: String,
    expression: QueryExpression,
}

impl HedQuery {
    /// Tokenizes and parses a query.
    pub fn new(query: &str) -> HedResult<Self> {
        let expression = hed_query::parse(query)?;
        tracing::debug!(query, compiled = %expression, "compiled search query");
        Ok(Self {
            source: query.to_string(),
            expression,
        })
    }

    /// Wraps an already built expression. The source text is its rendering.
    pub fn from_expression(expression: QueryExpression) -> Self {
        Self {
            source: expression.to_string(),
            expression,
        }
    }

    /// The query text this was compiled from.
    ///
    /// For a query served from a [`QueryExecutor`](crate::QueryExecutor)
    /// cache this may be the text of an equivalent query differing only in
    /// case or whitespace.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// The compiled expression tree.
    pub fn expression(&self) -> &QueryExpression {
        &self.expression
    }

    /// Searches the annotation below `root`.
    ///
    /// Returns every group that satisfies the query together with the
    /// children that satisfied it, including the enclosing groups of each
    /// match. An empty list means no match.
    pub fn search(&self, tree: &dyn HedQueryable, root: NodeId) -> HedResult<Vec<SearchResult>> {
        Evaluator::new(tree, root).evaluate(&self.expression, false)
    }

    /// Returns true if the search finds anything.
    pub fn matches(&self, tree: &dyn HedQueryable, root: NodeId) -> HedResult<bool> {
        Ok(!self.search(tree, root)?.is_empty())
    }
}

impl FromStr for HedQuery {
    type Err = ExecutorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl std::fmt::Display for HedQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}
