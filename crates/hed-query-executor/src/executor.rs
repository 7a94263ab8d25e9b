//! Query executor implementation.

use std::sync::Arc;
use std::time::Instant;

use hashbrown::HashSet;

use crate::cache::{normalize_cache_key, QueryCache};
use crate::config::ExecutorConfig;
use crate::error::HedResult;
use crate::query::HedQuery;
use crate::result::{ExecutionStats, QueryResult, SearchResult};
use crate::traits::{HedQueryable, NodeId};

/// One annotation to search: a tree and the group to search from.
pub type Annotation<'a> = (&'a dyn HedQueryable, NodeId);

/// Main query execution engine.
///
/// The executor compiles query text through the `hed-query` parser, keeps
/// compiled queries in an optional cache and searches any tree that
/// implements [`HedQueryable`].
///
/// # Example
///
/// ```rust
/// use hed_query_executor::{AnnotationTree, CacheConfig, ExecutorConfig, QueryExecutor, Taxonomy};
///
/// let config = ExecutorConfig::builder()
///     .with_cache(CacheConfig::default())
///     .build();
/// let executor = QueryExecutor::with_config(config);
///
/// let taxonomy = Taxonomy::from_paths(["Event/Sensory-event"]);
/// let tree = AnnotationTree::parse("Sensory-event, (Red, Blue)", &taxonomy).unwrap();
///
/// let result = executor.execute("Event && {red, blue}", &tree, tree.root()).unwrap();
/// assert!(result.is_match());
///
/// let again = executor.execute("event &&  {red, blue}", &tree, tree.root()).unwrap();
/// assert!(again.stats.cache_hit);
/// ```
#[derive(Debug, Default)]
pub struct QueryExecutor {
    config: ExecutorConfig,
    cache: Option<Arc<QueryCache>>,
}

impl QueryExecutor {
    /// Creates a new executor with default configuration (no cache,
    /// sequential batches).
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an executor with custom configuration.
    pub fn with_config(config: ExecutorConfig) -> Self {
        let cache = config
            .cache
            .as_ref()
            .map(|c| Arc::new(QueryCache::new(c.clone())));
        Self { config, cache }
    }

    /// Returns a reference to the cache if enabled.
    pub fn cache(&self) -> Option<&QueryCache> {
        self.cache.as_deref()
    }

    /// Returns a reference to the executor configuration.
    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Compiles query text, serving it from the cache when possible.
    ///
    /// Queries that differ only in case or whitespace share one cache
    /// entry, so a cached query's [`HedQuery::as_str`] is the text of
    /// whichever equivalent query was compiled first.
    pub fn compile(&self, query: &str) -> HedResult<Arc<HedQuery>> {
        self.compile_cached(query).map(|(compiled, _)| compiled)
    }

    fn compile_cached(&self, query: &str) -> HedResult<(Arc<HedQuery>, bool)> {
        let Some(cache) = &self.cache else {
            return Ok((Arc::new(HedQuery::new(query)?), false));
        };

        let key = normalize_cache_key(query);
        if let Some(compiled) = cache.get(&key) {
            tracing::debug!(query = %key, "query cache hit");
            return Ok((compiled, true));
        }

        tracing::debug!(query = %key, "query cache miss");
        let compiled = Arc::new(HedQuery::new(query)?);
        cache.set(key, Arc::clone(&compiled));
        Ok((compiled, false))
    }

    /// Compiles and runs a query against one annotation.
    ///
    /// # Returns
    ///
    /// * `Ok(QueryResult)` - The matches and execution stats
    /// * `Err(ExecutorError)` - If compiling or evaluating fails
    pub fn execute(&self, query: &str, tree: &dyn HedQueryable, root: NodeId) -> HedResult<QueryResult> {
        let start = Instant::now();

        let (compiled, cache_hit) = self.compile_cached(query)?;
        let results = compiled.search(tree, root)?;

        let groups_matched = results
            .iter()
            .map(|r| r.group)
            .collect::<HashSet<_>>()
            .len();
        let stats = ExecutionStats::new(start.elapsed(), groups_matched, cache_hit);
        Ok(QueryResult::new(results, stats))
    }

    /// Returns true if the query matches the annotation.
    pub fn matches(&self, query: &str, tree: &dyn HedQueryable, root: NodeId) -> HedResult<bool> {
        let compiled = self.compile(query)?;
        compiled.matches(tree, root)
    }

    /// Searches many annotations with one compiled query.
    ///
    /// Output order follows input order. With the `parallel` feature and
    /// [`ExecutorConfig::parallel`] set, annotations are searched on the
    /// rayon thread pool.
    pub fn search_many(
        &self,
        query: &HedQuery,
        annotations: &[Annotation<'_>],
    ) -> HedResult<Vec<Vec<SearchResult>>> {
        tracing::debug!(
            query = query.as_str(),
            annotations = annotations.len(),
            parallel = self.config.parallel,
            "searching annotations"
        );

        #[cfg(feature = "parallel")]
        if self.config.parallel {
            use rayon::prelude::*;
            return annotations
                .par_iter()
                .map(|&(tree, root)| query.search(tree, root))
                .collect();
        }

        annotations
            .iter()
            .map(|&(tree, root)| query.search(tree, root))
            .collect()
    }

    /// Returns the indices of the annotations the query matches, ascending.
    pub fn filter_matching(
        &self,
        query: &HedQuery,
        annotations: &[Annotation<'_>],
    ) -> HedResult<Vec<usize>> {
        let results = self.search_many(query, annotations)?;
        Ok(results
            .iter()
            .enumerate()
            .filter(|(_, found)| !found.is_empty())
            .map(|(index, _)| index)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;
    use crate::error::ExecutorError;
    use crate::tree::{AnnotationTree, Taxonomy};

    fn taxonomy() -> Taxonomy {
        Taxonomy::from_paths([
            "Event/Sensory-event",
            "Event/Agent-action",
            "Item/Object",
        ])
    }

    fn tree(text: &str) -> AnnotationTree {
        AnnotationTree::parse(text, &taxonomy()).unwrap()
    }

    fn cached_executor() -> QueryExecutor {
        QueryExecutor::with_config(ExecutorConfig::builder().with_cache(CacheConfig::default()).build())
    }

    mod construction {
        use super::*;

        #[test]
        fn test_executor_new() {
            let executor = QueryExecutor::new();
            assert!(executor.cache().is_none());
            assert!(!executor.config().parallel);
        }

        #[test]
        fn test_executor_with_config() {
            let config = ExecutorConfig::builder()
                .with_cache(CacheConfig::default())
                .with_parallel(true)
                .build();
            let executor = QueryExecutor::with_config(config);
            assert!(executor.cache().is_some());
            assert!(executor.config().parallel);
        }
    }

    mod compile {
        use super::*;

        #[test]
        fn test_compile_without_cache() {
            let executor = QueryExecutor::new();
            let first = executor.compile("a && b").unwrap();
            let second = executor.compile("a && b").unwrap();
            assert!(!Arc::ptr_eq(&first, &second));
            assert_eq!(first.expression(), second.expression());
        }

        #[test]
        fn test_compile_with_cache_normalizes_text() {
            let executor = cached_executor();
            let first = executor.compile("A && B").unwrap();
            let second = executor.compile("  a   &&  b ").unwrap();
            assert!(Arc::ptr_eq(&first, &second));
            assert_eq!(executor.cache().unwrap().len(), 1);
        }

        #[test]
        fn test_cached_query_keeps_first_source_text() {
            let executor = cached_executor();
            executor.compile("A && B").unwrap();
            let cached = executor.compile("  a && b").unwrap();
            assert_eq!(cached.as_str(), "A && B");
            assert_eq!(cached.to_string(), "A && B");

            let uncached = QueryExecutor::new().compile("  a && b").unwrap();
            assert_eq!(uncached.as_str(), "  a && b");
        }

        #[test]
        fn test_compile_errors_are_not_cached() {
            let executor = cached_executor();
            assert!(matches!(
                executor.compile("(a"),
                Err(ExecutorError::Query(_))
            ));
            assert!(executor.cache().unwrap().is_empty());
        }
    }

    mod execute {
        use super::*;

        #[test]
        fn test_execute_reports_results_and_stats() {
            // 0 root, 1 Sensory-event, 2 group, 3 Agent-action
            let t = tree("Sensory-event, (Agent-action)");
            let executor = QueryExecutor::new();

            let result = executor.execute("event", &t, t.root()).unwrap();
            assert_eq!(result.count(), 3);
            assert_eq!(result.groups(), vec![NodeId(0), NodeId(2)]);
            assert_eq!(result.stats.groups_matched, 2);
            assert!(!result.stats.cache_hit);
        }

        #[test]
        fn test_execute_cache_hit() {
            let t = tree("Object");
            let executor = cached_executor();

            let first = executor.execute("Item", &t, t.root()).unwrap();
            let second = executor.execute("item", &t, t.root()).unwrap();
            assert!(!first.stats.cache_hit);
            assert!(second.stats.cache_hit);
            assert_eq!(first.results, second.results);
        }

        #[test]
        fn test_execute_no_match() {
            let t = tree("Object");
            let result = QueryExecutor::new().execute("event", &t, t.root()).unwrap();
            assert!(!result.is_match());
            assert_eq!(result.stats.groups_matched, 0);
        }

        #[test]
        fn test_execute_invalid_query() {
            let t = tree("Object");
            let err = QueryExecutor::new().execute("a &&", &t, t.root()).unwrap_err();
            assert!(matches!(err, ExecutorError::Query(_)));
        }

        #[test]
        fn test_matches() {
            let t = tree("Object, (Sensory-event)");
            let executor = QueryExecutor::new();
            assert!(executor.matches("item && [event]", &t, t.root()).unwrap());
            assert!(!executor.matches("{item, event}", &t, t.root()).unwrap());
        }
    }

    mod batches {
        use super::*;

        fn annotations(trees: &[AnnotationTree]) -> Vec<Annotation<'_>> {
            trees
                .iter()
                .map(|t| (t as &dyn HedQueryable, t.root()))
                .collect()
        }

        #[test]
        fn test_search_many_keeps_input_order() {
            let trees = vec![tree("Object"), tree("Sensory-event"), tree("(Object)")];
            let query = HedQuery::new("item").unwrap();

            let results = QueryExecutor::new()
                .search_many(&query, &annotations(&trees))
                .unwrap();
            assert_eq!(results.len(), 3);
            assert_eq!(results[0].len(), 1);
            assert!(results[1].is_empty());
            assert_eq!(results[2].len(), 2);
        }

        #[test]
        fn test_filter_matching() {
            let trees = vec![tree("Object"), tree("Sensory-event"), tree("(Object)")];
            let query = HedQuery::new("item").unwrap();

            let matching = QueryExecutor::new()
                .filter_matching(&query, &annotations(&trees))
                .unwrap();
            assert_eq!(matching, vec![0, 2]);
        }

        #[test]
        fn test_parallel_flag_gives_same_results() {
            let trees: Vec<AnnotationTree> = (0..32)
                .map(|i| {
                    if i % 3 == 0 {
                        tree("Object, (Sensory-event)")
                    } else {
                        tree("Agent-action")
                    }
                })
                .collect();
            let query = HedQuery::new("item && [event]").unwrap();
            let inputs = annotations(&trees);

            let sequential = QueryExecutor::new().search_many(&query, &inputs).unwrap();
            let parallel = QueryExecutor::with_config(ExecutorConfig::builder().with_parallel(true).build())
                .search_many(&query, &inputs)
                .unwrap();
            assert_eq!(sequential, parallel);
        }

        #[test]
        fn test_empty_batch() {
            let query = HedQuery::new("a").unwrap();
            let results = QueryExecutor::new().search_many(&query, &[]).unwrap();
            assert!(results.is_empty());
        }
    }
}
