//! # hed-query-executor
//!
//! Search engine for HED annotation queries.
//!
//! This crate evaluates queries compiled by [`hed-query`](hed_query) against
//! annotation trees. Any tree type can be searched by implementing
//! [`HedQueryable`]; [`AnnotationTree`] is a ready-made arena implementation
//! with taxonomy lookups through [`Taxonomy`].
//!
//! ## Key Features
//!
//! - **Compile once** - [`HedQuery`] is immutable and `Send + Sync`
//! - **Group-aware results** - every match reports the group it was found in
//!   and the children that satisfied it
//! - **Configurable caching** - LRU + TTL cache of compiled queries
//! - **Optional parallelism** - Enable `parallel` feature for batch search on rayon
//!
//! ## Quick Start
//!
//! ```rust
//! use hed_query_executor::{AnnotationTree, HedQuery, Taxonomy};
//!
//! let taxonomy = Taxonomy::from_paths([
//!     "Event/Sensory-event",
//!     "Action/Communicate/Communicate-vocally/Clear-throat",
//!     "Item/Object",
//! ]);
//! let tree = AnnotationTree::parse("Sensory-event, (Object, Clear-throat)", &taxonomy).unwrap();
//!
//! let query = HedQuery::new("Event && {Item, Action}").unwrap();
//! let results = query.search(&tree, tree.root()).unwrap();
//! assert_eq!(results.len(), 1);
//! assert_eq!(results[0].group, tree.root());
//! ```
//!
//! ## With Configuration
//!
//! ```rust
//! use hed_query_executor::{CacheConfig, ExecutorConfig, QueryExecutor};
//! use std::time::Duration;
//!
//! let config = ExecutorConfig::builder()
//!     .with_cache(CacheConfig {
//!         max_entries: 1_000,
//!         ttl: Duration::from_secs(60),
//!     })
//!     .with_parallel(true)
//!     .build();
//!
//! let executor = QueryExecutor::with_config(config);
//! let query = executor.compile("a && ~b").unwrap();
//! ```
//!
//! ## Result Shape
//!
//! | Query | Annotation | Results |
//! |-------|------------|---------|
//! | `a` | `(A)` | `((A), [A])`, `(root, [(A)])` |
//! | `[a]` | `(A)` | `(root, [(A)])` |
//! | `{a:}` | `(A, B)` | none |
//! | `~a` | `A, (B)` | `((B), [])` |
//!
//! ## Feature Flags
//!
//! - `parallel` - Enables parallel batch search using rayon
//! - `serde` - Derives `Serialize`/`Deserialize` for [`NodeId`] and [`SearchResult`]
//!
//! ## Logging
//!
//! Compilation, cache hits and batch searches are reported through
//! `tracing` at debug level, evaluated nodes at trace level. No subscriber
//! is installed.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod cache;
mod config;
mod error;
mod evaluator;
mod executor;
mod query;
mod result;
mod traits;
mod tree;

// Public re-exports
pub use cache::{normalize_cache_key, CacheStats, QueryCache};
pub use config::{CacheConfig, ExecutorConfig, ExecutorConfigBuilder};
pub use error::{ExecutorError, HedResult};
pub use evaluator::Evaluator;
pub use executor::{Annotation, QueryExecutor};
pub use query::HedQuery;
pub use result::{merge_and_groups, merge_or_groups, ExecutionStats, QueryResult, SearchResult};
pub use traits::{HedQueryable, NodeId, TagMatch};
pub use tree::{AnnotationTree, Taxonomy, TreeError};

// Re-export commonly used types from the parser for convenience
pub use hed_query::{QueryError, QueryExpression};
