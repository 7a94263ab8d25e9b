//! # hed-query
//!
//! A Rust library for the HED annotation search query language.
//!
//! HED annotations are trees: comma separated tags, with parentheses forming
//! nested groups (`Sensory-event, (Item, (Clear-throat))`). A search query
//! describes which tags must appear together in a group. This crate turns
//! query text into an immutable expression tree; evaluation against an
//! annotation lives in `hed-query-executor`.
//!
//! ## Usage
//!
//! ```rust
//! use hed_query::{parse, QueryExpression};
//!
//! // A term
//! let expr = parse("Sensory-event").unwrap();
//!
//! // A group holding both tags, and nothing but an optional extra tag
//! let expr = parse("{Item, Agent: ??}").unwrap();
//! assert!(matches!(expr, QueryExpression::ExactMatchGroup { .. }));
//! ```
//!
//! ## Query Syntax Quick Reference
//!
//! | Operator | Meaning | Example |
//! |----------|---------|---------|
//! | (none) | Tag or taxonomic descendant | `Event` |
//! | `"..."` | Exact tag text | `"Event"` |
//! | `*` | Tag text prefix | `Def/Def1*` |
//! | `@` | Must not appear anywhere | `@Agent` |
//! | `&&` `,` `and` | Both in the same group | `A && B` |
//! | `\|\|` `or` | Either | `A \|\| B` |
//! | `~` | Groups not matching | `~A` |
//! | `[...]` | Match strictly inside a group | `[A && B]` |
//! | `{...}` | Match the direct children of one group | `{A, B}` |
//! | `{...:...}` | As above, no unaccounted children | `{A: B}` |
//! | `?` `??` `???` | Any child, any tag, any group | `A && ??` |

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod ast;
mod error;
mod lexer;
mod parser;

pub use ast::{CoveragePolicy, QueryExpression, TermDescriptor, TermMatch, WildcardKind};
pub use error::{ParseResult, QueryError};
pub use lexer::{tokenize, Token, TokenKind};
pub use parser::{parse, parse_tokens};
