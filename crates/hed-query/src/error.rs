//! Error types for HED query compilation.

use thiserror::Error;

/// Errors that can occur while tokenizing or parsing a search query.
///
/// Every variant carries the fragment of the query that triggered it, so a
/// caller can point the user at the offending text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// Empty input provided.
    #[error("empty search query")]
    EmptyQuery,

    /// A `(` was never closed.
    #[error("missing closing ')' for '(' at position {position}")]
    UnbalancedGroup {
        /// Byte offset of the opening delimiter.
        position: usize,
    },

    /// A `[` was never closed.
    #[error("missing closing ']' for '[' at position {position}")]
    UnbalancedDescendantGroup {
        /// Byte offset of the opening delimiter.
        position: usize,
    },

    /// A `{` was never closed.
    #[error("missing closing '}}' for '{{' at position {position}")]
    UnbalancedExactGroup {
        /// Byte offset of the opening delimiter.
        position: usize,
    },

    /// Tokens remain after a complete expression was parsed.
    #[error("unexpected trailing input at position {position}: '{fragment}'")]
    TrailingTokens {
        /// Byte offset of the first unconsumed token.
        position: usize,
        /// Text of the first unconsumed token.
        fragment: String,
    },

    /// `~` applied to an expression containing `?`, `??` or `???`.
    #[error("cannot negate wildcards or expressions containing wildcards: '~{fragment}'; use {{required : optional}} instead")]
    NegatedWildcard {
        /// Rendering of the negated expression.
        fragment: String,
    },

    /// `~` inside the required clause of a `{required:optional}` group.
    #[error("negation is not allowed in the required part of an exact match group: '{fragment}'")]
    NegationInExactRequired {
        /// Rendering of the exact match group.
        fragment: String,
    },

    /// `~` in the optional clause that is not combined with `&&`.
    #[error("negation in the optional part of an exact match group must be combined with '&&': '{fragment}'")]
    NegationInExactOptional {
        /// Rendering of the exact match group.
        fragment: String,
    },

    /// A structural token appeared where an operand was expected.
    #[error("unexpected '{fragment}' at position {position}")]
    UnexpectedToken {
        /// Byte offset of the token.
        position: usize,
        /// Text of the token.
        fragment: String,
    },

    /// The query ended where an operand was expected.
    #[error("query ended unexpectedly after '{fragment}'")]
    UnexpectedEnd {
        /// Text of the last token consumed.
        fragment: String,
    },

    /// A character that cannot start any token.
    #[error("unexpected character '{character}' at position {position}")]
    UnexpectedCharacter {
        /// Byte offset of the character.
        position: usize,
        /// The character itself.
        character: char,
    },
}

/// Result type for query compilation.
pub type ParseResult<T> = std::result::Result<T, QueryError>;
