//! Recursive-descent parser for search queries.
//!
//! Grammar, lowest precedence first:
//!
//! ```text
//! or_expr   := and_expr (OR and_expr)*
//! and_expr  := unary (AND unary)*
//! unary     := NOT primary | primary
//! primary   := '(' or_expr ')'
//!            | '[' or_expr ']'
//!            | '{' or_expr [ ':' or_expr? ] '}'
//!            | WILDCARD | TERM
//! ```
//!
//! The parser walks the token list with a single cursor and one token of
//! lookahead. The first error aborts the parse.

use crate::ast::{CoveragePolicy, QueryExpression, TermDescriptor, WildcardKind};
use crate::error::{ParseResult, QueryError};
use crate::lexer::{tokenize, Token, TokenKind};

/// Parse a search query string.
///
/// # Arguments
/// * `query` - The query text; case is ignored
///
/// # Returns
/// The compiled expression tree or the first error found
///
/// # Examples
///
/// ```rust
/// use hed_query::{parse, QueryExpression};
///
/// // Single term
/// let expr = parse("Event").unwrap();
/// assert!(matches!(expr, QueryExpression::Term(_)));
///
/// // Both tags in one group, the second optional
/// let expr = parse("{Event: Agent-action}").unwrap();
/// assert_eq!(expr.to_string(), "{event:agent-action}");
///
/// // Precedence: AND binds tighter than OR
/// let expr = parse("a || b && c").unwrap();
/// assert_eq!(expr.to_string(), "(a || (b && c))");
/// ```
pub fn parse(query: &str) -> ParseResult<QueryExpression> {
    let tokens = tokenize(query)?;
    tracing::trace!(query, tokens = tokens.len(), "tokenized search query");
    parse_tokens(&tokens)
}

/// Parse an already tokenized query.
pub fn parse_tokens(tokens: &[Token]) -> ParseResult<QueryExpression> {
    if tokens.is_empty() {
        return Err(QueryError::EmptyQuery);
    }

    let mut parser = Parser::new(tokens);
    let expr = parser.or_expr()?;

    if let Some(token) = parser.peek() {
        return Err(QueryError::TrailingTokens {
            position: token.position,
            fragment: token.text.clone(),
        });
    }

    Ok(expr)
}

struct Parser<'t> {
    tokens: &'t [Token],
    cursor: usize,
}

impl<'t> Parser<'t> {
    fn new(tokens: &'t [Token]) -> Self {
        Self { tokens, cursor: 0 }
    }

    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.cursor)
    }

    fn advance(&mut self) -> Option<&'t Token> {
        let token = self.tokens.get(self.cursor)?;
        self.cursor += 1;
        Some(token)
    }

    /// Consumes the next token if it has the given kind.
    fn next_is(&mut self, kind: TokenKind) -> Option<&'t Token> {
        match self.peek() {
            Some(token) if token.kind == kind => self.advance(),
            _ => None,
        }
    }

    fn last_consumed(&self) -> String {
        self.cursor
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map(|t| t.text.clone())
            .unwrap_or_default()
    }

    // ========================================================================
    // Binary operators (left associative)
    // ========================================================================

    fn or_expr(&mut self) -> ParseResult<QueryExpression> {
        let mut expr = self.and_expr()?;
        while self.next_is(TokenKind::Or).is_some() {
            let right = self.and_expr()?;
            expr = QueryExpression::or(expr, right);
        }
        Ok(expr)
    }

    fn and_expr(&mut self) -> ParseResult<QueryExpression> {
        let mut expr = self.unary()?;
        while self.next_is(TokenKind::And).is_some() {
            let right = self.unary()?;
            expr = QueryExpression::and(expr, right);
        }
        Ok(expr)
    }

    fn unary(&mut self) -> ParseResult<QueryExpression> {
        if self.next_is(TokenKind::LogicalNegation).is_none() {
            return self.primary();
        }

        let inner = self.primary()?;
        if inner.contains_wildcard() {
            return Err(QueryError::NegatedWildcard {
                fragment: inner.to_string(),
            });
        }
        Ok(QueryExpression::not(inner))
    }

    // ========================================================================
    // Primaries
    // ========================================================================

    fn primary(&mut self) -> ParseResult<QueryExpression> {
        let Some(token) = self.advance() else {
            return Err(QueryError::UnexpectedEnd {
                fragment: self.last_consumed(),
            });
        };

        match token.kind {
            TokenKind::LogicalGroupOpen => {
                let expr = self.or_expr()?;
                self.close(
                    TokenKind::LogicalGroupClose,
                    QueryError::UnbalancedGroup {
                        position: token.position,
                    },
                )?;
                Ok(expr)
            }
            TokenKind::DescendantGroupOpen => {
                let inner = self.or_expr()?;
                self.close(
                    TokenKind::DescendantGroupClose,
                    QueryError::UnbalancedDescendantGroup {
                        position: token.position,
                    },
                )?;
                Ok(QueryExpression::descendant_group(inner))
            }
            TokenKind::ExactMatchOpen => self.exact_match_group(token),
            TokenKind::Wildcard => WildcardKind::from_symbol(&token.text)
                .map(QueryExpression::Wildcard)
                .ok_or_else(|| unexpected(token)),
            TokenKind::Term => Ok(QueryExpression::Term(TermDescriptor::from_token_text(
                &token.text,
            ))),
            _ => Err(unexpected(token)),
        }
    }

    fn close(&mut self, kind: TokenKind, unbalanced: QueryError) -> ParseResult<()> {
        match self.next_is(kind) {
            Some(_) => Ok(()),
            None => Err(unbalanced),
        }
    }

    /// Parses the remainder of `{required}`, `{required:}` or
    /// `{required:optional}` after the opening brace.
    fn exact_match_group(&mut self, open: &Token) -> ParseResult<QueryExpression> {
        let unbalanced = QueryError::UnbalancedExactGroup {
            position: open.position,
        };

        let required = self.or_expr()?;
        if self.next_is(TokenKind::ExactMatchClose).is_some() {
            return Ok(QueryExpression::exact_match(
                required,
                None,
                CoveragePolicy::Any,
            ));
        }
        if self.next_is(TokenKind::ExactMatchOptional).is_none() {
            return Err(unbalanced);
        }

        let optional = if self.next_is(TokenKind::ExactMatchClose).is_some() {
            None
        } else {
            let optional = self.or_expr()?;
            self.close(TokenKind::ExactMatchClose, unbalanced)?;
            Some(optional)
        };

        let required_negated = required.contains_negation();
        let optional_negation_anchored = optional
            .as_ref()
            .map_or(true, |o| negation_is_anchored(o, false));
        let group = QueryExpression::exact_match(required, optional, CoveragePolicy::None);

        if required_negated {
            return Err(QueryError::NegationInExactRequired {
                fragment: group.to_string(),
            });
        }
        if !optional_negation_anchored {
            return Err(QueryError::NegationInExactOptional {
                fragment: group.to_string(),
            });
        }
        Ok(group)
    }
}

fn unexpected(token: &Token) -> QueryError {
    QueryError::UnexpectedToken {
        position: token.position,
        fragment: token.text.clone(),
    }
}

/// Checks that every negation in an optional clause is an operand of `&&`.
fn negation_is_anchored(expr: &QueryExpression, under_and: bool) -> bool {
    match expr {
        QueryExpression::Not(_) => under_and,
        QueryExpression::And(left, right) => {
            negation_is_anchored(left, true) && negation_is_anchored(right, true)
        }
        QueryExpression::Or(left, right) => {
            negation_is_anchored(left, false) && negation_is_anchored(right, false)
        }
        QueryExpression::DescendantGroup(inner) => negation_is_anchored(inner, false),
        // Nested exact groups were validated when they were parsed.
        QueryExpression::ExactMatchGroup { .. }
        | QueryExpression::Term(_)
        | QueryExpression::Wildcard(_) => true,
    }
}
