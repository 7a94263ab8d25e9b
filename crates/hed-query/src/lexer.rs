//! Query tokenizer implemented with nom.
//!
//! The scan is a single left-to-right pass. At each position the structural
//! patterns are tried in order (longest operator first) and anything else is
//! taken as a term.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while1},
    combinator::map,
    IResult,
};

use crate::error::{ParseResult, QueryError};

/// Characters that always end a term.
const STRUCTURAL_CHARS: &str = "()[]{}:~?,&|";

/// Kind of a lexed query token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TokenKind {
    /// `&&`, `,` or the word `and`.
    And,
    /// `||` or the word `or`.
    Or,
    /// `(`
    LogicalGroupOpen,
    /// `)`
    LogicalGroupClose,
    /// `[`
    DescendantGroupOpen,
    /// `]`
    DescendantGroupClose,
    /// `{`
    ExactMatchOpen,
    /// `}`
    ExactMatchClose,
    /// `:` separating the required and optional parts of `{...}`.
    ExactMatchOptional,
    /// `~`
    LogicalNegation,
    /// `?`, `??` or `???`.
    Wildcard,
    /// A bare `@` with no term attached.
    NotInLine,
    /// Free text operand.
    Term,
}

/// A single token of a search query.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Token {
    /// What the token is.
    pub kind: TokenKind,
    /// The token text, already lowercased.
    pub text: String,
    /// Byte offset of the token in the lowercased query.
    pub position: usize,
}

impl Token {
    /// Creates a token.
    pub fn new(kind: TokenKind, text: impl Into<String>, position: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            position,
        }
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

/// Tokenizes a search query.
///
/// The query is lowercased first; token positions refer to the lowercased
/// text. Whitespace separates tokens and is not kept.
///
/// # Examples
///
/// ```rust
/// use hed_query::{tokenize, TokenKind};
///
/// let tokens = tokenize("{A, B: ??}").unwrap();
/// let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
/// assert_eq!(
///     kinds,
///     vec![
///         TokenKind::ExactMatchOpen,
///         TokenKind::Term,
///         TokenKind::And,
///         TokenKind::Term,
///         TokenKind::ExactMatchOptional,
///         TokenKind::Wildcard,
///         TokenKind::ExactMatchClose,
///     ]
/// );
/// assert_eq!(tokens[1].text, "a");
/// ```
pub fn tokenize(query: &str) -> ParseResult<Vec<Token>> {
    let normalized = query.to_lowercase();
    let mut tokens = Vec::new();
    let mut rest = normalized.as_str();

    loop {
        rest = rest.trim_start();
        if rest.is_empty() {
            break;
        }
        let position = normalized.len() - rest.len();

        match token(rest) {
            Ok((remaining, (kind, text))) => {
                tokens.push(Token::new(kind, text, position));
                rest = remaining;
            }
            Err(_) => {
                let character = rest.chars().next().unwrap_or_default();
                return Err(QueryError::UnexpectedCharacter {
                    position,
                    character,
                });
            }
        }
    }

    Ok(tokens)
}

fn token(input: &str) -> IResult<&str, (TokenKind, &str)> {
    alt((wildcard, operator, delimiter, term))(input)
}

fn wildcard(input: &str) -> IResult<&str, (TokenKind, &str)> {
    // Order matters - longer matches first
    map(alt((tag("???"), tag("??"), tag("?"))), |text| {
        (TokenKind::Wildcard, text)
    })(input)
}

fn operator(input: &str) -> IResult<&str, (TokenKind, &str)> {
    alt((
        map(tag("&&"), |text| (TokenKind::And, text)),
        map(tag("||"), |text| (TokenKind::Or, text)),
        map(tag(","), |text| (TokenKind::And, text)),
        map(tag("~"), |text| (TokenKind::LogicalNegation, text)),
    ))(input)
}

fn delimiter(input: &str) -> IResult<&str, (TokenKind, &str)> {
    alt((
        map(tag("("), |text| (TokenKind::LogicalGroupOpen, text)),
        map(tag(")"), |text| (TokenKind::LogicalGroupClose, text)),
        map(tag("["), |text| (TokenKind::DescendantGroupOpen, text)),
        map(tag("]"), |text| (TokenKind::DescendantGroupClose, text)),
        map(tag("{"), |text| (TokenKind::ExactMatchOpen, text)),
        map(tag("}"), |text| (TokenKind::ExactMatchClose, text)),
        map(tag(":"), |text| (TokenKind::ExactMatchOptional, text)),
    ))(input)
}

fn term(input: &str) -> IResult<&str, (TokenKind, &str)> {
    map(take_while1(is_term_char), |text: &str| {
        (classify_word(text), text)
    })(input)
}

fn is_term_char(c: char) -> bool {
    !c.is_whitespace() && !STRUCTURAL_CHARS.contains(c)
}

fn classify_word(word: &str) -> TokenKind {
    match word {
        "and" => TokenKind::And,
        "or" => TokenKind::Or,
        "@" => TokenKind::NotInLine,
        _ => TokenKind::Term,
    }
}
