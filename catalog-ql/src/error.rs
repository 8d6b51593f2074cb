use crate::token::Span;
use thiserror::Error;

/// Lexical and syntactic failures: one enum, `thiserror`-derived, every
/// variant carrying the `Span` at which it was raised so the caller can
/// point back at the offending text.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    #[error("{span}: unexpected character {found:?}")]
    IllegalChar { found: char, span: Span },

    #[error("{span}: unterminated string literal")]
    UnterminatedString { span: Span },

    #[error("{span}: unterminated JSON block")]
    UnterminatedJson { span: Span },

    #[error("{span}: invalid JSON document: {message}")]
    InvalidJson { message: String, span: Span },

    #[error("{span}: expected {expected}, found {found:?}")]
    Unexpected {
        expected: String,
        found: String,
        span: Span,
    },

    #[error("{span}: a standalone anonymous node is not a valid pattern")]
    AnonymousStandalone { span: Span },

    #[error("{span}: WHERE sub-patterns are not allowed when a MATCH node is kindless")]
    SubMatchWithKindlessOuter { span: Span },

    #[error("{span}: ORDER BY references undefined variable {variable}")]
    UndefinedOrderByVariable { variable: String, span: Span },

    #[error("{span}: LIMIT/SKIP must be a non-negative integer, found {found}")]
    InvalidLimitOrSkip { found: String, span: Span },

    #[error("{span}: invalid ISO-8601 duration literal {literal:?}")]
    InvalidDuration { literal: String, span: Span },

    #[error("{span}: invalid RFC-3339 datetime literal {literal:?}")]
    InvalidDateTime { literal: String, span: Span },

    #[error("{span}: invalid number literal {literal:?}")]
    InvalidNumber { literal: String, span: Span },

    #[error("{span}: kindless node {variable:?} has no kinded neighbor to infer its kind from")]
    KindlessWithoutKindedNeighbor { variable: String, span: Span },

    #[error("{span}: sub-match pattern must reference exactly one outer MATCH variable with no kind or properties")]
    SubMatchMissingReference { span: Span },
}

impl ParseError {
    pub fn span(&self) -> Span {
        match self {
            ParseError::IllegalChar { span, .. }
            | ParseError::UnterminatedString { span }
            | ParseError::UnterminatedJson { span }
            | ParseError::InvalidJson { span, .. }
            | ParseError::Unexpected { span, .. }
            | ParseError::AnonymousStandalone { span }
            | ParseError::SubMatchWithKindlessOuter { span }
            | ParseError::UndefinedOrderByVariable { span, .. }
            | ParseError::InvalidLimitOrSkip { span, .. }
            | ParseError::InvalidDuration { span, .. }
            | ParseError::InvalidDateTime { span, .. }
            | ParseError::InvalidNumber { span, .. }
            | ParseError::KindlessWithoutKindedNeighbor { span, .. }
            | ParseError::SubMatchMissingReference { span } => *span,
        }
    }
}

pub type Result<T> = std::result::Result<T, ParseError>;
