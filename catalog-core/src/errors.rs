//! Error taxonomy for the planner/executor: a single boxed enum behind a
//! newtype, `thiserror`-derived, with `#[from]` conversions for the leaf
//! error types it wraps. One variant per taxonomy entry (Syntax, Semantic,
//! Resolution, Provider, Arithmetic, Internal) so callers can match on error
//! *kind* without string-sniffing a message.

use catalog_ql::ParseError;
use thiserror::Error;

#[derive(Error, Debug)]
#[error(transparent)]
pub struct EngineError(Box<ErrorKind>);

impl EngineError {
    pub fn kind(&self) -> &ErrorKind {
        &self.0
    }

    pub fn semantic(message: impl Into<String>) -> Self {
        EngineError(Box::new(ErrorKind::Semantic {
            message: message.into(),
        }))
    }

    pub fn resolution(message: impl Into<String>) -> Self {
        EngineError(Box::new(ErrorKind::Resolution {
            message: message.into(),
        }))
    }

    pub fn arithmetic(message: impl Into<String>) -> Self {
        EngineError(Box::new(ErrorKind::Arithmetic {
            message: message.into(),
        }))
    }

    pub fn internal(message: impl Into<String>) -> Self {
        EngineError(Box::new(ErrorKind::Internal {
            message: message.into(),
        }))
    }

    pub fn provider(
        clause: &'static str,
        variable: impl Into<String>,
        operation: &'static str,
        message: impl Into<String>,
    ) -> Self {
        let variable = variable.into();
        let message = message.into();
        tracing::warn!(clause, operation, variable = %variable, message = %message, "wrapping provider error");
        EngineError(Box::new(ErrorKind::Provider {
            clause,
            operation,
            variable,
            message,
        }))
    }
}

/// One variant per §7 taxonomy entry. Every variant that can be raised
/// mid-query carries the clause type and, where applicable, the offending
/// variable name, per §7's "user-visible failures must include" requirement.
#[derive(Error, Debug)]
pub enum ErrorKind {
    #[error("syntax error: {0}")]
    Syntax(#[from] ParseError),

    #[error("semantic error: {message}")]
    Semantic { message: String },

    #[error("resolution error: {message}")]
    Resolution { message: String },

    #[error("{clause} on {variable}: provider {operation} failed: {message}")]
    Provider {
        clause: &'static str,
        operation: &'static str,
        variable: String,
        message: String,
    },

    #[error("arithmetic error: {message}")]
    Arithmetic { message: String },

    #[error("internal invariant violated: {message}")]
    Internal { message: String },
}

impl<E> From<E> for EngineError
where
    ErrorKind: From<E>,
{
    fn from(err: E) -> Self {
        EngineError(Box::new(ErrorKind::from(err)))
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
