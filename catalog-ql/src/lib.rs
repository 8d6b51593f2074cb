//! Lexer, parser, and AST for the catalog query DSL.
//!
//! This crate has no knowledge of resources, providers, or execution — it
//! only turns source text into a [`ast::Query`] and back. `catalog-core`
//! consumes the AST to plan and run queries.

pub mod ast;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod printer;
pub mod token;

pub use ast::Query;
pub use error::{ParseError, Result};
pub use parser::Parser;

/// Parses a query. Equivalent to `Parser::parse`.
pub fn parse(src: &str) -> Result<Query> {
    Parser::parse(src)
}

/// Renders a parsed query back to DSL source text.
pub fn print(query: &Query) -> String {
    printer::print_query(query)
}
