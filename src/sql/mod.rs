//! SQL front-end
//!
//! Lexer, parser, predicate evaluation, and the statement executors.
//! Data flows bytes -> tokens -> tagged statements -> executor.

pub mod ast;
pub mod executor;
pub mod lexer;
pub mod parser;
pub mod predicate;
pub mod token;

pub use ast::Statement;
pub use executor::Executor;
pub use lexer::Lexer;
pub use parser::Parser;
pub use token::{Token, TokenKind};

use crate::error::{QuartzError, Result};

/// Lex and parse a statement string into tagged statements.
pub fn parse(input: &str) -> Result<Vec<Statement>> {
    let tokens = lexer::lex(input)?;
    let statements = Parser::new(tokens).parse()?;
    if statements.is_empty() {
        return Err(QuartzError::Syntax(format!("near {input}")));
    }
    Ok(statements)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_end_to_end() {
        let statements = parse("SELECT * FROM t; EXPLAIN SELECT * FROM t").unwrap();
        assert_eq!(statements.len(), 2);
    }

    #[test]
    fn test_empty_input_is_a_syntax_error() {
        assert!(matches!(parse("   "), Err(QuartzError::Syntax(_))));
    }
}
