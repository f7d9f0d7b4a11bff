//! Error types for the QuartzDB engine

use thiserror::Error;

pub type Result<T> = std::result::Result<T, QuartzError>;

#[derive(Error, Debug)]
pub enum QuartzError {
    #[error("lex error: {0}")]
    Lex(String),

    #[error("syntax error: {0}")]
    Syntax(String),

    #[error("schema error: {0}")]
    Schema(String),

    #[error("type error: {0}")]
    Type(String),

    #[error("constraint violation: {0}")]
    Constraint(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl QuartzError {
    /// Short error kind, sent alongside the message on the connection's
    /// error path.
    pub fn kind(&self) -> &'static str {
        match self {
            QuartzError::Lex(_) => "lex",
            QuartzError::Syntax(_) => "syntax",
            QuartzError::Schema(_) => "schema",
            QuartzError::Type(_) => "type",
            QuartzError::Constraint(_) => "constraint",
            QuartzError::Connection(_) => "connection",
            QuartzError::Io(_) => "io",
        }
    }
}
