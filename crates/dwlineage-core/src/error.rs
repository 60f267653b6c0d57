//! Error types for script processing.
//!
//! [`LineageError`] is the single error type returned by the engine. Every
//! variant is fatal to the script being processed: its transaction is rolled
//! back and the catalog is left as it was before the call. Batch processing
//! records the error against the script and carries on with the next one.

use crate::types::Dialect;
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;
use thiserror::Error;

pub type Result<T, E = LineageError> = std::result::Result<T, E>;

/// Line/column position reported by the SQL parser (1-indexed).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

/// The SQL text of a script could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub message: String,
    pub position: Option<Position>,
    pub dialect: Option<Dialect>,
}

impl ParseError {
    pub fn new(message: impl Into<String>) -> Self {
        let message = message.into();
        let position = Self::position_from_message(&message);
        Self {
            message,
            position,
            dialect: None,
        }
    }

    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = Some(dialect);
        self
    }

    /// Reads `Line: X, Column: Y` out of a sqlparser message.
    fn position_from_message(message: &str) -> Option<Position> {
        static POSITION_REGEX: OnceLock<Regex> = OnceLock::new();
        let re = POSITION_REGEX.get_or_init(|| {
            Regex::new(r"Line:\s*(\d+)\s*,\s*Column:\s*(\d+)").expect("Invalid regex pattern")
        });

        re.captures(message).and_then(|caps| {
            let line = caps.get(1)?.as_str().parse().ok()?;
            let column = caps.get(2)?.as_str().parse().ok()?;
            Some(Position { line, column })
        })
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "parse error")?;
        if let Some(dialect) = self.dialect {
            write!(f, " ({dialect})")?;
        }
        if let Some(pos) = self.position {
            write!(f, " at line {}, column {}", pos.line, pos.column)?;
        }
        write!(f, ": {}", self.message)
    }
}

impl std::error::Error for ParseError {}

impl From<sqlparser::parser::ParserError> for ParseError {
    fn from(err: sqlparser::parser::ParserError) -> Self {
        Self::new(err.to_string())
    }
}

impl From<sqlparser::tokenizer::TokenizerError> for ParseError {
    fn from(err: sqlparser::tokenizer::TokenizerError) -> Self {
        Self::new(err.to_string())
    }
}

/// Failure reported by a catalog store.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// Another transaction committed a conflicting change first.
    #[error("write conflict on {0}")]
    Conflict(String),
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Errors raised while processing a script.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LineageError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("statement {index}: {reason}")]
    Classification { index: u32, reason: String },

    #[error("table {table} is already defined by DDL in script {defined_by}")]
    DuplicateDefinition { table: String, defined_by: String },

    #[error("column {column} is not part of the DDL definition of {table}")]
    UnknownColumn { table: String, column: String },

    #[error(
        "conflicting descriptions for {table}.{column}: '{existing}' vs '{incoming}'"
    )]
    ConflictingDescription {
        table: String,
        column: String,
        existing: String,
        incoming: String,
    },

    #[error("no target table could be identified for script {script}")]
    NoTargetIdentified { script: String },

    #[error("lineage traversal from {start} in script {script} loops or exceeds depth {limit} at {node}")]
    LineageCycle {
        script: String,
        start: String,
        node: String,
        limit: usize,
    },

    #[error("transaction failed: {0}")]
    TransactionFailure(#[from] StoreError),

    #[error("script {script} has already been processed")]
    ScriptAlreadyProcessed { script: String },

    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),
}

impl LineageError {
    /// Stable machine-readable code for reports.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Parse(_) => "PARSE_ERROR",
            Self::Classification { .. } => "CLASSIFICATION_ERROR",
            Self::DuplicateDefinition { .. } => "DUPLICATE_DEFINITION",
            Self::UnknownColumn { .. } => "UNKNOWN_COLUMN",
            Self::ConflictingDescription { .. } => "CONFLICTING_DESCRIPTION",
            Self::NoTargetIdentified { .. } => "NO_TARGET_IDENTIFIED",
            Self::LineageCycle { .. } => "LINEAGE_CYCLE",
            Self::TransactionFailure(_) => "TRANSACTION_FAILURE",
            Self::ScriptAlreadyProcessed { .. } => "SCRIPT_ALREADY_PROCESSED",
            Self::InvalidIdentifier(_) => "INVALID_IDENTIFIER",
        }
    }

    /// Whether retrying the whole script may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransactionFailure(StoreError::Conflict(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_is_read_from_sqlparser_message() {
        let err = ParseError::new("Expected: an expression, found: EOF at Line: 3, Column: 14");
        assert_eq!(err.position, Some(Position { line: 3, column: 14 }));
    }

    #[test]
    fn position_tolerates_whitespace_variations() {
        let err = ParseError::new("Error at Line:1,Column:5");
        assert_eq!(err.position, Some(Position { line: 1, column: 5 }));
        let err = ParseError::new("Error at Line:  42 ,  Column:   99");
        assert_eq!(err.position, Some(Position { line: 42, column: 99 }));
    }

    #[test]
    fn malformed_position_is_ignored() {
        assert_eq!(ParseError::new("Error at Line: abc, Column: 5").position, None);
        assert_eq!(ParseError::new("Column: 5, Line: 1").position, None);
        assert_eq!(ParseError::new("Unexpected token").position, None);
    }

    #[test]
    fn display_includes_dialect_and_position() {
        let err = ParseError::new("bad at Line: 2, Column: 7").with_dialect(Dialect::Postgres);
        assert_eq!(
            err.to_string(),
            "parse error (postgres) at line 2, column 7: bad at Line: 2, Column: 7"
        );
    }

    #[test]
    fn only_conflicts_are_retryable() {
        let conflict = LineageError::from(StoreError::Conflict("table X".into()));
        let backend = LineageError::from(StoreError::Backend("disk".into()));
        assert!(conflict.is_retryable());
        assert!(!backend.is_retryable());
        assert_eq!(conflict.code(), "TRANSACTION_FAILURE");
    }
}
