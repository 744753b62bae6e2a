//! Typed error hierarchy for the Maker Copilot back-end.
//!
//! Three leaf enums cover the three request families:
//! - `QueryError`: widget descriptor validation failures (client errors)
//! - `ReportError`: report and dashboard parameter failures (client errors)
//! - `AuthError`: bearer token problems
//!
//! `CopilotError` wraps them together with infrastructure failures so a
//! single `?` chain can flow from storage up to the HTTP layer.

use thiserror::Error;

/// The SQL clause a rejected field was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clause {
    Select,
    Where,
    OrderBy,
}

impl std::fmt::Display for Clause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Clause::Select => write!(f, "SELECT"),
            Clause::Where => write!(f, "WHERE"),
            Clause::OrderBy => write!(f, "ORDER BY"),
        }
    }
}

/// Widget descriptor validation failures. Every variant is a client error.
#[derive(Debug, Error, PartialEq)]
pub enum QueryError {
    #[error("Entity '{entity}' is not allowed. Allowed entities: {allowed}")]
    UnknownEntity { entity: String, allowed: String },

    #[error("Field '{field}' is not allowed in {clause} for entity '{entity}'. Allowed fields: {allowed}")]
    FieldNotAllowed {
        field: String,
        entity: String,
        clause: Clause,
        allowed: String,
    },

    #[error("Aggregate function '{function}' is not allowed. Allowed: COUNT, SUM, AVG, MIN, MAX")]
    AggregateNotAllowed { function: String },

    #[error("Select list cannot be empty")]
    EmptySelect,

    #[error("Value for IN operator on '{key}' must be an array")]
    InValueNotArray { key: String },

    #[error("IN operator on '{key}' accepts at most {max} values, got {count}")]
    TooManyInValues { key: String, count: usize, max: usize },

    #[error("Invalid value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    #[error("Invalid sort direction '{direction}'. Allowed: ASC, DESC")]
    InvalidSortDirection { direction: String },

    #[error("Limit must be greater than 0 and cannot exceed {max}, got {limit}")]
    LimitOutOfRange { limit: i64, max: i64 },

    #[error("Offset cannot be negative, got {offset}")]
    NegativeOffset { offset: i64 },
}

/// Report and dashboard parameter failures.
#[derive(Debug, Error, PartialEq)]
pub enum ReportError {
    #[error("Invalid date format '{value}'. Please use YYYY-MM-DD.")]
    InvalidDate { value: String },

    #[error("Missing required parameter '{name}'")]
    MissingParameter { name: &'static str },

    #[error("Start date {start} is after end date {end}")]
    InvertedRange { start: String, end: String },

    #[error("Unsupported export format '{format}'. Allowed: json, excel")]
    UnsupportedFormat { format: String },

    #[error("Parameter '{name}' out of range: {message}")]
    OutOfRange { name: &'static str, message: String },
}

/// Bearer token failures.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("User not authenticated")]
    MissingToken,

    #[error("Invalid token: {0}")]
    InvalidToken(#[source] jsonwebtoken::errors::Error),

    #[error("Token subject '{subject}' is not a user id")]
    InvalidSubject { subject: String },

    #[error("Failed to issue token: {0}")]
    Issue(#[source] jsonwebtoken::errors::Error),

    #[error("Token lifetime of {ttl_secs}s overflows the expiry timestamp")]
    LifetimeOverflow { ttl_secs: u64 },
}

/// Umbrella error for request handling.
#[derive(Debug, Error)]
pub enum CopilotError {
    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Report(#[from] ReportError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Storage error: {0}")]
    Storage(#[source] anyhow::Error),

    #[error("Export error: {0}")]
    Export(#[source] anyhow::Error),
}

impl CopilotError {
    /// True for failures caused by the caller's input.
    pub fn is_client_error(&self) -> bool {
        match self {
            CopilotError::Query(_) | CopilotError::Report(_) => true,
            CopilotError::Auth(e) => !matches!(
                e,
                AuthError::Issue(_) | AuthError::LifetimeOverflow { .. }
            ),
            CopilotError::Storage(_) | CopilotError::Export(_) => false,
        }
    }
}
