//! Failure taxonomy for a single script step.
//!
//! A `ProbeError` never aborts a script. The registry turns it into
//! [`Outcome::Failure`](crate::handlers::Outcome) and the transcript shows it
//! inline at the step where it happened.

use std::time::Duration;

use thiserror::Error;

use crate::handlers::Verb;

/// Everything a handler or one of its collaborators can fail with.
#[derive(Error, Debug)]
pub enum ProbeError {
    /// A required positional argument was not given.
    #[error("{verb}: missing argument <{name}>")]
    MissingArg { verb: Verb, name: &'static str },

    /// An argument was present but unusable.
    #[error("{verb}: {detail}")]
    InvalidArg { verb: Verb, detail: String },

    /// A raw TCP connection could not be established.
    #[error("connect to {target} failed: {source}")]
    Connect {
        target: String,
        #[source]
        source: std::io::Error,
    },

    /// An operation exceeded its time budget.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// Local filesystem errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Outbound HTTP client errors (connect, TLS, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Relational query errors.
    #[error("SQL error: {0}")]
    Sql(#[from] rusqlite::Error),

    /// Key-value store errors.
    #[error("key-value store error: {0}")]
    KeyValue(String),

    /// Blob store errors, including non-success service responses.
    #[error("blob store error: {0}")]
    Blob(String),

    /// Resolver errors.
    #[error("DNS error: {0}")]
    Dns(String),
}

impl ProbeError {
    pub fn invalid(verb: Verb, detail: impl Into<String>) -> Self {
        Self::InvalidArg {
            verb,
            detail: detail.into(),
        }
    }

    pub fn blob(msg: impl Into<String>) -> Self {
        Self::Blob(msg.into())
    }
}

impl From<redis::RedisError> for ProbeError {
    fn from(e: redis::RedisError) -> Self {
        Self::KeyValue(e.to_string())
    }
}

impl From<hickory_resolver::error::ResolveError> for ProbeError {
    fn from(e: hickory_resolver::error::ResolveError) -> Self {
        Self::Dns(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_arg_names_verb_and_argument() {
        let err = ProbeError::MissingArg {
            verb: Verb::Tcp,
            name: "port",
        };
        assert_eq!(err.to_string(), "TCP: missing argument <port>");
    }

    #[test]
    fn timeout_reports_the_budget() {
        let err = ProbeError::Timeout(Duration::from_millis(30_500));
        assert_eq!(err.to_string(), "timed out after 30.5s");
        let err = ProbeError::Timeout(Duration::from_millis(200));
        assert_eq!(err.to_string(), "timed out after 200ms");
    }

    #[test]
    fn connect_includes_target_and_cause() {
        let err = ProbeError::Connect {
            target: "db:5432".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused"),
        };
        assert_eq!(err.to_string(), "connect to db:5432 failed: refused");
    }
}
