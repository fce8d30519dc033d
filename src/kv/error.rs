//! Errors produced by the key-value medium.

use tokio::time::error::Elapsed;

use crate::retry::Retryable;

/// Classification of a key-value failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KvErrorKind {
    /// The connection could not be established; the command was not sent.
    Connection,
    /// The request did not complete in time.
    Timeout,
    /// The endpoint answered with a 5xx or 429 status.
    Unavailable,
    /// The bearer token was rejected.
    Unauthorized,
    /// The command itself was rejected (bad arguments, wrong type).
    Command,
    /// A value or response could not be (de)serialized.
    Serialization,
}

/// Error returned by [`super::KvStore`] operations.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind:?}: {message}")]
pub struct KvError {
    /// Failure class, drives retry decisions.
    pub kind: KvErrorKind,
    /// Human-readable detail.
    pub message: String,
}

impl KvError {
    /// Creates an error of the given kind.
    pub fn new(kind: KvErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Shorthand for a [`KvErrorKind::Serialization`] error.
    pub fn serialization(err: impl std::fmt::Display) -> Self {
        Self::new(KvErrorKind::Serialization, err.to_string())
    }
}

impl Retryable for KvError {
    fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            KvErrorKind::Connection | KvErrorKind::Timeout | KvErrorKind::Unavailable
        )
    }

    fn is_unsent(&self) -> bool {
        self.kind == KvErrorKind::Connection
    }
}

impl From<Elapsed> for KvError {
    fn from(_: Elapsed) -> Self {
        Self::new(KvErrorKind::Timeout, "attempt timed out")
    }
}

impl From<reqwest::Error> for KvError {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            KvErrorKind::Timeout
        } else if err.is_connect() {
            KvErrorKind::Connection
        } else if err.is_request() {
            KvErrorKind::Unavailable
        } else if err.is_decode() {
            KvErrorKind::Serialization
        } else {
            match err.status() {
                Some(s) if s.as_u16() == 401 || s.as_u16() == 403 => KvErrorKind::Unauthorized,
                Some(s) if s.is_server_error() || s.as_u16() == 429 => KvErrorKind::Unavailable,
                _ => KvErrorKind::Command,
            }
        };
        Self::new(kind, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_failures_are_retryable() {
        assert!(KvError::new(KvErrorKind::Connection, "refused").is_retryable());
        assert!(KvError::new(KvErrorKind::Timeout, "slow").is_retryable());
        assert!(KvError::new(KvErrorKind::Unavailable, "503").is_retryable());
    }

    #[test]
    fn logical_failures_are_not_retryable() {
        assert!(!KvError::new(KvErrorKind::Unauthorized, "bad token").is_retryable());
        assert!(!KvError::new(KvErrorKind::Command, "WRONGTYPE").is_retryable());
        assert!(!KvError::serialization("trailing comma").is_retryable());
    }

    #[test]
    fn only_connection_failures_are_unsent() {
        assert!(KvError::new(KvErrorKind::Connection, "refused").is_unsent());
        assert!(!KvError::new(KvErrorKind::Timeout, "slow").is_unsent());
        assert!(!KvError::new(KvErrorKind::Unavailable, "503").is_unsent());
    }

    #[test]
    fn display_includes_kind_and_message() {
        let err = KvError::new(KvErrorKind::Command, "ERR syntax error");
        assert_eq!(err.to_string(), "Command: ERR syntax error");
    }
}
