//! Service-agnostic NLU abstractions.
//!
//! This crate defines the shapes every NLU provider integration speaks:
//! labeled utterances, entity mentions and entity type definitions, plus the
//! classified error a provider call returns when the remote service rejects it.

mod utterance;

pub use utterance::{Entity, EntityType, EntityTypeKind, LabeledUtterance, SynonymSet};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Coarse classification of a failed remote call.
///
/// Retry policies key their delays on this value, so providers must map their
/// native error signals (HTTP status, exception type) onto it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteErrorKind {
    /// Another modification of the same resource is in flight.
    Conflict,
    /// The provider throttled the request.
    RateLimited,
    /// The addressed resource does not exist.
    NotFound,
    /// The provider failed internally.
    ServerError,
    /// Credentials were missing or rejected.
    Unauthorized,
    /// The request was malformed or semantically invalid.
    BadRequest,
    /// The request never produced an HTTP response.
    Network,
    /// Anything else.
    Other,
}

impl RemoteErrorKind {
    /// Classifies an HTTP status code.
    ///
    /// 501 and 505 are permanent server errors and fall through to `Other`.
    pub fn from_status(status: u16) -> Self {
        match status {
            409 => Self::Conflict,
            429 => Self::RateLimited,
            404 => Self::NotFound,
            401 | 403 => Self::Unauthorized,
            400 | 422 => Self::BadRequest,
            501 | 505 => Self::Other,
            500..=599 => Self::ServerError,
            _ => Self::Other,
        }
    }
}

impl fmt::Display for RemoteErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Conflict => "conflict",
            Self::RateLimited => "rate limited",
            Self::NotFound => "not found",
            Self::ServerError => "server error",
            Self::Unauthorized => "unauthorized",
            Self::BadRequest => "bad request",
            Self::Network => "network",
            Self::Other => "error",
        };
        f.write_str(name)
    }
}

/// A failed call to an NLU provider.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{service} {kind}{}: {message}", .status.map(|s| format!(" ({s})")).unwrap_or_default())]
pub struct RemoteError {
    /// Provider that produced the error (e.g., "lex", "luis").
    pub service: String,
    /// Classified kind.
    pub kind: RemoteErrorKind,
    /// HTTP status, when a response was received.
    pub status: Option<u16>,
    /// Provider message or transport error text.
    pub message: String,
    /// Provider-suggested delay before retrying.
    pub retry_after: Option<Duration>,
}

impl RemoteError {
    pub fn new(service: impl Into<String>, kind: RemoteErrorKind, message: impl Into<String>) -> Self {
        Self { service: service.into(), kind, status: None, message: message.into(), retry_after: None }
    }

    /// Builds an error from an HTTP status and response body.
    pub fn from_status(service: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            kind: RemoteErrorKind::from_status(status),
            status: Some(status),
            message: message.into(),
            retry_after: None,
        }
    }

    #[must_use]
    pub fn with_retry_after(mut self, retry_after: Option<Duration>) -> Self {
        self.retry_after = retry_after;
        self
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == RemoteErrorKind::NotFound
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert_eq!(RemoteErrorKind::from_status(409), RemoteErrorKind::Conflict);
        assert_eq!(RemoteErrorKind::from_status(429), RemoteErrorKind::RateLimited);
        assert_eq!(RemoteErrorKind::from_status(404), RemoteErrorKind::NotFound);
        assert_eq!(RemoteErrorKind::from_status(503), RemoteErrorKind::ServerError);
        assert_eq!(RemoteErrorKind::from_status(501), RemoteErrorKind::Other);
        assert_eq!(RemoteErrorKind::from_status(505), RemoteErrorKind::Other);
        assert_eq!(RemoteErrorKind::from_status(403), RemoteErrorKind::Unauthorized);
    }

    #[test]
    fn test_display_includes_status() {
        let err = RemoteError::from_status("lex", 409, "bot is being modified");
        assert_eq!(err.to_string(), "lex conflict (409): bot is being modified");

        let err = RemoteError::new("luis", RemoteErrorKind::Network, "connection reset");
        assert_eq!(err.to_string(), "luis network: connection reset");
    }
}
