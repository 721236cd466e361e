//! Errors produced while talking to an HTTP API.

use std::error::Error as _;
use std::io;

use reqwest::StatusCode;

#[derive(thiserror::Error, Debug)]
/// Why a request produced no usable JSON.
pub enum FetchError {
    /// The request did not complete within the configured timeout.
    #[error("Request timeout: {url}")]
    Timeout {
        /// Requested URL.
        url: String,
    },
    /// No connection could be established, or the peer dropped it before answering.
    #[error("Connection error: {url}: {message}")]
    Connect {
        /// Requested URL.
        url: String,
        /// Transport error description.
        message: String,
    },
    /// The server answered with a non-success status.
    #[error("HTTP error {status}: {url}")]
    Status {
        /// Requested URL.
        url: String,
        /// Status returned by the server.
        status: StatusCode,
    },
    /// The body was not valid JSON.
    #[error("Invalid JSON response from {url}: {source}")]
    Decode {
        /// Requested URL.
        url: String,
        /// Parser error.
        #[source]
        source: serde_json::Error,
    },
    /// A header name or value was rejected.
    #[error("Invalid header: {name}")]
    InvalidHeader {
        /// Offending header name.
        name: String,
    },
    /// The underlying HTTP client could not be built.
    #[error("Failed to build HTTP client: {0}")]
    Setup(#[source] reqwest::Error),
    /// Anything else the transport reported.
    #[error("Unexpected error: {url}: {message}")]
    Other {
        /// Requested URL.
        url: String,
        /// Transport error description.
        message: String,
    },
}

impl FetchError {
    /// Whether repeating the request may succeed: timeouts and connection failures.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Connect { .. })
    }

    /// HTTP status, when the server answered with an error status.
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Classify a reqwest error raised while requesting `url`.
    pub(crate) fn from_reqwest(url: &str, err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                url: url.to_owned(),
            }
        } else if err.is_connect() || connection_dropped(err) {
            Self::Connect {
                url: url.to_owned(),
                message: err.to_string(),
            }
        } else {
            Self::Other {
                url: url.to_owned(),
                message: err.to_string(),
            }
        }
    }
}

/// Whether the peer closed or reset the connection before a full response arrived.
fn connection_dropped(err: &reqwest::Error) -> bool {
    std::iter::successors(err.source(), |&cause| cause.source()).any(|cause| {
        if let Some(io_err) = cause.downcast_ref::<io::Error>() {
            return matches!(
                io_err.kind(),
                io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
                    | io::ErrorKind::UnexpectedEof
            );
        }
        cause
            .downcast_ref::<hyper::Error>()
            .is_some_and(|hyper_err| hyper_err.is_incomplete_message() || hyper_err.is_closed())
    })
}
