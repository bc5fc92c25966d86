//! Error types raised across the adapter.
//!
//! Body reception, request construction and response encoding each have
//! their own enum. Only [`HandlerError`] leaves the adapter; everything else
//! is translated into an HTTP response or an abort by [`crate::translate`].

use std::{io, num::NonZeroUsize, str::Utf8Error, time::Duration};

use thiserror::Error;

/// Error type returned by application pipelines and error handlers.
pub type PipelineError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failures while draining the request body from the transport.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BodyError {
    /// The client disconnected before the body was complete.
    #[error("client disconnected before the request body was complete")]
    Aborted,
    /// The body exceeds the configured in-memory ceiling.
    #[error("request body of {attempted} bytes exceeds the limit of {limit} bytes")]
    TooLarge {
        /// Declared or accumulated size that tripped the check.
        attempted: usize,
        /// Configured ceiling.
        limit: NonZeroUsize,
    },
    /// The body was not complete within the receive timeout.
    #[error("request body not received within {limit:?}")]
    Timeout {
        /// Configured timeout.
        limit: Duration,
    },
    /// The transport failed while delivering events.
    #[error("transport error while receiving body: {0}")]
    Transport(#[from] io::Error),
}

/// Failures while building a request from its scope.
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum RequestError {
    /// An eagerly decoded scope field held invalid bytes.
    #[error("invalid encoding in {field}: {source}")]
    Decode {
        /// Scope field that failed to decode.
        field: &'static str,
        /// Underlying decode failure.
        #[source]
        source: Utf8Error,
    },
}

/// Failures while encoding a response onto the transport.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SendError {
    /// Sending a message failed.
    #[error("transport error while sending response: {0}")]
    Transport(#[source] io::Error),
    /// A streaming body yielded an error.
    #[error("response body stream failed: {0}")]
    Body(#[source] io::Error),
    /// A header value contained characters outside latin-1.
    #[error("header {name} has a value that cannot be encoded as latin-1")]
    HeaderEncoding {
        /// Offending header name.
        name: String,
    },
}

/// Errors surfaced by [`crate::handler::GatewayHandler::handle`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HandlerError {
    /// The scope does not describe an HTTP connection.
    #[error("only http connections are served, not {0}")]
    UnsupportedScope(String),
    /// The request was abandoned without a response.
    #[error("request aborted: {0}")]
    Aborted(#[source] BodyError),
    /// Encoding the response failed.
    #[error(transparent)]
    Send(#[from] SendError),
}

impl HandlerError {
    /// Whether the request ended because the client went away.
    #[must_use]
    pub fn is_disconnect(&self) -> bool { matches!(self, Self::Aborted(BodyError::Aborted)) }
}
