//! Messages exchanged with the gateway transport.
//!
//! Inbound events describe body delivery and disconnects for one HTTP
//! connection. Outbound messages frame a response as a single
//! [`OutboundMessage::ResponseStart`] followed by one or more
//! [`OutboundMessage::ResponseBody`] messages; the first body message whose
//! continuation flag is `false` ends the response.

use bytes::Bytes;

/// Event received from the gateway for an in-flight request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InboundEvent {
    /// A slice of the request body (`http.request`).
    Request {
        /// Body bytes carried by this event. May be empty.
        body: Bytes,
        /// Whether further body events follow.
        more_body: bool,
    },
    /// The client went away (`http.disconnect`).
    Disconnect,
}

impl InboundEvent {
    /// Body event with the continuation flag set.
    #[must_use]
    pub fn chunk(body: impl Into<Bytes>) -> Self {
        Self::Request {
            body: body.into(),
            more_body: true,
        }
    }

    /// Final body event.
    #[must_use]
    pub fn last(body: impl Into<Bytes>) -> Self {
        Self::Request {
            body: body.into(),
            more_body: false,
        }
    }

    /// Protocol type name of the event.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Request { .. } => "http.request",
            Self::Disconnect => "http.disconnect",
        }
    }
}

/// A header as raw `(name, value)` bytes.
pub type HeaderPair = (Bytes, Bytes);

/// Message sent to the gateway while encoding a response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutboundMessage {
    /// Status line and headers (`http.response.start`).
    ResponseStart {
        /// HTTP status code.
        status: u16,
        /// Header pairs in emission order, names cased as provided.
        headers: Vec<HeaderPair>,
    },
    /// A slice of the response body (`http.response.body`).
    ResponseBody {
        /// Body bytes for this message.
        body: Bytes,
        /// Whether further body messages follow.
        more_body: bool,
    },
}

impl OutboundMessage {
    /// Protocol type name of the message.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::ResponseStart { .. } => "http.response.start",
            Self::ResponseBody { .. } => "http.response.body",
        }
    }

    /// Whether this message closes the response.
    #[must_use]
    pub const fn is_final(&self) -> bool {
        matches!(
            self,
            Self::ResponseBody {
                more_body: false,
                ..
            }
        )
    }
}
