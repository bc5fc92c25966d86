//! Helpers for running a handler against a scripted transport.
//!
//! Each helper serves one scope to completion and returns the handler's
//! result together with the transport, so tests can inspect both the
//! outcome and the exact messages sent.

use bytes::Bytes;
use gateway_bridge::{ConnectionScope, GatewayHandler, HandlerError, InboundEvent, OutboundMessage};

use crate::transport::ScriptedTransport;

/// Outcome of serving one scope.
#[derive(Debug)]
pub struct DriveResult {
    /// What [`GatewayHandler::handle`] returned.
    pub result: Result<(), HandlerError>,
    /// The transport after the handler finished.
    pub transport: ScriptedTransport,
}

impl DriveResult {
    /// Messages the handler sent.
    #[must_use]
    pub fn sent(&self) -> &[OutboundMessage] { self.transport.sent() }

    /// The sent response, if a start message was sent.
    #[must_use]
    pub fn response(&self) -> Option<CollectedResponse> { CollectedResponse::from_messages(self.sent()) }
}

/// A response reassembled from outbound messages.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CollectedResponse {
    /// Status from the start message.
    pub status: u16,
    /// Headers from the start message.
    pub headers: Vec<(Bytes, Bytes)>,
    /// Body messages as `(payload, more_body)` in send order.
    pub chunks: Vec<(Bytes, bool)>,
}

impl CollectedResponse {
    /// Rebuild a response from `messages`; `None` without a start message.
    #[must_use]
    pub fn from_messages(messages: &[OutboundMessage]) -> Option<Self> {
        let mut messages = messages.iter();
        let Some(OutboundMessage::ResponseStart { status, headers }) = messages.next() else {
            return None;
        };
        let chunks = messages
            .filter_map(|message| match message {
                OutboundMessage::ResponseBody { body, more_body } => {
                    Some((body.clone(), *more_body))
                }
                OutboundMessage::ResponseStart { .. } => None,
            })
            .collect();
        Some(Self {
            status: *status,
            headers: headers.clone(),
            chunks,
        })
    }

    /// Concatenated body bytes.
    #[must_use]
    pub fn body(&self) -> Vec<u8> {
        self.chunks
            .iter()
            .flat_map(|(chunk, _)| chunk.iter().copied())
            .collect()
    }

    /// Value of the first header named `name`, compared case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&[u8]> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name.as_bytes()))
            .map(|(_, value)| value.as_ref())
    }
}

/// Split `body` into request events of at most `chunk_size` bytes.
///
/// An empty body becomes one empty final event.
///
/// # Panics
///
/// Panics if `chunk_size` is zero.
#[must_use]
pub fn body_events(body: &[u8], chunk_size: usize) -> Vec<InboundEvent> {
    assert!(chunk_size > 0, "chunk_size must be non-zero");
    if body.is_empty() {
        return vec![InboundEvent::last(Bytes::new())];
    }
    let parts: Vec<&[u8]> = body.chunks(chunk_size).collect();
    let last = parts.len() - 1;
    parts
        .into_iter()
        .enumerate()
        .map(|(index, part)| {
            let part = Bytes::copy_from_slice(part);
            if index == last {
                InboundEvent::last(part)
            } else {
                InboundEvent::chunk(part)
            }
        })
        .collect()
}

/// Serve `scope` with the given inbound `events`.
pub async fn drive(
    handler: &GatewayHandler,
    scope: ConnectionScope,
    events: impl IntoIterator<Item = InboundEvent>,
) -> DriveResult {
    drive_transport(handler, scope, ScriptedTransport::new(events)).await
}

/// Serve `scope` with `body` delivered in `chunk_size` pieces.
pub async fn drive_body(
    handler: &GatewayHandler,
    scope: ConnectionScope,
    body: &[u8],
    chunk_size: usize,
) -> DriveResult {
    drive(handler, scope, body_events(body, chunk_size)).await
}

/// Serve `scope` over a preconfigured `transport`.
pub async fn drive_transport(
    handler: &GatewayHandler,
    scope: ConnectionScope,
    mut transport: ScriptedTransport,
) -> DriveResult {
    let result = handler.handle(scope, &mut transport).await;
    DriveResult { result, transport }
}
