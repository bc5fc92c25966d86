//! Response encoding onto the gateway transport.
//!
//! A response becomes exactly one [`OutboundMessage::ResponseStart`] followed
//! by body messages:
//!
//! - in-memory bodies are chunked, with the continuation flag cleared on the last chunk (an empty
//!   body still sends one empty, final message);
//! - streamed and reader-backed bodies send every chunk with the flag set, then one empty message
//!   with the flag cleared.
//!
//! The response's close hooks run exactly once however encoding ends.

use std::num::NonZeroUsize;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use log::warn;
use tokio_util::io::ReaderStream;

use crate::{
    chunk::chunk_bytes,
    config::BridgeConfig,
    error::SendError,
    message::{HeaderPair, OutboundMessage},
    response::{Response, ResponseBody, ResponseHead},
    transport::Transport,
};

/// Header name used for each response cookie.
pub const SET_COOKIE: &str = "Set-Cookie";

/// Serializes responses into transport messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResponseEncoder {
    chunk_size: NonZeroUsize,
    file_chunk_size: NonZeroUsize,
}

impl ResponseEncoder {
    /// Encoder with explicit chunk sizes.
    ///
    /// `file_chunk_size` is raised to `chunk_size` if smaller.
    #[must_use]
    pub fn new(chunk_size: NonZeroUsize, file_chunk_size: NonZeroUsize) -> Self {
        Self {
            chunk_size,
            file_chunk_size: file_chunk_size.max(chunk_size),
        }
    }

    /// Encoder using the chunk sizes in `config`.
    #[must_use]
    pub fn from_config(config: &BridgeConfig) -> Self {
        Self::new(config.chunk_size_limit(), config.file_chunk_size_limit())
    }

    /// Send `response` over `transport`, then run its close hooks.
    ///
    /// # Errors
    ///
    /// Returns [`SendError`] if a header cannot be encoded, a body stream
    /// fails or the transport rejects a message. The close hooks run in every
    /// case.
    pub async fn send_response<T>(
        &self,
        response: Response,
        transport: &mut T,
    ) -> Result<(), SendError>
    where
        T: Transport + ?Sized,
    {
        let (head, body, guard) = response.into_parts();
        let result = self.send_parts(head, body, transport).await;
        guard.close();
        result
    }

    async fn send_parts<T>(
        &self,
        head: ResponseHead,
        body: ResponseBody,
        transport: &mut T,
    ) -> Result<(), SendError>
    where
        T: Transport + ?Sized,
    {
        let headers = encode_headers(&head)?;
        send(
            transport,
            OutboundMessage::ResponseStart {
                status: head.status,
                headers,
            },
        )
        .await?;

        match body {
            ResponseBody::Full(bytes) => {
                for chunk in chunk_bytes(bytes, self.chunk_size) {
                    send(
                        transport,
                        OutboundMessage::ResponseBody {
                            body: chunk.payload,
                            more_body: !chunk.is_last,
                        },
                    )
                    .await?;
                }
                Ok(())
            }
            ResponseBody::Stream(parts) => send_stream(transport, parts, self.chunk_size).await,
            ResponseBody::Reader(reader) => {
                let parts =
                    ReaderStream::with_capacity(reader, self.file_chunk_size.get());
                send_stream(transport, parts, self.file_chunk_size).await
            }
        }
    }
}

async fn send_stream<T, S>(
    transport: &mut T,
    parts: S,
    max: NonZeroUsize,
) -> Result<(), SendError>
where
    T: Transport + ?Sized,
    S: Stream<Item = std::io::Result<Bytes>> + Send,
{
    let mut parts = std::pin::pin!(parts);
    while let Some(part) = parts.next().await {
        let part = part.map_err(SendError::Body)?;
        for chunk in chunk_bytes(part, max) {
            send(
                transport,
                OutboundMessage::ResponseBody {
                    body: chunk.payload,
                    more_body: true,
                },
            )
            .await?;
        }
    }
    send(
        transport,
        OutboundMessage::ResponseBody {
            body: Bytes::new(),
            more_body: false,
        },
    )
    .await
}

async fn send<T>(transport: &mut T, message: OutboundMessage) -> Result<(), SendError>
where
    T: Transport + ?Sized,
{
    transport.send(message).await.map_err(SendError::Transport)
}

/// Collect headers and cookies as raw byte pairs.
///
/// Header names keep the case they were given. Names must be ASCII and
/// values latin-1; each cookie becomes one `Set-Cookie` pair.
///
/// # Errors
///
/// Returns [`SendError::HeaderEncoding`] for the first header that cannot be
/// encoded.
pub fn encode_headers(head: &ResponseHead) -> Result<Vec<HeaderPair>, SendError> {
    let mut pairs = Vec::with_capacity(head.headers.len() + head.cookies.len());
    for (name, value) in &head.headers {
        pairs.push(encode_pair(name, value)?);
    }
    for cookie in &head.cookies {
        pairs.push(encode_pair(SET_COOKIE, cookie.header_value().trim())?);
    }
    Ok(pairs)
}

fn encode_pair(name: &str, value: &str) -> Result<HeaderPair, SendError> {
    let encoding_error = || {
        warn!("response header cannot be encoded: name={name}");
        SendError::HeaderEncoding {
            name: name.to_owned(),
        }
    };
    if !name.is_ascii() {
        return Err(encoding_error());
    }
    let value = value
        .chars()
        .map(|c| u8::try_from(u32::from(c)).ok())
        .collect::<Option<Vec<u8>>>()
        .ok_or_else(encoding_error)?;
    Ok((Bytes::copy_from_slice(name.as_bytes()), Bytes::from(value)))
}

#[cfg(test)]
mod tests;
