//! Request body reception.
//!
//! [`BodyReceiver`] drains `http.request` events from a [`Transport`] into a
//! single buffer. The declared `Content-Length` is checked against the
//! configured ceiling before anything is read, the running total is checked
//! as chunks arrive, and the whole drain must finish before the receive
//! deadline. A disconnect at any point aborts the request.

use std::{num::NonZeroUsize, time::Duration};

use bytes::{Bytes, BytesMut};
use tokio::time::{Instant, timeout_at};

use crate::{
    config::BridgeConfig,
    error::BodyError,
    message::InboundEvent,
    transport::Transport,
};

/// Drains request bodies under a size ceiling and a deadline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BodyReceiver {
    max_body_size: Option<NonZeroUsize>,
    timeout: Duration,
}

impl BodyReceiver {
    /// Receiver with explicit limits.
    #[must_use]
    pub const fn new(max_body_size: Option<NonZeroUsize>, timeout: Duration) -> Self {
        Self {
            max_body_size,
            timeout,
        }
    }

    /// Receiver using the limits in `config`.
    #[must_use]
    pub const fn from_config(config: &BridgeConfig) -> Self {
        Self::new(
            config.max_body_size_limit(),
            config.body_receive_timeout_limit(),
        )
    }

    /// Receive the complete body for a request created at `started`.
    ///
    /// `declared_length` is the client's `Content-Length` (`0` when absent);
    /// it is checked before the first event is awaited.
    ///
    /// # Errors
    ///
    /// - [`BodyError::TooLarge`] if the declared or accumulated length exceeds the ceiling.
    /// - [`BodyError::Aborted`] if the client disconnects first.
    /// - [`BodyError::Timeout`] if the body is incomplete when the deadline passes.
    /// - [`BodyError::Transport`] if the transport fails.
    pub async fn receive<T>(
        &self,
        transport: &mut T,
        declared_length: usize,
        started: Instant,
    ) -> Result<Bytes, BodyError>
    where
        T: Transport + ?Sized,
    {
        self.check_size(declared_length)?;
        let deadline = started + self.timeout;
        match timeout_at(deadline, self.drain(transport)).await {
            Ok(result) => result,
            Err(_) => Err(BodyError::Timeout {
                limit: self.timeout,
            }),
        }
    }

    async fn drain<T>(&self, transport: &mut T) -> Result<Bytes, BodyError>
    where
        T: Transport + ?Sized,
    {
        let mut body = BytesMut::new();
        loop {
            match transport.receive().await? {
                InboundEvent::Disconnect => {
                    log::debug!(
                        "client disconnected during body reception: received={}",
                        body.len()
                    );
                    return Err(BodyError::Aborted);
                }
                InboundEvent::Request {
                    body: chunk,
                    more_body,
                } => {
                    if body.is_empty() && !more_body {
                        self.check_size(chunk.len())?;
                        return Ok(chunk);
                    }
                    self.check_size(body.len().saturating_add(chunk.len()))?;
                    body.extend_from_slice(&chunk);
                    if !more_body {
                        return Ok(body.freeze());
                    }
                }
            }
        }
    }

    fn check_size(&self, attempted: usize) -> Result<(), BodyError> {
        match self.max_body_size {
            Some(limit) if attempted > limit.get() => {
                Err(BodyError::TooLarge { attempted, limit })
            }
            _ => Ok(()),
        }
    }
}
