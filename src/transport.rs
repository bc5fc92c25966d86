//! Gateway transport abstraction.
//!
//! The adapter never touches sockets. It pulls [`InboundEvent`]s and pushes
//! [`OutboundMessage`]s through a [`Transport`], which the hosting gateway
//! implements. [`ChannelTransport`] is a ready-made implementation backed by
//! bounded `tokio` channels for servers that run the adapter in its own task.

use std::io;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::message::{InboundEvent, OutboundMessage};

/// Receive/send contract for one HTTP connection.
#[async_trait]
pub trait Transport: Send {
    /// Wait for the next inbound event.
    ///
    /// # Errors
    ///
    /// Returns an I/O error when the gateway can no longer deliver events.
    async fn receive(&mut self) -> io::Result<InboundEvent>;

    /// Send one outbound message.
    ///
    /// # Errors
    ///
    /// Returns an I/O error when the gateway refuses or cannot deliver the
    /// message.
    async fn send(&mut self, message: OutboundMessage) -> io::Result<()>;
}

/// Default capacity for [`channel`] queues.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 16;

/// Adapter-side half of a channel transport.
#[derive(Debug)]
pub struct ChannelTransport {
    inbound: mpsc::Receiver<InboundEvent>,
    outbound: mpsc::Sender<OutboundMessage>,
}

/// Gateway-side half of a channel transport.
///
/// Feeds inbound events to the adapter and collects its outbound messages.
#[derive(Debug)]
pub struct ChannelPeer {
    inbound: mpsc::Sender<InboundEvent>,
    outbound: mpsc::Receiver<OutboundMessage>,
}

/// Create a connected transport pair with queues holding `capacity` messages.
///
/// # Panics
///
/// Panics if `capacity` is zero, mirroring [`tokio::sync::mpsc::channel`].
///
/// ```
/// use gateway_bridge::{
///     message::InboundEvent,
///     transport::{Transport, channel},
/// };
///
/// # async fn demo() -> std::io::Result<()> {
/// let (mut transport, peer) = channel(4);
/// peer.deliver(InboundEvent::last(&b"hi"[..])).await?;
/// assert_eq!(transport.receive().await?, InboundEvent::last(&b"hi"[..]));
/// # Ok(())
/// # }
/// ```
#[must_use]
pub fn channel(capacity: usize) -> (ChannelTransport, ChannelPeer) {
    let (in_tx, in_rx) = mpsc::channel(capacity);
    let (out_tx, out_rx) = mpsc::channel(capacity);
    (
        ChannelTransport {
            inbound: in_rx,
            outbound: out_tx,
        },
        ChannelPeer {
            inbound: in_tx,
            outbound: out_rx,
        },
    )
}

#[async_trait]
impl Transport for ChannelTransport {
    /// A closed inbound queue is reported as [`InboundEvent::Disconnect`].
    async fn receive(&mut self) -> io::Result<InboundEvent> {
        Ok(self
            .inbound
            .recv()
            .await
            .unwrap_or(InboundEvent::Disconnect))
    }

    async fn send(&mut self, message: OutboundMessage) -> io::Result<()> {
        self.outbound
            .send(message)
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "gateway peer dropped"))
    }
}

impl ChannelPeer {
    /// Deliver an inbound event to the adapter.
    ///
    /// # Errors
    ///
    /// Returns [`io::ErrorKind::BrokenPipe`] if the adapter half was dropped.
    pub async fn deliver(&self, event: InboundEvent) -> io::Result<()> {
        self.inbound
            .send(event)
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "adapter dropped"))
    }

    /// Wait for the next outbound message; `None` once the adapter is gone.
    pub async fn next_message(&mut self) -> Option<OutboundMessage> { self.outbound.recv().await }

    /// Collect outbound messages up to and including the final body message.
    ///
    /// Stops early if the adapter drops its half.
    pub async fn collect_response(&mut self) -> Vec<OutboundMessage> {
        let mut messages = Vec::new();
        while let Some(message) = self.outbound.recv().await {
            let done = message.is_final();
            messages.push(message);
            if done {
                break;
            }
        }
        messages
    }
}
