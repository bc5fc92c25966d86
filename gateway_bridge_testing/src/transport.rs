//! In-memory transport replaying scripted inbound events.

use std::{collections::VecDeque, io, time::Duration};

use async_trait::async_trait;
use gateway_bridge::{InboundEvent, OutboundMessage, Transport};

/// What [`ScriptedTransport::receive`] does once the script is used up.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Exhausted {
    /// Report a client disconnect.
    #[default]
    Disconnect,
    /// Never return, as a client that stopped sending would.
    Stall,
}

/// Transport that replays queued events and records sent messages.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    inbound: VecDeque<InboundEvent>,
    sent: Vec<OutboundMessage>,
    receives: usize,
    delay: Option<Duration>,
    exhausted: Exhausted,
    fail_sends_after: Option<usize>,
}

impl ScriptedTransport {
    /// Transport replaying `events` in order.
    #[must_use]
    pub fn new(events: impl IntoIterator<Item = InboundEvent>) -> Self {
        Self {
            inbound: events.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Sleep for `delay` before delivering each event.
    #[must_use]
    pub fn delay_each(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Behaviour once every scripted event was delivered.
    #[must_use]
    pub fn when_exhausted(mut self, exhausted: Exhausted) -> Self {
        self.exhausted = exhausted;
        self
    }

    /// Accept `count` messages, then fail every send with `BrokenPipe`.
    #[must_use]
    pub fn fail_sends_after(mut self, count: usize) -> Self {
        self.fail_sends_after = Some(count);
        self
    }

    /// Number of `receive` calls made so far.
    #[must_use]
    pub fn receives(&self) -> usize { self.receives }

    /// Events not yet delivered.
    #[must_use]
    pub fn remaining(&self) -> usize { self.inbound.len() }

    /// Messages accepted so far.
    #[must_use]
    pub fn sent(&self) -> &[OutboundMessage] { &self.sent }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn receive(&mut self) -> io::Result<InboundEvent> {
        self.receives += 1;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match self.inbound.pop_front() {
            Some(event) => Ok(event),
            None if self.exhausted == Exhausted::Stall => std::future::pending().await,
            None => Ok(InboundEvent::Disconnect),
        }
    }

    async fn send(&mut self, message: OutboundMessage) -> io::Result<()> {
        if self.fail_sends_after.is_some_and(|limit| self.sent.len() >= limit) {
            log::debug!("scripted send failure: message={}", message.type_name());
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "scripted send failure"));
        }
        self.sent.push(message);
        Ok(())
    }
}
