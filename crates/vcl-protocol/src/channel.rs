//! # Channels
//!
//! The handshake is transport-agnostic. [`MemoryChannel::pair`] connects two
//! in-process parties with bounded tokio queues.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::ChannelError;
use crate::message::IssuanceMessage;

/// Bidirectional, ordered message pipe to one counterparty.
#[async_trait]
pub trait Channel: Send {
    /// Deliver `msg` to the counterparty.
    async fn send(&mut self, msg: IssuanceMessage) -> Result<(), ChannelError>;

    /// Next message from the counterparty.
    async fn receive(&mut self) -> Result<IssuanceMessage, ChannelError>;
}

/// One end of an in-memory channel.
#[derive(Debug)]
pub struct MemoryChannel {
    tx: mpsc::Sender<IssuanceMessage>,
    rx: mpsc::Receiver<IssuanceMessage>,
}

impl MemoryChannel {
    /// Two connected ends, each buffering up to `capacity` messages.
    pub fn pair(capacity: usize) -> (Self, Self) {
        let (a_tx, b_rx) = mpsc::channel(capacity.max(1));
        let (b_tx, a_rx) = mpsc::channel(capacity.max(1));
        (
            Self { tx: a_tx, rx: a_rx },
            Self { tx: b_tx, rx: b_rx },
        )
    }
}

#[async_trait]
impl Channel for MemoryChannel {
    async fn send(&mut self, msg: IssuanceMessage) -> Result<(), ChannelError> {
        tracing::trace!(message = msg.name(), "channel send");
        self.tx.send(msg).await.map_err(|_| ChannelError::Closed)
    }

    async fn receive(&mut self) -> Result<IssuanceMessage, ChannelError> {
        self.rx.recv().await.ok_or(ChannelError::Closed)
    }
}
