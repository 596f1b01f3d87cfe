//! Radio transport abstraction.
//!
//! The physical transceiver is out of scope; everything above it talks to
//! a [`Radio`], which offers exactly the two blocking primitives the link
//! needs: send one frame and wait for its ack, or wait a bounded time for
//! the next inbound frame.
//!
//! Two implementations ship with the crate:
//! - [`MemoryRadio`] - an in-process linked pair for tests and demos.
//! - [`TcpRadio`] - a radio bridge over TCP, framed by [`RadioCodec`].

pub mod codec;
pub mod connection;
pub mod memory;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

pub use codec::{RadioCodec, RadioFrame};
pub use connection::TcpRadio;
pub use memory::MemoryRadio;

/// A half-duplex, acknowledged packet link.
#[async_trait]
pub trait Radio: Send + Sync {
    /// Transmit one frame and wait for the peer's acknowledgment.
    ///
    /// Fails with [`FeatherError::Nack`](crate::FeatherError::Nack) when no
    /// ack arrives. Callers decide whether to retry.
    async fn send_with_ack(&self, frame: &[u8]) -> Result<()>;

    /// Wait up to `timeout` for the next inbound frame.
    ///
    /// `Ok(None)` means the timeout elapsed. A closed link is reported as
    /// [`FeatherError::ChannelClosed`](crate::FeatherError::ChannelClosed).
    async fn receive(&self, timeout: Duration) -> Result<Option<Vec<u8>>>;
}
