use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};

use crate::error::{FeatherError, Result};
use crate::frame::MAX_FRAME_SIZE;
use crate::radio::Radio;

/// One end of an in-process radio link.
///
/// Frames sent on one end arrive on the other in order. A send is
/// acknowledged as soon as the frame is queued for the peer, unless
/// [`set_nack`](Self::set_nack) forces failures.
#[derive(Debug)]
pub struct MemoryRadio {
    tx: mpsc::UnboundedSender<Vec<u8>>,
    rx: Mutex<mpsc::UnboundedReceiver<Vec<u8>>>,
    nack: AtomicBool,
}

impl MemoryRadio {
    /// Create two linked ends.
    pub fn pair() -> (Self, Self) {
        let (a_tx, b_rx) = mpsc::unbounded_channel();
        let (b_tx, a_rx) = mpsc::unbounded_channel();
        (Self::new(a_tx, a_rx), Self::new(b_tx, b_rx))
    }

    fn new(tx: mpsc::UnboundedSender<Vec<u8>>, rx: mpsc::UnboundedReceiver<Vec<u8>>) -> Self {
        Self {
            tx,
            rx: Mutex::new(rx),
            nack: AtomicBool::new(false),
        }
    }

    /// Make every following send fail as if the peer never acknowledged it.
    pub fn set_nack(&self, nack: bool) {
        self.nack.store(nack, Ordering::SeqCst);
    }

    /// Drain every frame that has already arrived, without waiting.
    pub async fn drain(&self) -> Vec<Vec<u8>> {
        let mut rx = self.rx.lock().await;
        let mut frames = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            frames.push(frame);
        }
        frames
    }
}

#[async_trait]
impl Radio for MemoryRadio {
    async fn send_with_ack(&self, frame: &[u8]) -> Result<()> {
        if frame.len() > MAX_FRAME_SIZE {
            return Err(FeatherError::FrameTooLarge {
                size: frame.len(),
                max: MAX_FRAME_SIZE,
            });
        }
        if self.nack.load(Ordering::SeqCst) {
            return Err(FeatherError::Nack);
        }
        self.tx.send(frame.to_vec()).map_err(|_| FeatherError::Nack)
    }

    async fn receive(&self, timeout: Duration) -> Result<Option<Vec<u8>>> {
        let mut rx = self.rx.lock().await;
        match tokio::time::timeout(timeout, rx.recv()).await {
            Ok(Some(frame)) => Ok(Some(frame)),
            Ok(None) => Err(FeatherError::ChannelClosed),
            Err(_) => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn frames_cross_in_order() {
        let (a, b) = MemoryRadio::pair();
        a.send_with_ack(b"one").await.unwrap();
        a.send_with_ack(b"two").await.unwrap();

        let wait = Duration::from_millis(50);
        assert_eq!(b.receive(wait).await.unwrap().unwrap(), b"one");
        assert_eq!(b.receive(wait).await.unwrap().unwrap(), b"two");
        assert!(b.receive(wait).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn forced_nack() {
        let (a, b) = MemoryRadio::pair();
        a.set_nack(true);
        assert!(matches!(a.send_with_ack(b"x").await, Err(FeatherError::Nack)));
        assert!(b.drain().await.is_empty());
    }

    #[tokio::test]
    async fn oversized_frame_rejected() {
        let (a, _b) = MemoryRadio::pair();
        let err = a.send_with_ack(&[0u8; 253]).await.unwrap_err();
        assert!(matches!(err, FeatherError::FrameTooLarge { size: 253, .. }));
    }

    #[tokio::test]
    async fn dropped_peer_closes_link() {
        let (a, b) = MemoryRadio::pair();
        drop(b);
        assert!(matches!(a.send_with_ack(b"x").await, Err(FeatherError::Nack)));
        assert!(matches!(
            a.receive(Duration::from_millis(10)).await,
            Err(FeatherError::ChannelClosed)
        ));
    }
}
