use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::sync::{Mutex, mpsc};
use tokio_util::codec::Framed;
use tracing::{debug, warn};

use crate::error::{FeatherError, Result};
use crate::radio::{Radio, RadioCodec, RadioFrame};

/// A radio bridge over a single TCP stream.
///
/// Background tasks own the socket: a writer drains outbound frames, a
/// reader routes acks to the pending sender and data frames to
/// [`receive`](Radio::receive), acknowledging each data frame on arrival.
#[derive(Debug)]
pub struct TcpRadio {
    // Channel to send frames to background writer task
    tx: mpsc::Sender<RadioFrame>,
    // Data frames from background reader task
    inbound: Mutex<mpsc::Receiver<Vec<u8>>>,
    // Acks from background reader task; the lock also serializes senders
    acks: Mutex<mpsc::Receiver<()>>,
    ack_timeout: Duration,
}

impl TcpRadio {
    pub fn new(stream: TcpStream, ack_timeout: Duration) -> Self {
        let (mut net_writer, mut net_reader) = Framed::new(stream, RadioCodec).split();

        // User -> Network
        let (user_tx, mut network_rx) = mpsc::channel::<RadioFrame>(64);

        // Network -> User
        let (inbound_tx, inbound_rx) = mpsc::channel(256);
        let (ack_tx, ack_rx) = mpsc::channel(16);

        // Writer task: User -> Network
        tokio::spawn(async move {
            while let Some(frame) = network_rx.recv().await {
                if let Err(e) = net_writer.send(frame).await {
                    warn!("radio bridge write error: {e}");
                    break;
                }
            }
        });

        // Reader task: Network -> User
        let ack_writer = user_tx.clone();
        tokio::spawn(async move {
            while let Some(result) = net_reader.next().await {
                match result {
                    Ok(RadioFrame::Data(payload)) => {
                        if ack_writer.send(RadioFrame::Ack).await.is_err() {
                            break;
                        }
                        if inbound_tx.send(payload.to_vec()).await.is_err() {
                            // receiver was dropped, stop reading
                            break;
                        }
                    }
                    Ok(RadioFrame::Ack) => {
                        // Nobody waiting means the ack is late; drop it.
                        let _ = ack_tx.try_send(());
                    }
                    Err(e) => {
                        warn!("radio bridge read error: {e}");
                        break;
                    }
                }
            }
            debug!("radio bridge reader finished");
        });

        Self {
            tx: user_tx,
            inbound: Mutex::new(inbound_rx),
            acks: Mutex::new(ack_rx),
            ack_timeout,
        }
    }

    pub async fn connect(addr: impl ToSocketAddrs, ack_timeout: Duration) -> std::io::Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        Ok(Self::new(stream, ack_timeout))
    }
}

#[async_trait]
impl Radio for TcpRadio {
    async fn send_with_ack(&self, frame: &[u8]) -> Result<()> {
        let mut acks = self.acks.lock().await;
        // Discard acks that arrived after an earlier send gave up.
        while acks.try_recv().is_ok() {}

        self.tx
            .send(RadioFrame::Data(Bytes::copy_from_slice(frame)))
            .await?;

        match tokio::time::timeout(self.ack_timeout, acks.recv()).await {
            Ok(Some(())) => Ok(()),
            Ok(None) => Err(FeatherError::ChannelClosed),
            Err(_) => Err(FeatherError::Nack),
        }
    }

    async fn receive(&self, timeout: Duration) -> Result<Option<Vec<u8>>> {
        let mut inbound = self.inbound.lock().await;
        match tokio::time::timeout(timeout, inbound.recv()).await {
            Ok(Some(frame)) => Ok(Some(frame)),
            Ok(None) => Err(FeatherError::ChannelClosed),
            Err(_) => Ok(None),
        }
    }
}
