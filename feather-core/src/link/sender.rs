use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::Result;
use crate::frame::{FINAL_TOKEN, clock};
use crate::link::chunker::ChunkPlan;
use crate::link::config::LinkConfig;
use crate::link::history::PacketHistory;
use crate::radio::Radio;

/// Pause after every frame so the transceiver stays within its duty cycle.
pub const DEFAULT_FRAME_DELAY: Duration = Duration::from_millis(100);

// ── ResendReport ─────────────────────────────────────────────────

/// Outcome of [`Link::resend`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResendReport {
    /// Indices whose frames went out again.
    pub resent: Vec<usize>,
    /// Indices with no frame in history.
    pub missing: Vec<usize>,
}

// ── Link ─────────────────────────────────────────────────────────

/// One session on the radio link: transport, runtime settings and history.
///
/// Sends are sequential. A transport failure is returned immediately and
/// nothing is retried here; the operator retries with RESEND or HISTORY.
pub struct Link {
    radio: Arc<dyn Radio>,
    config: LinkConfig,
    history: PacketHistory,
    frame_delay: Duration,
}

impl Link {
    pub fn new(radio: Arc<dyn Radio>, config: LinkConfig) -> Self {
        Self {
            radio,
            config: config.sanitized(),
            history: PacketHistory::new(),
            frame_delay: DEFAULT_FRAME_DELAY,
        }
    }

    pub fn with_frame_delay(mut self, delay: Duration) -> Self {
        self.frame_delay = delay;
        self
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut LinkConfig {
        &mut self.config
    }

    pub fn history(&self) -> &PacketHistory {
        &self.history
    }

    pub fn radio(&self) -> &Arc<dyn Radio> {
        &self.radio
    }

    /// Chunk `payload` under the current settings and transmit every frame.
    ///
    /// Returns the bytes put on the air, prefixes included.
    pub async fn send(&mut self, payload: &[u8]) -> Result<usize> {
        let plan = ChunkPlan::new(payload.len(), &self.config)?;
        let frames = plan.split(payload, &clock());
        debug!(
            "sending {} bytes as {} frame(s) of <= {} bytes",
            payload.len(),
            frames.len(),
            self.config.max_packet_size
        );

        let mut sent = 0;
        for frame in frames {
            sent += frame.len();
            self.transmit(frame).await?;
        }
        Ok(sent)
    }

    /// Send one operator-facing response line.
    pub async fn respond(&mut self, text: impl AsRef<str>) -> Result<usize> {
        self.send(text.as_ref().as_bytes()).await
    }

    /// Close the current transaction.
    pub async fn send_final_token(&mut self) -> Result<()> {
        self.transmit(FINAL_TOKEN.as_bytes().to_vec()).await
    }

    /// Retransmit recorded frames verbatim.
    ///
    /// Each missing index is reported to the peer and skipped; the rest
    /// still go out. Indices refer to history as it was on entry.
    pub async fn resend(&mut self, indices: &[usize]) -> Result<ResendReport> {
        let snapshot: Vec<(usize, Option<Vec<u8>>)> = indices
            .iter()
            .map(|&i| (i, self.history.get(i).map(<[u8]>::to_vec)))
            .collect();

        let mut report = ResendReport::default();
        for (index, frame) in snapshot {
            match frame {
                Some(frame) => {
                    debug!("resending packet {index}");
                    self.replay_frame(&frame).await?;
                    report.resent.push(index);
                }
                None => {
                    warn!("resend requested for unknown packet {index}");
                    self.respond(format!("Packet {index} not found in history."))
                        .await?;
                    report.missing.push(index);
                }
            }
        }
        Ok(report)
    }

    /// Retransmit the most recent `count` frames (all of them if fewer are
    /// retained). Returns how many went out.
    pub async fn replay_last(&mut self, count: usize) -> Result<usize> {
        let frames = self.history.last(count);
        self.replay(&frames).await
    }

    /// Retransmit previously recorded frames verbatim, in order.
    pub async fn replay(&self, frames: &[Vec<u8>]) -> Result<usize> {
        for frame in frames {
            self.replay_frame(frame).await?;
        }
        Ok(frames.len())
    }

    // ── Internal ─────────────────────────────────────────────────

    async fn transmit(&mut self, frame: Vec<u8>) -> Result<()> {
        if let Err(e) = self.radio.send_with_ack(&frame).await {
            warn!("frame of {} bytes not delivered: {e}", frame.len());
            return Err(e);
        }
        debug!("sent frame of {} bytes", frame.len());
        self.history.push(frame);
        self.pace().await;
        Ok(())
    }

    /// Replayed frames are already in history and are not recorded twice.
    async fn replay_frame(&self, frame: &[u8]) -> Result<()> {
        if let Err(e) = self.radio.send_with_ack(frame).await {
            warn!("replayed frame of {} bytes not delivered: {e}", frame.len());
            return Err(e);
        }
        self.pace().await;
        Ok(())
    }

    async fn pace(&self) {
        if !self.frame_delay.is_zero() {
            tokio::time::sleep(self.frame_delay).await;
        }
    }
}
