//! Base-station session.
//!
//! A background reader drains the radio into the [`Transcript`]; the
//! foreground issues commands and waits for each transaction's final token
//! through a [`TranscriptWatcher`](feather_core::TranscriptWatcher) with a
//! bounded timeout. A timeout abandons the wait only; the drone may still
//! be working and its late frames land in the transcript as usual.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use feather_core::transcript::reconstruct;
use feather_core::{
    FINAL_TOKEN, FeatherError, Radio, ReconstructOptions, Reconstruction, Result, Transcript,
};

use crate::config::StationConfig;

/// Receive poll interval of the background reader.
const READ_POLL: Duration = Duration::from_millis(200);

// ── Station ──────────────────────────────────────────────────────

/// One station-to-drone session.
pub struct Station {
    radio: Arc<dyn Radio>,
    transcript: Arc<Transcript>,
    options: ReconstructOptions,
    reply_timeout: Duration,
    reader: JoinHandle<()>,
}

impl Station {
    /// Open the transcript and start the background reader.
    pub async fn start(radio: Arc<dyn Radio>, config: &StationConfig) -> Result<Self> {
        let transcript = Arc::new(Transcript::open(&config.transcript.path).await?);
        info!("transcript at {}", transcript.path().display());

        let reader = tokio::spawn(read_loop(Arc::clone(&radio), Arc::clone(&transcript)));

        Ok(Self {
            radio,
            transcript,
            options: config.reconstruct_options(),
            reply_timeout: config.poll_timeout(),
            reader,
        })
    }

    /// Override how long [`transact`](Self::transact) waits.
    pub fn with_reply_timeout(mut self, timeout: Duration) -> Self {
        self.reply_timeout = timeout;
        self
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Record and send one command frame without waiting for replies.
    pub async fn issue(&self, command: &str) -> Result<()> {
        self.transcript.record_sent(command).await?;
        if let Err(e) = self.radio.send_with_ack(command.as_bytes()).await {
            warn!("failed to send {command:?}: {e}");
            return Err(e);
        }
        debug!("sent {command:?}");
        Ok(())
    }

    /// Send one command and wait for its final token.
    pub async fn transact(&self, command: &str) -> Result<()> {
        // Subscribe before sending so a fast reply cannot be missed.
        let mut watcher = self.transcript.subscribe();
        self.issue(command).await?;
        watcher.wait_for(FINAL_TOKEN, self.reply_timeout).await?;
        Ok(())
    }

    /// Ask the drone for a text-mode picture and rebuild it.
    pub async fn capture(&self) -> Result<Reconstruction> {
        self.transact("CAMERA text").await?;
        self.reconstruct().await
    }

    /// Rebuild an image from everything currently in the transcript.
    pub async fn reconstruct(&self) -> Result<Reconstruction> {
        reconstruct(self.transcript.path(), &self.options).await
    }

    /// Send every command in a script file, one transaction at a time.
    ///
    /// Blank lines and lines starting with `#` are skipped. A command whose
    /// reply times out is logged and the script moves on. Returns how many
    /// commands were sent.
    pub async fn run_script(&self, path: &Path) -> Result<usize> {
        let script = tokio::fs::read_to_string(path).await?;
        let mut sent = 0;
        for line in script_lines(&script) {
            info!("script: {line}");
            match self.transact(line).await {
                Ok(()) => {}
                Err(FeatherError::ReceiveTimeout(t)) => {
                    warn!("no {FINAL_TOKEN} for {line:?} within {t:?}");
                }
                Err(e) => return Err(e),
            }
            sent += 1;
        }
        Ok(sent)
    }
}

impl Drop for Station {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

/// Commands of a script, in order.
fn script_lines(script: &str) -> impl Iterator<Item = &str> {
    script
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
}

async fn read_loop(radio: Arc<dyn Radio>, transcript: Arc<Transcript>) {
    loop {
        match radio.receive(READ_POLL).await {
            Ok(Some(frame)) => match transcript.record_frame(&frame).await {
                Ok(line) => info!("{line}"),
                Err(e) => warn!("transcript write failed: {e}"),
            },
            Ok(None) => {}
            Err(FeatherError::ChannelClosed) => {
                warn!("drone link closed");
                break;
            }
            Err(e) => {
                warn!("receive error: {e}");
            }
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use feather_core::{Dispatcher, Link, LinkConfig, MemoryRadio};
    use tempfile::TempDir;

    fn config(dir: &TempDir) -> StationConfig {
        let mut config = StationConfig::default();
        config.transcript.path = dir.path().join("terminal.txt");
        config.image.text_output = dir.path().join("text.png");
        config.image.binary_output = dir.path().join("binary.png");
        config
    }

    /// A drone with only the builtin commands on the other end.
    fn spawn_drone(radio: MemoryRadio) {
        let radio: Arc<dyn Radio> = Arc::new(radio);
        tokio::spawn(async move {
            let dispatcher = Dispatcher::with_builtins();
            let mut link =
                Link::new(radio.clone(), LinkConfig::default()).with_frame_delay(Duration::ZERO);
            while let Ok(frame) = radio.receive(Duration::from_millis(20)).await {
                if let Some(frame) = frame {
                    let line = String::from_utf8_lossy(&frame).into_owned();
                    dispatcher.dispatch(&mut link, &line).await.unwrap();
                }
            }
        });
    }

    #[test]
    fn script_skips_blank_and_comment_lines() {
        let script = "# warm up\nSTATUS\n\n   \n  ECHO 2 hi  \n#CAMERA\nHELP\n";
        let lines: Vec<&str> = script_lines(script).collect();
        assert_eq!(lines, vec!["STATUS", "ECHO 2 hi", "HELP"]);
    }

    #[tokio::test]
    async fn transact_waits_for_final_token() {
        let dir = tempfile::tempdir().unwrap();
        let (drone, station) = MemoryRadio::pair();
        spawn_drone(drone);
        let station = Station::start(Arc::new(station), &config(&dir))
            .await
            .unwrap()
            .with_reply_timeout(Duration::from_secs(5));

        station.transact("STATUS").await.unwrap();

        let text = tokio::fs::read_to_string(station.transcript().path())
            .await
            .unwrap();
        assert!(text.starts_with("[SEND] STATUS\n"));
        assert!(text.ends_with("[RECEIVED #2] [13 bytes]: END_OF_STREAM\n"));
    }

    #[tokio::test]
    async fn silent_drone_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let (_drone, station) = MemoryRadio::pair();
        let station = Station::start(Arc::new(station), &config(&dir))
            .await
            .unwrap()
            .with_reply_timeout(Duration::from_millis(50));

        let err = station.transact("STATUS").await.unwrap_err();
        assert!(matches!(err, FeatherError::ReceiveTimeout(_)));
    }

    #[tokio::test]
    async fn script_runs_every_command_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("mission.txt");
        tokio::fs::write(&script, "STATUS\n# comment\nECHO 2 ping\n")
            .await
            .unwrap();

        let (drone, station) = MemoryRadio::pair();
        spawn_drone(drone);
        let station = Station::start(Arc::new(station), &config(&dir))
            .await
            .unwrap()
            .with_reply_timeout(Duration::from_secs(5));

        assert_eq!(station.run_script(&script).await.unwrap(), 2);

        let text = tokio::fs::read_to_string(station.transcript().path())
            .await
            .unwrap();
        let status = text.find("[SEND] STATUS").unwrap();
        let echo = text.find("[SEND] ECHO 2 ping").unwrap();
        assert!(status < echo);
        assert_eq!(text.matches("]: ping").count(), 2);
        assert_eq!(text.matches(FINAL_TOKEN).count(), 2);
    }

    #[tokio::test]
    async fn reconstruct_without_image_data() {
        let dir = tempfile::tempdir().unwrap();
        let (drone, station) = MemoryRadio::pair();
        spawn_drone(drone);
        let station = Station::start(Arc::new(station), &config(&dir))
            .await
            .unwrap()
            .with_reply_timeout(Duration::from_secs(5));

        station.transact("STATUS").await.unwrap();
        let err = station.reconstruct().await.unwrap_err();
        assert!(matches!(err, FeatherError::NoImageData));
    }
}
