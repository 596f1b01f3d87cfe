//! Base-station transcript of everything received over the link.
//!
//! ```text
//! [RECEIVED #1] [11 bytes]: → Drone ...
//! [RECEIVED #2] [13 bytes]: END_OF_STREAM
//! [RECEIVED #3] [6 bytes]: [BINARY DATA]
//! [SEND] CAMERA text
//! ```
//!
//! Every appended line is also broadcast, so a foreground caller can wait
//! for the end of a transaction through a [`TranscriptWatcher`] instead of
//! polling the file.

pub mod reconstruct;
pub mod scanner;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, broadcast};
use tracing::{debug, warn};

use crate::error::{FeatherError, Result};

pub use reconstruct::{ReconstructOptions, Reconstruction, reconstruct};
pub use scanner::{Candidates, extract};

const NOTIFY_CAPACITY: usize = 1024;

/// Append-only transcript file plus its line notifications.
#[derive(Debug)]
pub struct Transcript {
    path: PathBuf,
    file: Mutex<File>,
    seq: AtomicU64,
    notify: broadcast::Sender<String>,
}

impl Transcript {
    /// Open (or create) the transcript for appending.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        let (notify, _) = broadcast::channel(NOTIFY_CAPACITY);
        Ok(Self {
            path,
            file: Mutex::new(file),
            seq: AtomicU64::new(1),
            notify,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record one received frame and return the line written.
    pub async fn record_frame(&self, frame: &[u8]) -> Result<String> {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst);
        let payload = match std::str::from_utf8(frame) {
            Ok(text) => text.replace('\n', "\\n"),
            Err(_) => "[BINARY DATA]".to_string(),
        };
        let line = format!("[RECEIVED #{seq}] [{} bytes]: {payload}", frame.len());
        self.append(&line).await?;
        Ok(line)
    }

    /// Record a command issued by the station.
    pub async fn record_sent(&self, command: &str) -> Result<()> {
        self.append(&format!("[SEND] {command}")).await
    }

    /// Watch lines appended from now on.
    pub fn subscribe(&self) -> TranscriptWatcher {
        TranscriptWatcher {
            rx: self.notify.subscribe(),
        }
    }

    async fn append(&self, line: &str) -> Result<()> {
        {
            let mut file = self.file.lock().await;
            file.write_all(line.as_bytes()).await?;
            file.write_all(b"\n").await?;
            file.flush().await?;
        }
        // Nobody listening is fine.
        let _ = self.notify.send(line.to_string());
        Ok(())
    }
}

// ── TranscriptWatcher ────────────────────────────────────────────

/// Receives transcript lines appended after it was created.
#[derive(Debug)]
pub struct TranscriptWatcher {
    rx: broadcast::Receiver<String>,
}

impl TranscriptWatcher {
    /// Wait until a line containing `needle` is appended.
    ///
    /// Only the wait is bounded: whatever the remote side is still doing
    /// carries on after a timeout.
    pub async fn wait_for(&mut self, needle: &str, timeout: Duration) -> Result<String> {
        let wait = async {
            loop {
                match self.rx.recv().await {
                    Ok(line) if line.contains(needle) => return Ok(line),
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("transcript watcher skipped {skipped} lines");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        return Err(FeatherError::ChannelClosed);
                    }
                }
            }
        };
        match tokio::time::timeout(timeout, wait).await {
            Ok(result) => result,
            Err(_) => {
                debug!("no {needle:?} within {timeout:?}");
                Err(FeatherError::ReceiveTimeout(timeout))
            }
        }
    }
}
