//! External collaborators used by the capture commands.
//!
//! The drone shells out for both: a still-capture utility for the camera
//! and an inference program for person detection. Both sit behind traits
//! so tests and other hardware can substitute their own.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{FeatherError, Result};
use crate::imaging::ImageFormat;

// ── CaptureSettings ──────────────────────────────────────────────

/// How captured images are encoded for the text pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureSettings {
    pub format: ImageFormat,
    pub dither: bool,
    /// Pause between failed capture attempts.
    pub retry_delay: Duration,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            format: ImageFormat::new(4, 64, 64),
            dither: false,
            retry_delay: Duration::from_secs(1),
        }
    }
}

// ── Camera ───────────────────────────────────────────────────────

#[async_trait]
pub trait Camera: Send + Sync {
    /// Take one picture. `None` means this attempt failed and the caller
    /// may try again.
    async fn capture(&self) -> Option<PathBuf>;
}

/// Runs a still-capture program, `libcamera-still` by default.
#[derive(Debug, Clone)]
pub struct CommandCamera {
    pub program: String,
    pub output: PathBuf,
    pub width: u32,
    pub height: u32,
}

impl Default for CommandCamera {
    fn default() -> Self {
        Self {
            program: "libcamera-still".into(),
            output: PathBuf::from("img/input.png"),
            width: 64,
            height: 64,
        }
    }
}

impl CommandCamera {
    fn args(&self) -> Vec<String> {
        vec![
            "-o".into(),
            self.output.display().to_string(),
            "--width".into(),
            self.width.to_string(),
            "--height".into(),
            self.height.to_string(),
            "--encoding".into(),
            "png".into(),
            "-t".into(),
            "100".into(),
            "--nopreview".into(),
        ]
    }
}

#[async_trait]
impl Camera for CommandCamera {
    async fn capture(&self) -> Option<PathBuf> {
        if let Some(dir) = self.output.parent().filter(|d| !d.as_os_str().is_empty()) {
            if let Err(e) = tokio::fs::create_dir_all(dir).await {
                warn!("cannot create {}: {e}", dir.display());
                return None;
            }
        }

        debug!(
            "capturing {}x{} to {}",
            self.width,
            self.height,
            self.output.display()
        );
        let status = Command::new(&self.program)
            .args(self.args())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match status {
            Ok(status) if status.success() => Some(self.output.clone()),
            Ok(status) => {
                warn!("{} exited with {status}", self.program);
                None
            }
            Err(e) => {
                warn!("{} failed to start: {e}", self.program);
                None
            }
        }
    }
}

// ── Detector ─────────────────────────────────────────────────────

#[async_trait]
pub trait Detector: Send + Sync {
    /// Find people in `image` and return one cropped image per detection.
    async fn infer(&self, image: &Path) -> Result<Vec<PathBuf>>;
}

/// Runs an inference program with the image path appended to `args` and
/// reads one crop path per line of its stdout.
#[derive(Debug, Clone, Default)]
pub struct CommandDetector {
    pub program: String,
    pub args: Vec<String>,
}

#[async_trait]
impl Detector for CommandDetector {
    async fn infer(&self, image: &Path) -> Result<Vec<PathBuf>> {
        if self.program.is_empty() {
            return Err(FeatherError::Other("no detector program configured".into()));
        }

        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(image)
            .stdin(Stdio::null())
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(FeatherError::Other(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(PathBuf::from)
            .collect())
    }
}
