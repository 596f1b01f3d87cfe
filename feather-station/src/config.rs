//! Configuration for the base station.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use feather_core::{ImageFormat, ReconstructOptions};

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StationConfig {
    /// Radio bridge settings.
    pub network: NetworkConfig,
    /// Received-frame transcript.
    pub transcript: TranscriptConfig,
    /// Image reconstruction settings.
    pub image: ImageConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Network configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Address the radio bridge listens on for the drone.
    pub listen_addr: String,
    /// How long to wait for the drone's ack of a command frame.
    pub ack_timeout_ms: u64,
}

/// Transcript configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptConfig {
    pub path: PathBuf,
    /// How long to wait for `END_OF_STREAM` after issuing a command.
    pub poll_timeout_secs: u64,
}

/// Reconstruction settings. Must match the drone's `[image]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    pub bit_depth: u8,
    pub width: u32,
    pub height: u32,
    pub text_output: PathBuf,
    pub binary_output: PathBuf,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:7400".into(),
            ack_timeout_ms: 2000,
        }
    }
}

impl Default for TranscriptConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("terminal.txt"),
            poll_timeout_secs: 120,
        }
    }
}

impl Default for ImageConfig {
    fn default() -> Self {
        let options = ReconstructOptions::default();
        Self {
            bit_depth: options.format.bit_depth,
            width: options.format.width,
            height: options.format.height,
            text_output: options.text_output,
            binary_output: options.binary_output,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl StationConfig {
    /// Load configuration from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("invalid config {}: {e}; using defaults", path.display());
                Self::default()
            }),
            Err(_) => {
                tracing::info!("no config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }

    pub fn ack_timeout(&self) -> Duration {
        Duration::from_millis(self.network.ack_timeout_ms)
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.transcript.poll_timeout_secs)
    }

    pub fn reconstruct_options(&self) -> ReconstructOptions {
        ReconstructOptions {
            format: ImageFormat::new(self.image.bit_depth, self.image.width, self.image.height),
            text_output: self.image.text_output.clone(),
            binary_output: self.image.binary_output.clone(),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
