//! Configuration for the drone worker.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use feather_core::{CaptureSettings, CommandCamera, CommandDetector, ImageFormat, LinkConfig};

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DroneConfig {
    /// Radio bridge settings.
    pub network: NetworkConfig,
    /// Initial runtime link settings. CONFIG changes them in memory only.
    pub link: LinkSection,
    /// Still-capture utility.
    pub camera: CameraConfig,
    /// Text-pipeline encoding for captures.
    pub image: ImageConfig,
    /// Person detector.
    pub detector: DetectorConfig,
    /// RUN command settings.
    pub run: RunConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Network configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Address of the station's radio bridge.
    pub station_addr: String,
    /// How long to wait for the station's ack of each frame.
    pub ack_timeout_ms: u64,
    /// Receive poll interval of the worker loop.
    pub poll_interval_ms: u64,
}

/// Link settings in effect at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkSection {
    pub max_packet_size: usize,
    pub logging: bool,
    pub timestamp: bool,
    pub chunking: bool,
    /// Pause after every frame (radio duty cycle).
    pub frame_delay_ms: u64,
}

/// Camera configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub program: String,
    pub output: PathBuf,
    pub width: u32,
    pub height: u32,
    /// Pause between failed capture attempts.
    pub retry_delay_ms: u64,
    /// Directory served by SCREENSHOT.
    pub image_dir: PathBuf,
}

/// Image encoding configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    /// Bits per pixel, 1-7.
    pub bit_depth: u8,
    pub width: u32,
    pub height: u32,
    pub dither: bool,
}

/// Detector configuration. An empty program disables DETECT.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub program: String,
    pub args: Vec<String>,
}

/// RUN configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Longest a RUN child may take before it is killed.
    pub timeout_secs: u64,
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
            station_addr: "127.0.0.1:7400".into(),
            ack_timeout_ms: 2000,
            poll_interval_ms: 500,
        }
    }
}

impl Default for LinkSection {
    fn default() -> Self {
        let link = LinkConfig::default();
        Self {
            max_packet_size: link.max_packet_size,
            logging: link.logging_enabled,
            timestamp: link.timestamp_enabled,
            chunking: link.chunking_enabled,
            frame_delay_ms: 100,
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        let camera = CommandCamera::default();
        Self {
            program: camera.program,
            output: camera.output,
            width: camera.width,
            height: camera.height,
            retry_delay_ms: 1000,
            image_dir: PathBuf::from("img"),
        }
    }
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            bit_depth: 4,
            width: 64,
            height: 64,
            dither: false,
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
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

impl DroneConfig {
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

    /// Runtime link settings at startup, packet size clamped to 32-252.
    pub fn link_config(&self) -> LinkConfig {
        LinkConfig {
            max_packet_size: self.link.max_packet_size,
            logging_enabled: self.link.logging,
            timestamp_enabled: self.link.timestamp,
            chunking_enabled: self.link.chunking,
        }
        .sanitized()
    }

    pub fn frame_delay(&self) -> Duration {
        Duration::from_millis(self.link.frame_delay_ms)
    }

    pub fn ack_timeout(&self) -> Duration {
        Duration::from_millis(self.network.ack_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.network.poll_interval_ms.max(1))
    }

    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.run.timeout_secs)
    }

    pub fn capture_settings(&self) -> CaptureSettings {
        CaptureSettings {
            format: ImageFormat::new(self.image.bit_depth, self.image.width, self.image.height),
            dither: self.image.dither,
            retry_delay: Duration::from_millis(self.camera.retry_delay_ms),
        }
    }

    pub fn camera(&self) -> CommandCamera {
        CommandCamera {
            program: self.camera.program.clone(),
            output: self.camera.output.clone(),
            width: self.camera.width,
            height: self.camera.height,
        }
    }

    /// `None` when no detector program is configured.
    pub fn detector(&self) -> Option<CommandDetector> {
        (!self.detector.program.is_empty()).then(|| CommandDetector {
            program: self.detector.program.clone(),
            args: self.detector.args.clone(),
        })
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let text = toml::to_string_pretty(&DroneConfig::default()).unwrap();
        assert!(text.contains("station_addr"));
        assert!(text.contains("max_packet_size"));
        assert!(text.contains("bit_depth"));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let cfg: DroneConfig = toml::from_str(
            r#"
            [link]
            max_packet_size = 64
            logging = true

            [detector]
            program = "detect-people"
            "#,
        )
        .unwrap();
        let link = cfg.link_config();
        assert_eq!(link.max_packet_size, 64);
        assert!(link.logging_enabled);
        assert!(link.chunking_enabled);
        assert_eq!(cfg.image.bit_depth, 4);
        assert_eq!(cfg.detector().unwrap().program, "detect-people");
    }

    #[test]
    fn packet_size_is_clamped() {
        let mut cfg = DroneConfig::default();
        cfg.link.max_packet_size = 1000;
        assert_eq!(cfg.link_config().max_packet_size, 252);
        cfg.link.max_packet_size = 0;
        assert_eq!(cfg.link_config().max_packet_size, 32);
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = DroneConfig::load(&dir.path().join("absent.toml"));
        assert_eq!(cfg.network.ack_timeout_ms, 2000);
        assert!(cfg.detector().is_none());
    }
}
