//! Runtime link settings, mutated only by the CONFIG command.

use serde::{Deserialize, Serialize};

use crate::error::FeatherError;
use crate::frame::{DEFAULT_PACKET_SIZE, MAX_FRAME_SIZE, MIN_PACKET_SIZE};

/// Settings that govern every send until changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Largest frame the sender may emit, prefix included (32-252).
    pub max_packet_size: usize,
    /// Tag every frame with `[i/total] `.
    pub logging_enabled: bool,
    /// Add the wall clock to the tag (only with logging).
    pub timestamp_enabled: bool,
    /// Split payloads larger than one frame.
    pub chunking_enabled: bool,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            max_packet_size: DEFAULT_PACKET_SIZE,
            logging_enabled: false,
            timestamp_enabled: false,
            chunking_enabled: true,
        }
    }
}

impl LinkConfig {
    /// Change the packet size, rejecting values outside 32-252.
    ///
    /// On rejection the current size is left untouched.
    pub fn set_max_packet_size(&mut self, size: usize) -> Result<(), FeatherError> {
        if !(MIN_PACKET_SIZE..=MAX_FRAME_SIZE).contains(&size) {
            return Err(FeatherError::Usage(format!(
                "Invalid OUTPUT_LENGTH: {size} (must be {MIN_PACKET_SIZE}-{MAX_FRAME_SIZE})"
            )));
        }
        self.max_packet_size = size;
        Ok(())
    }

    /// Clamp a value read from a config file into the legal range.
    pub fn sanitized(mut self) -> Self {
        self.max_packet_size = self.max_packet_size.clamp(MIN_PACKET_SIZE, MAX_FRAME_SIZE);
        self
    }
}

/// Operator boolean: `true`, `1` and `on` (any case) are true, anything else false.
pub fn parse_flag(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "true" | "1" | "on")
}
