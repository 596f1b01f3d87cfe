//! Splitting one logical payload into size-bounded frames.

use crate::error::FeatherError;
use crate::frame::{PrefixStyle, digits};
use crate::link::config::LinkConfig;

/// How a payload of a given length will be cut.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPlan {
    pub style: PrefixStyle,
    /// Bytes reserved per frame for the prefix.
    pub prefix_len: usize,
    /// Payload bytes carried per frame (the last one may carry fewer).
    pub data_len: usize,
    /// Number of frames.
    pub total: usize,
    chunking: bool,
}

impl ChunkPlan {
    /// Plan a transfer of `payload_len` bytes under `config`.
    ///
    /// With chunking on, `total == ceil(payload_len / (max_packet_size - prefix_len))`.
    /// With chunking off the payload always goes out as a single frame.
    pub fn new(payload_len: usize, config: &LinkConfig) -> Result<Self, FeatherError> {
        let style = PrefixStyle::new(config.logging_enabled, config.timestamp_enabled);

        if !config.chunking_enabled {
            return Ok(Self {
                style,
                prefix_len: style.reserved_len(1),
                data_len: payload_len,
                total: 1,
                chunking: false,
            });
        }

        // The counter prefix grows with the digit count of `total`, which in
        // turn depends on the prefix. Widen until the two agree.
        let mut width = 1;
        loop {
            let prefix_len = match style {
                PrefixStyle::Counter => 2 * width + 4,
                other => other.reserved_len(0),
            };
            let data_len = config
                .max_packet_size
                .checked_sub(prefix_len)
                .filter(|n| *n > 0)
                .ok_or_else(|| {
                    FeatherError::Usage(format!(
                        "packet size {} leaves no room after a {prefix_len}-byte prefix",
                        config.max_packet_size
                    ))
                })?;
            let total = payload_len.div_ceil(data_len);

            if style != PrefixStyle::Counter || digits(total) <= width {
                return Ok(Self {
                    style,
                    prefix_len,
                    data_len,
                    total,
                    chunking: true,
                });
            }
            width = digits(total);
        }
    }

    /// Cut `payload` into frames, each carrying its rendered prefix.
    pub fn split(&self, payload: &[u8], clock: &str) -> Vec<Vec<u8>> {
        if !self.chunking {
            return vec![self.frame(1, payload, clock)];
        }
        payload
            .chunks(self.data_len)
            .enumerate()
            .map(|(i, chunk)| self.frame(i + 1, chunk, clock))
            .collect()
    }

    fn frame(&self, index: usize, chunk: &[u8], clock: &str) -> Vec<u8> {
        let mut frame = self.style.render(index, self.total, clock).into_bytes();
        frame.extend_from_slice(chunk);
        frame
    }
}
