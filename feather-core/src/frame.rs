//! Wire-level constants and the optional per-frame text prefix.
//!
//! A frame is at most [`MAX_FRAME_SIZE`] raw bytes. When logging is
//! enabled on the sending side, each frame starts with a human-readable
//! tag so the base-station operator can see transfer progress:
//!
//! ```text
//! [3/17] <payload>              logging only
//! [14:02:51 3/17] <payload>     logging + timestamp
//! ```
//!
//! Nothing else is embedded. The radio's own ack/CRC is the only integrity
//! check.

use std::sync::LazyLock;

use regex::bytes::Regex;

// ── Constants ────────────────────────────────────────────────────

/// Hardware ceiling for a single radio packet.
pub const MAX_FRAME_SIZE: usize = 252;

/// Smallest packet size an operator may configure.
pub const MIN_PACKET_SIZE: usize = 32;

/// Packet size in effect until CONFIG changes it.
pub const DEFAULT_PACKET_SIZE: usize = 128;

/// Budget reserved for a `[HH:MM:SS i/total] ` prefix.
pub const TIMESTAMP_PREFIX_LEN: usize = 30;

/// Reserved literal closing every multi-frame response.
///
/// Not escaped: an ordinary payload containing this exact text would end
/// the transaction early on the receiving side.
pub const FINAL_TOKEN: &str = "END_OF_STREAM";

/// Number of sent frames retained for RESEND / HISTORY.
pub const HISTORY_CAPACITY: usize = 500;

static LINK_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[(?:\d{2}:\d{2}:\d{2} )?\d+/\d+\] ").expect("link prefix pattern is valid")
});

// ── Prefix ───────────────────────────────────────────────────────

/// Which tag, if any, is written in front of each frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixStyle {
    None,
    /// `[i/total] `
    Counter,
    /// `[HH:MM:SS i/total] `
    Timestamped,
}

impl PrefixStyle {
    pub fn new(logging_enabled: bool, timestamp_enabled: bool) -> Self {
        match (logging_enabled, timestamp_enabled) {
            (false, _) => PrefixStyle::None,
            (true, false) => PrefixStyle::Counter,
            (true, true) => PrefixStyle::Timestamped,
        }
    }

    /// Bytes reserved for the prefix of a transfer of `total` frames.
    ///
    /// The counter prefix is sized for its widest instance, `[total/total] `.
    pub fn reserved_len(&self, total: usize) -> usize {
        match self {
            PrefixStyle::None => 0,
            PrefixStyle::Counter => 2 * digits(total) + 4,
            PrefixStyle::Timestamped => TIMESTAMP_PREFIX_LEN,
        }
    }

    /// Render the prefix for frame `index` (1-based) of `total`.
    pub fn render(&self, index: usize, total: usize, clock: &str) -> String {
        match self {
            PrefixStyle::None => String::new(),
            PrefixStyle::Counter => format!("[{index}/{total}] "),
            PrefixStyle::Timestamped => format!("[{clock} {index}/{total}] "),
        }
    }
}

/// Remove a leading link prefix, if the frame carries one.
pub fn strip_prefix(frame: &[u8]) -> &[u8] {
    match LINK_PREFIX.find(frame) {
        Some(m) => &frame[m.end()..],
        None => frame,
    }
}

/// Wall-clock tag used by timestamped prefixes.
pub fn clock() -> String {
    chrono::Local::now().format("%H:%M:%S").to_string()
}

pub(crate) fn digits(mut n: usize) -> usize {
    let mut d = 1;
    while n >= 10 {
        n /= 10;
        d += 1;
    }
    d
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_style_from_flags() {
        assert_eq!(PrefixStyle::new(false, true), PrefixStyle::None);
        assert_eq!(PrefixStyle::new(true, false), PrefixStyle::Counter);
        assert_eq!(PrefixStyle::new(true, true), PrefixStyle::Timestamped);
    }

    #[test]
    fn counter_reservation_matches_widest_render() {
        let style = PrefixStyle::Counter;
        for total in [1, 9, 10, 99, 100, 12345] {
            let widest = style.render(total, total, "");
            assert_eq!(style.reserved_len(total), widest.len());
        }
    }

    #[test]
    fn timestamped_prefix_fits_reservation() {
        let prefix = PrefixStyle::Timestamped.render(1234, 9999, "23:59:59");
        assert_eq!(prefix, "[23:59:59 1234/9999] ");
        assert!(prefix.len() <= TIMESTAMP_PREFIX_LEN);
    }

    #[test]
    fn strip_prefix_removes_one_tag() {
        assert_eq!(strip_prefix(b"[2/5] abc"), b"abc");
        assert_eq!(strip_prefix(b"[10:11:12 2/5] abc"), b"abc");
        assert_eq!(strip_prefix(b"[1/1] [2/2] x"), b"[2/2] x");
        assert_eq!(strip_prefix(b"plain"), b"plain");
        assert_eq!(strip_prefix(b"[RECEIVED #1] x"), b"[RECEIVED #1] x");
    }

    #[test]
    fn digit_count() {
        assert_eq!(digits(0), 1);
        assert_eq!(digits(9), 1);
        assert_eq!(digits(10), 2);
        assert_eq!(digits(500), 3);
    }
}
