//! Pulls image payloads back out of a transcript.

use std::sync::LazyLock;

use regex::Regex;

use crate::frame::strip_prefix;

static RECEIVED_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[RECEIVED #\d+\] \[\d+ bytes\]: (.+)").expect("received-line pattern is valid")
});
static BASE64: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9+/=]+$").expect("base64 pattern is valid"));
static HEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9A-Fa-f]+$").expect("hex pattern is valid"));

/// Payload text joined per alphabet, in file order.
///
/// A payload drawn only from `[0-9A-Fa-f]` is valid in both alphabets and
/// joins both strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Candidates {
    pub base64: String,
    pub hex: String,
}

impl Candidates {
    pub fn is_empty(&self) -> bool {
        self.base64.is_empty() && self.hex.is_empty()
    }
}

/// Scan every received line of `log`.
///
/// Lines are taken in the order they appear; the `#seq` number is not used
/// for reordering. A link prefix (`[i/total] `) at the start of a payload
/// is dropped before classification.
pub fn extract(log: &str) -> Candidates {
    let mut out = Candidates::default();
    for line in log.lines() {
        let Some(caps) = RECEIVED_LINE.captures(line) else {
            continue;
        };
        let raw = caps[1].trim();
        let payload = match std::str::from_utf8(strip_prefix(raw.as_bytes())) {
            Ok(p) => p.trim(),
            Err(_) => raw,
        };
        if BASE64.is_match(payload) {
            out.base64.push_str(payload);
        }
        if HEX.is_match(payload) {
            out.hex.push_str(payload);
        }
    }
    out
}
