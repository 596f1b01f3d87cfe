//! Domain-specific error types for the Feather link.
//!
//! All fallible operations return `Result<T, FeatherError>`.
//! Command handlers never let one of these escape the dispatch boundary:
//! the dispatcher turns it into an error response and still closes the
//! transaction with the final token.

use std::time::Duration;
use thiserror::Error;

/// The canonical error type for the Feather link.
#[derive(Debug, Error)]
pub enum FeatherError {
    // ── Usage Errors ─────────────────────────────────────────────
    /// Malformed command arguments. Reported to the operator, never fatal.
    #[error("{0}")]
    Usage(String),

    // ── Transport Errors ─────────────────────────────────────────
    /// The radio did not acknowledge a frame. No implicit retry.
    #[error("frame was not acknowledged")]
    Nack,

    /// The radio layer failed for a reason other than a missing ack.
    #[error("transport error: {0}")]
    Transport(String),

    /// A frame exceeded the hardware packet ceiling.
    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// An mpsc channel was closed unexpectedly.
    #[error("channel closed")]
    ChannelClosed,

    /// No sentinel arrived before the deadline. Aborts only the wait.
    #[error("no reply within {0:?}")]
    ReceiveTimeout(Duration),

    // ── Codec Errors ─────────────────────────────────────────────
    /// Image encode/decode failure.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// The transcript held no payload that looks like image data.
    #[error("no image data found")]
    NoImageData,

    // ── System Errors ────────────────────────────────────────────
    /// File or socket I/O failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Catch-all for errors that do not fit another variant.
    #[error("{0}")]
    Other(String),
}

// ── CodecError ────────────────────────────────────────────────────

/// Typed error for the image codec and the reconstruction pipelines.
#[derive(Debug, Error, PartialEq)]
pub enum CodecError {
    /// Bit depth outside `1..=7`.
    #[error("invalid bit depth {0} (must be 1-7)")]
    InvalidDepth(u8),

    /// The bitstream ran out before every pixel was recovered.
    #[error("incomplete image: got {actual} pixels, expected {expected}")]
    Incomplete { expected: usize, actual: usize },

    /// Zero-sized image or target size.
    #[error("invalid dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    /// The compressor rejected the data.
    #[error("compression failed: {0}")]
    Compression(String),

    /// Base64 text could not be decoded.
    #[error("invalid base64: {0}")]
    Base64(String),

    /// Hex text could not be decoded.
    #[error("invalid hex: {0}")]
    Hex(String),

    /// Reading or writing an image container failed.
    #[error("image file error: {0}")]
    Image(String),
}

// ── Convenient From implementations ──────────────────────────────

impl From<String> for FeatherError {
    fn from(s: String) -> Self {
        FeatherError::Other(s)
    }
}

impl From<&str> for FeatherError {
    fn from(s: &str) -> Self {
        FeatherError::Other(s.to_string())
    }
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for FeatherError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        FeatherError::ChannelClosed
    }
}

impl From<base64::DecodeError> for CodecError {
    fn from(e: base64::DecodeError) -> Self {
        CodecError::Base64(e.to_string())
    }
}

impl From<hex::FromHexError> for CodecError {
    fn from(e: hex::FromHexError) -> Self {
        CodecError::Hex(e.to_string())
    }
}

impl From<image::ImageError> for CodecError {
    fn from(e: image::ImageError) -> Self {
        CodecError::Image(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, FeatherError>;
