//! # feather-core
//!
//! Core library for the Feather narrowband radio link between a drone and
//! its base station.
//!
//! This crate contains:
//! - **Frame**: wire constants, the optional `[i/total] ` prefix, `FINAL_TOKEN`
//! - **Radio**: the `Radio` transport trait, `MemoryRadio` and `TcpRadio`
//! - **Link**: chunked, acknowledged sending with bounded history and resend
//! - **Command**: the verb registry and every built-in drone command
//! - **Imaging**: the variable-bit-depth grayscale codec and image file I/O
//! - **Transcript**: the station's received-frame log, scanner and reconstructor
//! - **Error**: `FeatherError` and `CodecError`, built on `thiserror`

pub mod command;
pub mod error;
pub mod frame;
pub mod imaging;
pub mod link;
pub mod radio;
pub mod transcript;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use command::{
    Camera, CaptureSettings, Command, CommandCamera, CommandContext, CommandDetector, Detector,
    Dispatcher,
};
pub use error::{CodecError, FeatherError, Result};
pub use frame::{FINAL_TOKEN, HISTORY_CAPACITY, MAX_FRAME_SIZE, MIN_PACKET_SIZE};
pub use imaging::{EncodedImage, Grayscale, ImageFormat};
pub use link::{Link, LinkConfig, PacketHistory, ResendReport};
pub use radio::{MemoryRadio, Radio, TcpRadio};
pub use transcript::{ReconstructOptions, Reconstruction, Transcript, TranscriptWatcher};
