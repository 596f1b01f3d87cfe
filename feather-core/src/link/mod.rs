//! The sending side of the radio link.
//!
//! A [`Link`] owns the runtime [`LinkConfig`] and the [`PacketHistory`] for
//! one session and is passed explicitly to every command. Payloads are cut
//! by a [`ChunkPlan`], every frame is sent with acknowledgment and then
//! recorded, and operator-driven RESEND/HISTORY replay recorded frames.

pub mod chunker;
pub mod config;
pub mod history;
pub mod sender;

pub use chunker::ChunkPlan;
pub use config::{LinkConfig, parse_flag};
pub use history::PacketHistory;
pub use sender::{Link, ResendReport};
