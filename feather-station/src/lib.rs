//! # feather-station - Base Station
//!
//! Accepts the drone's radio bridge, records every received frame in a
//! transcript, issues commands and waits for each transaction's
//! `END_OF_STREAM`, and rebuilds transmitted images from the transcript.
//!
//! ## Modes
//!
//! - **Listen**: interactive console against a connected drone.
//! - **Script**: run one command script against a connected drone.
//! - **Reconstruct**: offline image rebuild from an existing transcript.

pub mod config;
pub mod console;
pub mod station;
