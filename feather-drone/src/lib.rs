//! # feather-drone - Remote Unit Worker
//!
//! Connects to the base station's radio bridge and answers one command
//! transaction at a time: status and help, echo throughput tests, packet
//! history replay, runtime link configuration, camera capture, person
//! detection and shell execution.
//!
//! Every transaction ends with exactly one `END_OF_STREAM` frame.

pub mod config;
pub mod service;
