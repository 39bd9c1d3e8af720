//! Relay sessions
//!
//! This module handles one client request end to end:
//! - Resolving the station source and selecting an HLS variant
//! - Spawning the transcoder for the station's output format
//! - Pumping transcoder output to the client until it ends

pub mod pipeline;
pub mod session;
pub mod stream;

pub use pipeline::open_relay;
