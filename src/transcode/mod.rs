//! Transcoder orchestration
//!
//! This module handles the external ffmpeg process:
//! - Building the invocation for the requested output format
//! - Spawning it with captured output and drained diagnostics
//! - Guaranteed, idempotent teardown

pub mod command;
pub mod process;

pub use command::TranscodeCommand;
pub use process::TranscodeProcess;
