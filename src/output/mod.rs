//! Output module
//!
//! Handles the Singer message stream written to stdout.
//!
//! # Overview
//!
//! This module provides:
//! - `Message` - SCHEMA, RECORD and STATE messages
//! - `MessageWriter` - The output seam the sync engine writes to
//! - `SingerWriter` - JSON lines on any `Write`
//! - `MemoryWriter` - Collected messages for tests and embedding

mod message;
mod writer;

pub use message::Message;
pub use writer::{MemoryWriter, MessageWriter, SingerWriter};
