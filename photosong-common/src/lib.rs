//! # PhotoSong Common Library
//!
//! Shared code for the PhotoSong crates:
//! - Common error type
//! - Configuration loading and root folder resolution
//! - Job event types and the broadcast event bus
//! - SSE helpers

pub mod config;
pub mod error;
pub mod events;
pub mod sse;

pub use error::{Error, Result};
