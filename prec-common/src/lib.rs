//! # prec Common Library
//!
//! Shared code for the recording bundle tools including:
//! - Common error and result types
//! - Three-component version numbers used by metadata schemas
//! - Configuration loading (TOML bootstrap + resolution priority)
//! - Logging initialization
//! - Atomic file writes and human-readable durations

pub mod config;
pub mod error;
pub mod fs_utils;
pub mod human_time;
pub mod logging;
pub mod version;

pub use error::{Error, Result};
pub use version::Version;
