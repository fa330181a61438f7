//! # storybridge common library
//!
//! Shared code for the storybridge migration workspace:
//! - Common error type
//! - Configuration resolution (environment, TOML file, compiled defaults)
//! - Timestamp helpers for run artifacts

pub mod config;
pub mod error;
pub mod time;

pub use error::{Error, Result};
