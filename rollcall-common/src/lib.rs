//! # Rollcall Common Library
//!
//! Shared code for the roll-call ingestion workspace:
//! - Error type and result alias
//! - Configuration resolution (CLI > env > TOML > default)
//! - Database pool initialization and schema
//! - Shared data models (chambers, vote sessions, vote positions)

pub mod config;
pub mod db;
pub mod error;

pub use error::{Error, Result};
