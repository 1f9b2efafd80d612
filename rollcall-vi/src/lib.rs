//! rollcall-vi library interface
//!
//! Exposes the vote-ingest components for integration testing:
//! fetcher, chamber parsers, identity resolver, vote normalizer,
//! persistence operations and the discovery driver.

pub mod driver;
pub mod fetch;
pub mod identity;
pub mod normalize;
pub mod parse;
pub mod persist;
