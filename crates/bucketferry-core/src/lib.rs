//! Core domain logic for bucketferry
//!
//! This crate holds everything the rest of the workspace builds on:
//!
//! - [`config`] - JSON configuration loading, global-default merging and
//!   validation
//! - [`domain`] - filesystem events and queued-file types
//! - [`ports`] - the object storage port implemented by adapter crates

pub mod config;
pub mod domain;
pub mod ports;
