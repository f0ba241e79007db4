//! S3 adapter for bucketferry
//!
//! Implements the [`IObjectStorage`](bucketferry_core::ports::IObjectStorage)
//! port on top of the AWS SDK. Request signing, transport and the SDK's own
//! retry policy are delegated entirely to the SDK; the engine never sees any
//! of it.

pub mod client;

pub use client::S3ObjectStorage;
