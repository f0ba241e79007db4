//! Object storage port (driven/secondary port)
//!
//! Defines the interface the upload dispatcher uses to store bytes. The
//! primary implementation targets S3 via the AWS SDK, but the trait keeps
//! the engine backend-agnostic and mockable in tests.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because errors at port boundaries are
//!   adapter-specific and don't need domain-level classification.
//! - Uses `#[async_trait]` for async trait methods.
//! - Credential/session establishment belongs to the adapter constructor,
//!   which must fail fast when credentials cannot be established.

use crate::domain::PutOutcome;

/// Port trait for object storage PUT operations.
///
/// Implementations handle authentication, request signing and transport;
/// the engine only constructs the request parameters. One call stores one
/// complete object — streaming and multipart uploads are out of scope.
#[async_trait::async_trait]
pub trait IObjectStorage: Send + Sync {
    /// Stores `body` under `bucket`/`key` with the given content type.
    ///
    /// Content length is implied by `body.len()`.
    ///
    /// # Returns
    /// Backend metadata about the stored object on success.
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> anyhow::Result<PutOutcome>;
}
