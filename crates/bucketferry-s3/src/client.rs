//! S3 client wrapper implementing the object storage port.

use anyhow::{Context, Result};
use aws_credential_types::Credentials;
use aws_sdk_s3::config::{BehaviorVersion, Region};
use aws_sdk_s3::primitives::ByteStream;
use bucketferry_core::config::CredentialsConfig;
use bucketferry_core::domain::PutOutcome;
use bucketferry_core::ports::IObjectStorage;
use tracing::debug;

/// Name reported to the SDK as the credentials provider.
const PROVIDER_NAME: &str = "bucketferry-config";

/// Object storage backed by S3.
///
/// Built once at start-up from static credentials; construction fails fast
/// when any credential field is missing so a misconfigured run never reaches
/// the watch loop.
pub struct S3ObjectStorage {
    client: aws_sdk_s3::Client,
}

impl S3ObjectStorage {
    /// Creates a client from static credentials and a region.
    ///
    /// # Errors
    /// Returns an error when any of the access key, secret key or region is
    /// empty. This is a start-up fatal condition.
    pub fn new(credentials: &CredentialsConfig) -> Result<Self> {
        anyhow::ensure!(
            !credentials.access.is_empty(),
            "access key cannot be established"
        );
        anyhow::ensure!(
            !credentials.secret.is_empty(),
            "secret key cannot be established"
        );
        anyhow::ensure!(!credentials.region.is_empty(), "region is missing");

        let creds = Credentials::new(
            credentials.access.clone(),
            credentials.secret.clone(),
            None,
            None,
            PROVIDER_NAME,
        );

        let config = aws_sdk_s3::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(credentials.region.clone()))
            .credentials_provider(creds)
            .build();

        Ok(Self {
            client: aws_sdk_s3::Client::from_conf(config),
        })
    }
}

#[async_trait::async_trait]
impl IObjectStorage for S3ObjectStorage {
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<PutOutcome> {
        let content_length = body.len() as i64;

        debug!(bucket, key, content_length, content_type, "PutObject");

        let output = self
            .client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_length(content_length)
            .content_type(content_type)
            .send()
            .await
            .with_context(|| format!("PutObject {bucket}/{key}"))?;

        Ok(PutOutcome {
            etag: output.e_tag().map(str::to_string),
            version_id: output.version_id().map(str::to_string),
        })
    }
}
