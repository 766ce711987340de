use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;

use crate::config::BucketConfig;
use crate::error::UploadError;

/// Service error codes that mean the session itself is unusable
/// (bad credentials, wrong bucket), as opposed to a failed transfer.
const SESSION_ERROR_CODES: [&str; 5] = [
    "InvalidAccessKeyId",
    "SignatureDoesNotMatch",
    "AccessDenied",
    "NoSuchBucket",
    "ExpiredToken",
];

/// Remote object storage for finished variants.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `body` under `key` and return its public address.
    async fn put_object(
        &self,
        key: &str,
        content_type: &str,
        body: ByteStream,
    ) -> Result<String, UploadError>;

    async fn health_check(&self) -> bool;
}

pub struct S3ObjectStore {
    client: Client,
    bucket: BucketConfig,
}

impl S3ObjectStore {
    pub fn new(client: Client, bucket: BucketConfig) -> Self {
        Self { client, bucket }
    }

    pub fn bucket(&self) -> &BucketConfig {
        &self.bucket
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put_object(
        &self,
        key: &str,
        content_type: &str,
        body: ByteStream,
    ) -> Result<String, UploadError> {
        let res = self
            .client
            .put_object()
            .bucket(&self.bucket.bucket)
            .key(key)
            .content_type(content_type)
            .body(body)
            .send()
            .await;

        if let Err(e) = res {
            let err = classify(e);
            tracing::error!(
                "S3 put_object failed: bucket={}, key={}, error={}",
                self.bucket.bucket,
                key,
                err
            );
            return Err(err);
        }

        Ok(self.bucket.public_url_for(key))
    }

    async fn health_check(&self) -> bool {
        self.client
            .head_bucket()
            .bucket(&self.bucket.bucket)
            .send()
            .await
            .is_ok()
    }
}

/// Split SDK failures into "no usable session" and "transfer failed".
pub fn classify<E, R>(err: SdkError<E, R>) -> UploadError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug,
{
    let message = DisplayErrorContext(&err).to_string();
    match &err {
        SdkError::ConstructionFailure(_)
        | SdkError::DispatchFailure(_)
        | SdkError::TimeoutError(_) => UploadError::Session(message),
        _ if err
            .code()
            .is_some_and(|code| SESSION_ERROR_CODES.contains(&code)) =>
        {
            UploadError::Session(message)
        }
        _ => UploadError::Transfer(message),
    }
}
