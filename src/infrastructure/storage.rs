use crate::config::BucketConfig;
use crate::services::storage::{ObjectStore, S3ObjectStore};
use aws_sdk_s3::config::Region;
use std::sync::Arc;
use tracing::{info, warn};

pub async fn setup_object_store(bucket: &BucketConfig) -> Arc<dyn ObjectStore> {
    info!(
        "☁️  Object Storage: {} (Bucket: {}, Region: {})",
        bucket.endpoint.as_deref().unwrap_or("aws"),
        bucket.bucket,
        bucket.region
    );

    let mut loader = aws_config::from_env()
        .region(Region::new(bucket.region.clone()))
        .credentials_provider(aws_sdk_s3::config::Credentials::new(
            bucket.access_key.clone(),
            bucket.secret_key.clone(),
            None,
            None,
            "static",
        ));
    if let Some(endpoint) = &bucket.endpoint {
        loader = loader.endpoint_url(endpoint);
    }
    let aws_config = loader.load().await;

    // Custom endpoints (MinIO) only understand path-style addressing.
    let s3_config = aws_sdk_s3::config::Builder::from(&aws_config)
        .force_path_style(bucket.endpoint.is_some())
        .build();

    let store = S3ObjectStore::new(aws_sdk_s3::Client::from_conf(s3_config), bucket.clone());

    // Warm up the session so bad credentials show at startup, not on the first upload.
    if store.health_check().await {
        info!("✅ Bucket '{}' is reachable", bucket.bucket);
    } else {
        warn!(
            "⚠️  Bucket '{}' is unreachable! Remote uploads will report session errors.",
            bucket.bucket
        );
    }

    Arc::new(store)
}
