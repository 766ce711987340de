pub mod storage;
pub mod transformer;

use crate::config::CompressorConfig;
use crate::services::image_service::ImageService;
use std::sync::Arc;
use tracing::info;

/// Create the storage root and wire the image service from config.
pub async fn setup_image_service(config: &CompressorConfig) -> anyhow::Result<Arc<ImageService>> {
    tokio::fs::create_dir_all(&config.storage_dir).await?;
    info!("📂 Storage root: {}", config.storage_dir.display());

    let transformer = transformer::setup_transformer(config).await?;

    let store = match &config.bucket {
        Some(bucket) => {
            tokio::fs::create_dir_all(config.staging_dir()).await?;
            Some(storage::setup_object_store(bucket).await)
        }
        None => {
            info!("☁️  No bucket configured, remote uploads disabled");
            None
        }
    };

    Ok(Arc::new(ImageService::from_config(config, transformer, store)))
}
