use crate::config::CompressorConfig;
use crate::services::transformer::{Transformer, create_transformer};
use std::sync::Arc;
use tracing::info;

pub async fn setup_transformer(config: &CompressorConfig) -> anyhow::Result<Arc<dyn Transformer>> {
    let transformer = create_transformer(config)?;

    if transformer.health_check().await {
        info!("🖼️  Transformer '{}' ready", transformer.name());
    } else {
        tracing::warn!(
            "⚠️  Transformer '{}' unreachable at {}! Variants will fail until it is up.",
            transformer.name(),
            config.imaginary_url
        );
    }

    Ok(transformer.into())
}
