use std::sync::Arc;

use crate::config::CompressorConfig;
use crate::error::JobError;
use crate::models::{ImageUpload, JobOutcome};
use crate::services::cache::InMemoryVariantCache;
use crate::services::pipeline::VariantPipeline;
use crate::services::planner::VariantPlanner;
use crate::services::sink::{LocalSink, RemoteSink};
use crate::services::storage::ObjectStore;
use crate::services::transformer::Transformer;

/// Entry points used by the HTTP layer. The entry point picks the output
/// strategy; each strategy has its own pipeline and cache, so a local job never
/// answers a remote request with file paths.
pub struct ImageService {
    local: VariantPipeline,
    remote: Option<VariantPipeline>,
}

impl ImageService {
    pub fn new(local: VariantPipeline, remote: Option<VariantPipeline>) -> Self {
        Self { local, remote }
    }

    /// Wire both pipelines from config. Remote mode is available only when a store is given.
    pub fn from_config(
        config: &CompressorConfig,
        transformer: Arc<dyn Transformer>,
        store: Option<Arc<dyn ObjectStore>>,
    ) -> Self {
        let planner = VariantPlanner::new(config.dimension_policy)
            .with_max_dimension(config.max_variant_dimension)
            .with_size_targets(config.size_targets);

        let local = VariantPipeline::new(
            planner.clone(),
            transformer.clone(),
            Arc::new(LocalSink::new(&config.storage_dir)),
            Arc::new(InMemoryVariantCache::new()),
        )
        .with_identity(config.cache_identity)
        .with_variant_timeout(config.variant_timeout);

        let remote = store.map(|store| {
            VariantPipeline::new(
                planner,
                transformer,
                Arc::new(RemoteSink::new(
                    config.staging_dir(),
                    store,
                    config.object_key_prefix.clone(),
                )),
                Arc::new(InMemoryVariantCache::new()),
            )
            .with_identity(config.cache_identity)
            .with_variant_timeout(config.variant_timeout)
        });

        Self::new(local, remote)
    }

    /// Process an upload into variant files under the storage root.
    pub async fn process_local(&self, upload: ImageUpload) -> Result<JobOutcome, JobError> {
        self.local.process(upload).await
    }

    /// Process an upload and push every variant to object storage.
    pub async fn process_remote(&self, upload: ImageUpload) -> Result<JobOutcome, JobError> {
        self.remote
            .as_ref()
            .ok_or(JobError::RemoteDisabled)?
            .process(upload)
            .await
    }

    pub fn remote_enabled(&self) -> bool {
        self.remote.is_some()
    }

    /// Name and reachability of the transform backend.
    pub async fn transformer_status(&self) -> (&'static str, bool) {
        let transformer = self.local.transformer();
        (transformer.name(), transformer.health_check().await)
    }
}
