//! Fan-out/fan-in execution of the planned variants of one image.
//!
//! For each job the pipeline:
//!
//! 1. derives the job key from the filename (see [`naming`](crate::services::naming));
//! 2. returns the cached mapping and failures when the key was already processed;
//! 3. otherwise plans the variants and spawns one task per variant, each
//!    running transform → sink;
//! 4. waits for every task, even when some fail;
//! 5. keeps only successful variants in the mapping and reports the rest as
//!    [`VariantFailure`]s;
//! 6. caches the mapping with its failures, unless every variant failed.
//!
//! Concurrent jobs for the same key are serialized so the transform work for a
//! key runs at most once per process.

use bytes::Bytes;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::CacheIdentity;
use crate::error::{JobError, VariantError};
use crate::models::{
    CachedJob, ImageUpload, JobOutcome, OutputMapping, VariantFailure, VariantSpec,
};
use crate::services::cache::VariantCache;
use crate::services::naming::job_key;
use crate::services::planner::VariantPlanner;
use crate::services::sink::VariantSink;
use crate::services::transformer::Transformer;
use crate::utils::keyed_mutex::KeyedMutex;

pub struct VariantPipeline {
    planner: VariantPlanner,
    transformer: Arc<dyn Transformer>,
    sink: Arc<dyn VariantSink>,
    cache: Arc<dyn VariantCache>,
    identity: CacheIdentity,
    variant_timeout: Option<Duration>,
    key_locks: KeyedMutex,
}

impl VariantPipeline {
    pub fn new(
        planner: VariantPlanner,
        transformer: Arc<dyn Transformer>,
        sink: Arc<dyn VariantSink>,
        cache: Arc<dyn VariantCache>,
    ) -> Self {
        Self {
            planner,
            transformer,
            sink,
            cache,
            identity: CacheIdentity::Filename,
            variant_timeout: None,
            key_locks: KeyedMutex::new(),
        }
    }

    pub fn with_identity(mut self, identity: CacheIdentity) -> Self {
        self.identity = identity;
        self
    }

    pub fn with_variant_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.variant_timeout = timeout;
        self
    }

    pub fn cache(&self) -> &Arc<dyn VariantCache> {
        &self.cache
    }

    pub fn transformer(&self) -> &Arc<dyn Transformer> {
        &self.transformer
    }

    pub fn sink_kind(&self) -> &'static str {
        self.sink.kind()
    }

    pub async fn process(&self, upload: ImageUpload) -> Result<JobOutcome, JobError> {
        let key = job_key(&upload.filename, &upload.data, self.identity);

        if let Some(job) = self.cache.get(&key) {
            debug!("Cache hit for {} ({} variants)", key, job.outputs.len());
            return Ok(cached(key, job));
        }

        let guard = self.key_locks.lock(&key).await;

        // Another job for this key may have finished while we waited.
        if let Some(job) = self.cache.get(&key) {
            debug!("Cache filled for {} while waiting", key);
            drop(guard);
            self.key_locks.cleanup();
            return Ok(cached(key, job));
        }

        let result = self.run(key, upload).await;
        drop(guard);
        self.key_locks.cleanup();
        result
    }

    async fn run(&self, key: String, upload: ImageUpload) -> Result<JobOutcome, JobError> {
        let specs = self
            .planner
            .plan(upload.declared_size, upload.dimensions)
            .inspect_err(|e| warn!("Planning failed for {}: {}", key, e))?;

        info!(
            "Processing {} ({} bytes) into {} variants via {} → {}",
            key,
            upload.declared_size,
            specs.len(),
            self.transformer.name(),
            self.sink.kind()
        );

        let results = self.fan_out(&key, upload.data, &specs).await;

        let mut outputs = OutputMapping::new();
        let mut failures = Vec::new();
        for (spec, result) in specs.iter().zip(results) {
            match result {
                Ok(location) => {
                    outputs.insert(spec.name.clone(), location);
                }
                Err(error) => {
                    warn!("Variant {} of {} failed: {}", spec.name, key, error);
                    failures.push(VariantFailure {
                        variant: spec.name.clone(),
                        error,
                    });
                }
            }
        }

        info!(
            "Finished {}: {} succeeded, {} failed",
            key,
            outputs.len(),
            failures.len()
        );

        if outputs.is_empty() && !failures.is_empty() {
            return Err(JobError::AllVariantsFailed { failures });
        }

        self.cache.put(
            &key,
            CachedJob {
                outputs: outputs.clone(),
                failures: failures.clone(),
            },
        );

        Ok(JobOutcome {
            key,
            outputs,
            failures,
            from_cache: false,
        })
    }

    /// One task per spec. Results come back in plan order whatever the
    /// completion order.
    async fn fan_out(
        &self,
        key: &str,
        data: Bytes,
        specs: &[VariantSpec],
    ) -> Vec<Result<String, VariantError>> {
        let handles: Vec<_> = specs
            .iter()
            .cloned()
            .map(|spec| {
                let transformer = self.transformer.clone();
                let sink = self.sink.clone();
                let data = data.clone();
                let prefix = key.to_string();
                let deadline = self.variant_timeout;

                tokio::spawn(async move {
                    let unit =
                        run_variant(transformer.as_ref(), sink.as_ref(), &prefix, data, &spec);
                    match deadline {
                        Some(limit) => tokio::time::timeout(limit, unit)
                            .await
                            .unwrap_or_else(|_| Err(VariantError::TimedOut(limit))),
                        None => unit.await,
                    }
                })
            })
            .collect();

        join_all(handles)
            .await
            .into_iter()
            .map(|joined| joined.unwrap_or_else(|e| Err(VariantError::Aborted(e.to_string()))))
            .collect()
    }
}

async fn run_variant(
    transformer: &dyn Transformer,
    sink: &dyn VariantSink,
    prefix: &str,
    data: Bytes,
    spec: &VariantSpec,
) -> Result<String, VariantError> {
    let encoded = transformer.transform(data, spec).await?;
    sink.persist(prefix, &spec.name, encoded).await
}

fn cached(key: String, job: CachedJob) -> JobOutcome {
    JobOutcome {
        key,
        outputs: job.outputs,
        failures: job.failures,
        from_cache: true,
    }
}
