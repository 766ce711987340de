//! Shared test doubles for the trait seams of the pipeline.

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::error::{UploadError, VariantError};
use crate::models::VariantSpec;
use crate::services::storage::ObjectStore;
use crate::services::transformer::Transformer;

/// A PNG with a gradient so JPEG quality actually changes the output size.
pub fn sample_png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        let noise = ((x * 7919 + y * 104_729) % 61) as u8;
        Rgb([
            (x * 255 / width.max(1)) as u8 ^ noise,
            (y * 255 / height.max(1)) as u8,
            noise.wrapping_mul(4),
        ])
    });

    let mut out = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut std::io::Cursor::new(&mut out), ImageFormat::Png)
        .unwrap();
    out
}

/// Transformer that echoes a tag instead of encoding, recording every call.
#[derive(Default)]
pub struct MockTransformer {
    pub calls: AtomicUsize,
    pub seen: Mutex<Vec<VariantSpec>>,
    failing: Mutex<HashSet<String>>,
    delay: Option<Duration>,
}

impl MockTransformer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    /// Make every transform of `variant` fail.
    pub fn fail_variant(&self, variant: &str) {
        self.failing.lock().unwrap().insert(variant.to_string());
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn spec_for(&self, variant: &str) -> Option<VariantSpec> {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.name == variant)
            .cloned()
    }
}

#[async_trait]
impl Transformer for MockTransformer {
    async fn transform(&self, data: Bytes, spec: &VariantSpec) -> Result<Vec<u8>, VariantError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(spec.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let should_fail = self.failing.lock().unwrap().contains(&spec.name);
        if should_fail {
            return Err(VariantError::Transform(format!("mock failure for {}", spec.name)));
        }

        let mut out = format!("{}:", spec.name).into_bytes();
        out.extend_from_slice(&data);
        Ok(out)
    }

    async fn health_check(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// In-memory object store with per-key failure injection.
#[derive(Default)]
pub struct MockObjectStore {
    objects: Mutex<HashMap<String, (String, Vec<u8>)>>,
    failures: Mutex<HashMap<String, UploadError>>,
}

impl MockObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_key(&self, key: &str, error: UploadError) {
        self.failures.lock().unwrap().insert(key.to_string(), error);
    }

    pub fn object(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().unwrap().get(key).map(|(_, data)| data.clone())
    }

    pub fn content_type(&self, key: &str) -> Option<String> {
        self.objects.lock().unwrap().get(key).map(|(ct, _)| ct.clone())
    }

    pub fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }
}

#[async_trait]
impl ObjectStore for MockObjectStore {
    async fn put_object(
        &self,
        key: &str,
        content_type: &str,
        body: ByteStream,
    ) -> Result<String, UploadError> {
        let injected = self.failures.lock().unwrap().get(key).cloned();
        if let Some(err) = injected {
            return Err(err);
        }

        let data = body
            .collect()
            .await
            .map_err(|e| UploadError::Transfer(e.to_string()))?
            .into_bytes()
            .to_vec();
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), (content_type.to_string(), data));
        Ok(format!("https://mock-bucket.s3.amazonaws.com/{}", key))
    }

    async fn health_check(&self) -> bool {
        true
    }
}
