use bytes::Bytes;
use serde::Serialize;
use std::collections::BTreeMap;
use utoipa::ToSchema;

use crate::error::VariantError;

/// Variant name → stored location (local path or public URL).
pub type OutputMapping = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width/height ratio, `None` when the height is zero.
    pub fn aspect_ratio(&self) -> Option<f64> {
        if self.height == 0 {
            None
        } else {
            Some(self.width as f64 / self.height as f64)
        }
    }
}

/// One uploaded image as handed to the pipeline.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub filename: String,
    pub data: Bytes,
    /// Size reported by the uploader; drives the compression bracket of "original".
    pub declared_size: u64,
    pub dimensions: Option<Dimensions>,
}

impl ImageUpload {
    pub fn new(filename: impl Into<String>, data: impl Into<Bytes>, declared_size: u64) -> Self {
        Self {
            filename: filename.into(),
            data: data.into(),
            declared_size,
            dimensions: None,
        }
    }

    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.dimensions = Some(Dimensions::new(width, height));
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    /// JPEG quality, 1-100. 100 is a pass-through re-encode.
    Quality(u8),
    /// Encode at the highest quality whose output fits this many bytes.
    TargetBytes(u64),
}

/// A planned rendition. A zero width or height means "derive from the source".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantSpec {
    pub name: String,
    pub compression: Compression,
    pub width: u32,
    pub height: u32,
}

impl VariantSpec {
    pub fn new(name: impl Into<String>, compression: Compression, width: u32, height: u32) -> Self {
        Self {
            name: name.into(),
            compression,
            width,
            height,
        }
    }
}

/// A variant that was planned but produced no output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantFailure {
    pub variant: String,
    pub error: VariantError,
}

/// Result of one processed image.
#[derive(Debug, Clone)]
pub struct JobOutcome {
    /// Cache key and output file prefix.
    pub key: String,
    pub outputs: OutputMapping,
    /// On a cache hit, the failures recorded when the job first ran.
    pub failures: Vec<VariantFailure>,
    pub from_cache: bool,
}

/// What the cache remembers about a finished job.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CachedJob {
    pub outputs: OutputMapping,
    pub failures: Vec<VariantFailure>,
}

impl CachedJob {
    pub fn new(outputs: OutputMapping) -> Self {
        Self {
            outputs,
            failures: Vec::new(),
        }
    }
}
