use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// How the non-original variants get their target dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DimensionPolicy {
    /// Fixed width, height derived from the original aspect ratio.
    AspectPreserving { base_width: u32 },
    /// Fixed standard resolution per variant.
    Standard,
}

impl DimensionPolicy {
    fn parse(value: &str, base_width: u32) -> Self {
        match value.to_lowercase().as_str() {
            "standard" | "fixed" => DimensionPolicy::Standard,
            "aspect" | "aspect-preserving" => DimensionPolicy::AspectPreserving { base_width },
            other => {
                tracing::warn!("Unknown dimension policy '{}', preserving aspect ratio", other);
                DimensionPolicy::AspectPreserving { base_width }
            }
        }
    }
}

/// What identifies a job in the result cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheIdentity {
    /// Normalized base name only. Different uploads sharing a name collide.
    Filename,
    /// Base name plus a content hash of the payload.
    Content,
}

impl CacheIdentity {
    fn parse(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "content" | "hash" => CacheIdentity::Content,
            _ => CacheIdentity::Filename,
        }
    }
}

/// Object storage settings. Owned by the deployment, not by the pipeline.
#[derive(Debug, Clone)]
pub struct BucketConfig {
    pub bucket: String,
    pub region: String,
    pub access_key: String,
    pub secret_key: String,
    /// Custom endpoint (MinIO and friends). `None` means AWS S3.
    pub endpoint: Option<String>,
    /// Base used to build public object addresses when it differs from the endpoint.
    pub public_url: Option<String>,
}

impl BucketConfig {
    /// Returns `None` when no bucket is configured, which disables remote mode.
    pub fn from_env() -> Option<Self> {
        let bucket = env::var("AWS_BUCKET_NAME").ok().filter(|b| !b.is_empty())?;

        Some(Self {
            bucket,
            region: env::var("AWS_BUCKET_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            access_key: env::var("AWS_ACCESS_KEY").unwrap_or_default(),
            secret_key: env::var("AWS_SECRET_KEY").unwrap_or_default(),
            endpoint: env::var("S3_ENDPOINT").ok().filter(|v| !v.is_empty()),
            public_url: env::var("S3_PUBLIC_URL").ok().filter(|v| !v.is_empty()),
        })
    }

    /// Public address of an object stored under `key`.
    pub fn public_url_for(&self, key: &str) -> String {
        match self.public_url.as_deref().or(self.endpoint.as_deref()) {
            Some(base) => format!("{}/{}/{}", base.trim_end_matches('/'), self.bucket, key),
            None => format!("https://{}.s3.amazonaws.com/{}", self.bucket, key),
        }
    }
}

/// Configuration for the image compression service
#[derive(Debug, Clone)]
pub struct CompressorConfig {
    /// Directory variants are written to (default: "storage")
    pub storage_dir: PathBuf,

    /// Maximum upload size in bytes (default: 10 MB)
    pub max_file_size: usize,

    /// Maximum multipart request size in bytes (default: 50 MB)
    pub max_request_size: usize,

    /// Transformer backend: "builtin" or "imaginary" (default: "builtin")
    pub transformer: String,

    /// Imaginary server URL (default: "http://localhost:9000")
    pub imaginary_url: String,

    /// Request timeout for the Imaginary server (default: 10s)
    pub imaginary_timeout: Duration,

    pub dimension_policy: DimensionPolicy,

    /// Largest width or height a variant may be planned at (default: 16384)
    pub max_variant_dimension: u32,

    /// Compress fixed variants towards their byte budget instead of a fixed quality
    pub size_targets: bool,

    pub cache_identity: CacheIdentity,

    /// Optional deadline for a single variant
    pub variant_timeout: Option<Duration>,

    /// Namespace prefix for object keys (default: "imaginary/")
    pub object_key_prefix: String,

    pub bucket: Option<BucketConfig>,
}

pub const DEFAULT_BASE_WIDTH: u32 = 1200;
pub const DEFAULT_MAX_VARIANT_DIMENSION: u32 = 16384;

impl Default for CompressorConfig {
    fn default() -> Self {
        Self {
            storage_dir: PathBuf::from("storage"),
            max_file_size: 10 * 1024 * 1024, // 10 MB
            max_request_size: 50 * 1024 * 1024, // 50 MB
            transformer: "builtin".to_string(),
            imaginary_url: "http://localhost:9000".to_string(),
            imaginary_timeout: Duration::from_secs(10),
            dimension_policy: DimensionPolicy::AspectPreserving {
                base_width: DEFAULT_BASE_WIDTH,
            },
            max_variant_dimension: DEFAULT_MAX_VARIANT_DIMENSION,
            size_targets: false,
            cache_identity: CacheIdentity::Filename,
            variant_timeout: None,
            object_key_prefix: "imaginary/".to_string(),
            bucket: None,
        }
    }
}

impl CompressorConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        let base_width = env::var("BASE_WIDTH")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|w: &u32| *w > 0)
            .unwrap_or(DEFAULT_BASE_WIDTH);

        Self {
            storage_dir: env::var("STORAGE_DIR")
                .map(PathBuf::from)
                .unwrap_or(default.storage_dir),

            max_file_size: env::var("MAX_FILE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_file_size),

            max_request_size: env::var("MAX_REQUEST_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_request_size),

            transformer: env::var("TRANSFORMER").unwrap_or(default.transformer),

            imaginary_url: env::var("IMAGINARY_URL")
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or(default.imaginary_url),

            imaginary_timeout: env::var("IMAGINARY_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(default.imaginary_timeout),

            dimension_policy: env::var("DIMENSION_POLICY")
                .map(|v| DimensionPolicy::parse(&v, base_width))
                .unwrap_or(DimensionPolicy::AspectPreserving { base_width }),

            max_variant_dimension: env::var("MAX_VARIANT_DIMENSION")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|d: &u32| *d > 0)
                .unwrap_or(default.max_variant_dimension),

            size_targets: env::var("SIZE_TARGETS")
                .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(default.size_targets),

            cache_identity: env::var("CACHE_IDENTITY")
                .map(|v| CacheIdentity::parse(&v))
                .unwrap_or(default.cache_identity),

            variant_timeout: env::var("VARIANT_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|secs: &u64| *secs > 0)
                .map(Duration::from_secs),

            object_key_prefix: env::var("OBJECT_KEY_PREFIX").unwrap_or(default.object_key_prefix),

            bucket: BucketConfig::from_env(),
        }
    }

    /// Where the remote strategy stages variants before upload. Kept apart from
    /// the local variants so the two strategies never write the same file.
    pub fn staging_dir(&self) -> PathBuf {
        self.storage_dir.join("staging")
    }

    /// Config for local development and tests (in-process transformer, no bucket)
    pub fn development(storage_dir: impl Into<PathBuf>) -> Self {
        Self {
            storage_dir: storage_dir.into(),
            ..Self::default()
        }
    }
}
