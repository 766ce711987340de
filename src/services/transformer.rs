use async_trait::async_trait;
use bytes::Bytes;
use image::imageops::FilterType;
use image::{ColorType, DynamicImage, GenericImageView, codecs::jpeg::JpegEncoder};
use std::time::Duration;
use url::Url;

use crate::config::CompressorConfig;
use crate::error::VariantError;
use crate::models::{Compression, VariantSpec};

/// Highest quality tried when fitting a byte-size target.
const TARGET_START_QUALITY: u8 = 90;
const TARGET_QUALITY_STEP: u8 = 10;
const TARGET_MIN_QUALITY: u8 = 10;

/// Resizes and re-encodes one image into one variant.
#[async_trait]
pub trait Transformer: Send + Sync {
    /// Produce the JPEG bytes for `spec` from the uploaded `data`.
    async fn transform(&self, data: Bytes, spec: &VariantSpec) -> Result<Vec<u8>, VariantError>;

    /// Check if the backend is available
    async fn health_check(&self) -> bool;

    fn name(&self) -> &'static str;
}

/// In-process transformer built on the `image` crate.
///
/// Decoding and encoding are CPU-bound, so each call runs on the blocking pool.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageTransformer;

impl ImageTransformer {
    pub fn new() -> Self {
        Self
    }

    /// Synchronous decode → resize → encode.
    pub fn render(data: &[u8], spec: &VariantSpec) -> Result<Vec<u8>, VariantError> {
        let img = image::load_from_memory(data)
            .map_err(|e| VariantError::Transform(format!("Failed to decode image: {}", e)))?;
        let resized = resize_to(img, spec.width, spec.height);

        match spec.compression {
            Compression::Quality(quality) => encode_jpeg(&resized, quality),
            Compression::TargetBytes(max_bytes) => {
                let mut quality = TARGET_START_QUALITY;
                loop {
                    let out = encode_jpeg(&resized, quality)?;
                    if out.len() as u64 <= max_bytes || quality <= TARGET_MIN_QUALITY {
                        return Ok(out);
                    }
                    quality = quality.saturating_sub(TARGET_QUALITY_STEP).max(TARGET_MIN_QUALITY);
                }
            }
        }
    }
}

#[async_trait]
impl Transformer for ImageTransformer {
    async fn transform(&self, data: Bytes, spec: &VariantSpec) -> Result<Vec<u8>, VariantError> {
        let spec = spec.clone();
        tokio::task::spawn_blocking(move || Self::render(&data, &spec))
            .await
            .map_err(|e| VariantError::Aborted(e.to_string()))?
    }

    async fn health_check(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "builtin"
    }
}

/// Resolve zero sides from the source aspect ratio, then resize with Lanczos3.
fn resize_to(img: DynamicImage, width: u32, height: u32) -> DynamicImage {
    let (src_w, src_h) = img.dimensions();
    let (w, h) = match (width, height) {
        (0, 0) => return img,
        (w, 0) => (w, scale(src_h, w, src_w)),
        (0, h) => (scale(src_w, h, src_h), h),
        dims => dims,
    };

    if (w, h) == (src_w, src_h) {
        img
    } else {
        img.resize_exact(w, h, FilterType::Lanczos3)
    }
}

fn scale(side: u32, num: u32, den: u32) -> u32 {
    if den == 0 {
        return side.max(1);
    }
    ((side as f64 * num as f64 / den as f64).round() as u32).max(1)
}

fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, VariantError> {
    // JPEG has no alpha channel and no 16-bit support.
    let rgb = img.to_rgb8();
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100))
        .encode(rgb.as_raw(), rgb.width(), rgb.height(), ColorType::Rgb8)
        .map_err(|e| VariantError::Transform(format!("Failed to encode JPEG: {}", e)))?;
    Ok(out)
}

/// Client for an Imaginary image server (`POST /resize`, `POST /convert`).
pub struct ImaginaryTransformer {
    client: reqwest::Client,
    base_url: Url,
}

impl ImaginaryTransformer {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let base_url = Url::parse(base_url)?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(50)
            .tcp_keepalive(Duration::from_secs(30))
            .build()?;
        Ok(Self { client, base_url })
    }

    /// URL for one request. Resizing is skipped when no target dimension is set.
    pub fn request_url(&self, width: u32, height: u32, quality: u8) -> Result<Url, VariantError> {
        let operation = if width == 0 && height == 0 {
            "convert"
        } else {
            "resize"
        };
        let mut url = self
            .base_url
            .join(operation)
            .map_err(|e| VariantError::Transform(format!("Invalid Imaginary URL: {}", e)))?;
        {
            let mut query = url.query_pairs_mut();
            if width > 0 {
                query.append_pair("width", &width.to_string());
            }
            if height > 0 {
                query.append_pair("height", &height.to_string());
            }
            query
                .append_pair("quality", &quality.clamp(1, 100).to_string())
                .append_pair("type", "jpeg");
        }
        Ok(url)
    }

    async fn request(
        &self,
        data: &Bytes,
        spec: &VariantSpec,
        quality: u8,
    ) -> Result<Vec<u8>, VariantError> {
        let url = self.request_url(spec.width, spec.height, quality)?;
        let content_type = infer::get(data)
            .map(|kind| kind.mime_type())
            .unwrap_or("application/octet-stream");

        let response = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(data.clone())
            .send()
            .await
            .map_err(|e| VariantError::Transform(format!("Imaginary request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VariantError::Transform(format!(
                "Imaginary returned {}: {}",
                status,
                body.trim()
            )));
        }

        let body = response.bytes().await.map_err(|e| {
            VariantError::Transform(format!("Failed to read Imaginary response: {}", e))
        })?;
        Ok(body.to_vec())
    }
}

#[async_trait]
impl Transformer for ImaginaryTransformer {
    async fn transform(&self, data: Bytes, spec: &VariantSpec) -> Result<Vec<u8>, VariantError> {
        match spec.compression {
            Compression::Quality(quality) => self.request(&data, spec, quality).await,
            Compression::TargetBytes(max_bytes) => {
                let mut quality = TARGET_START_QUALITY;
                loop {
                    let out = self.request(&data, spec, quality).await?;
                    if out.len() as u64 <= max_bytes || quality <= TARGET_MIN_QUALITY {
                        return Ok(out);
                    }
                    quality = quality.saturating_sub(TARGET_QUALITY_STEP).max(TARGET_MIN_QUALITY);
                }
            }
        }
    }

    async fn health_check(&self) -> bool {
        let Ok(url) = self.base_url.join("health") else {
            return false;
        };
        match self.client.get(url).send().await {
            Ok(res) => res.status().is_success(),
            Err(e) => {
                tracing::debug!("Imaginary health check failed: {}", e);
                false
            }
        }
    }

    fn name(&self) -> &'static str {
        "imaginary"
    }
}

/// Factory function to create the configured transformer
pub fn create_transformer(config: &CompressorConfig) -> anyhow::Result<Box<dyn Transformer>> {
    match config.transformer.to_lowercase().as_str() {
        "imaginary" => Ok(Box::new(ImaginaryTransformer::new(
            &config.imaginary_url,
            config.imaginary_timeout,
        )?)),
        "builtin" | "image" | "local" => Ok(Box::new(ImageTransformer::new())),
        other => {
            tracing::warn!("Unknown transformer '{}', using builtin", other);
            Ok(Box::new(ImageTransformer::new()))
        }
    }
}
