use axum::{
    Json,
    extract::{Multipart, State},
    extract::multipart::Field,
    http::StatusCode,
};
use serde::Serialize;
use std::io::Cursor;
use tracing::{debug, info};
use utoipa::ToSchema;

use crate::AppState;
use crate::api::error::AppError;
use crate::models::{Dimensions, ImageUpload, OutputMapping, VariantFailure};

const IMAGE_FIELD: &str = "image";

/// Per-variant diagnostic returned next to the successful outputs.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FailureResponse {
    pub variant: String,
    /// One of transform, storage_write, upload_session, upload_transfer, timed_out, aborted
    pub kind: String,
    pub message: String,
}

impl From<&VariantFailure> for FailureResponse {
    fn from(failure: &VariantFailure) -> Self {
        Self {
            variant: failure.variant.clone(),
            kind: failure.error.kind().to_string(),
            message: failure.error.to_string(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct ImageResponse {
    pub filename: String,
    pub aspect_ratio: String,
    pub original_width: u32,
    pub original_height: u32,
    /// Variant name → local path
    pub paths: OutputMapping,
    pub failures: Vec<FailureResponse>,
    pub cached: bool,
}

#[derive(Serialize, ToSchema)]
pub struct UploadImagesResponse {
    pub message: String,
    pub images: Vec<ImageResponse>,
}

#[derive(Serialize, ToSchema)]
pub struct S3UploadResponse {
    pub message: String,
    /// Variant name → public URL
    #[serde(rename = "imageUrls")]
    pub image_urls: OutputMapping,
    pub failures: Vec<FailureResponse>,
}

#[utoipa::path(
    post,
    path = "/upload",
    request_body(content = Multipart, description = "One or more `image` fields"),
    responses(
        (status = 200, description = "Variants written to local storage", body = UploadImagesResponse),
        (status = 400, description = "Missing or invalid image"),
        (status = 413, description = "Image exceeds the size limit"),
        (status = 422, description = "Image dimensions do not allow planning"),
        (status = 500, description = "No variant could be produced")
    ),
    tag = "images"
)]
pub async fn upload_images(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadImagesResponse>, AppError> {
    let mut uploads = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(IMAGE_FIELD) {
            debug!("Ignoring multipart field {:?}", field.name());
            continue;
        }
        uploads.push(read_image(field, state.config.max_file_size).await?);
    }

    if uploads.is_empty() {
        return Err(AppError::BadRequest("No files uploaded".to_string()));
    }

    let mut images = Vec::with_capacity(uploads.len());
    for upload in uploads {
        let filename = upload.filename.clone();
        let dimensions = upload.dimensions.unwrap_or(Dimensions::new(0, 0));

        let outcome = state.image_service.process_local(upload).await?;

        images.push(ImageResponse {
            filename,
            aspect_ratio: aspect_ratio_label(dimensions.width, dimensions.height),
            original_width: dimensions.width,
            original_height: dimensions.height,
            paths: outcome.outputs,
            failures: outcome.failures.iter().map(FailureResponse::from).collect(),
            cached: outcome.from_cache,
        });
    }

    info!("Processed {} uploaded image(s)", images.len());

    Ok(Json(UploadImagesResponse {
        message: "Images uploaded successfully".to_string(),
        images,
    }))
}

#[utoipa::path(
    post,
    path = "/s3upload",
    request_body(content = Multipart, description = "A single `image` field"),
    responses(
        (status = 200, description = "Variants uploaded to object storage", body = S3UploadResponse),
        (status = 400, description = "Missing or invalid image"),
        (status = 413, description = "Image exceeds the size limit"),
        (status = 422, description = "Image dimensions do not allow planning"),
        (status = 500, description = "No variant could be uploaded"),
        (status = 503, description = "Object storage is not configured")
    ),
    tag = "images"
)]
pub async fn s3_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<S3UploadResponse>, AppError> {
    let mut upload = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() == Some(IMAGE_FIELD) && upload.is_none() {
            upload = Some(read_image(field, state.config.max_file_size).await?);
        }
    }

    let upload = upload.ok_or(AppError::BadRequest(
        "Failed to retrieve file from form".to_string(),
    ))?;

    let outcome = state.image_service.process_remote(upload).await?;

    Ok(Json(S3UploadResponse {
        message: "Image processed and uploaded successfully".to_string(),
        image_urls: outcome.outputs,
        failures: outcome.failures.iter().map(FailureResponse::from).collect(),
    }))
}

fn multipart_error(e: axum::extract::multipart::MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge("Request body exceeds the maximum allowed limit".to_string())
    } else {
        AppError::BadRequest(e.body_text())
    }
}

/// Buffer one `image` field, reject non-images and read the header dimensions.
async fn read_image(field: Field<'_>, max_file_size: usize) -> Result<ImageUpload, AppError> {
    let filename = field.file_name().unwrap_or("unnamed").to_string();
    let data = field.bytes().await.map_err(multipart_error)?;

    if data.len() > max_file_size {
        return Err(AppError::PayloadTooLarge(format!(
            "{} exceeds {}MB",
            filename,
            max_file_size / 1024 / 1024
        )));
    }

    if !infer::is_image(&data) {
        return Err(AppError::BadRequest(format!("{} is not an image", filename)));
    }

    let (width, height) = image::io::Reader::new(Cursor::new(&data))
        .with_guessed_format()
        .map_err(|e| AppError::BadRequest(format!("Failed to read image: {}", e)))?
        .into_dimensions()
        .map_err(|e| AppError::BadRequest(format!("Failed to decode image: {}", e)))?;

    let size = data.len() as u64;
    Ok(ImageUpload::new(filename, data, size).with_dimensions(width, height))
}

/// Reduced "W:H" ratio, "Invalid" when either side is zero.
pub fn aspect_ratio_label(width: u32, height: u32) -> String {
    if width == 0 || height == 0 {
        return "Invalid".to_string();
    }
    let g = gcd(width, height);
    format!("{}:{}", width / g, height / g)
}

fn gcd(a: u32, b: u32) -> u32 {
    if b == 0 { a } else { gcd(b, a % b) }
}
