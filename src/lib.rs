pub mod api;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod services;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_helpers;

use crate::config::CompressorConfig;
use crate::services::image_service::ImageService;
use axum::{
    Router,
    middleware::from_fn,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::images::upload_images,
        api::handlers::images::s3_upload,
        api::handlers::health::health_check,
    ),
    components(
        schemas(
            api::handlers::images::ImageResponse,
            api::handlers::images::UploadImagesResponse,
            api::handlers::images::S3UploadResponse,
            api::handlers::images::FailureResponse,
            api::handlers::health::HealthResponse,
            models::Dimensions,
        )
    ),
    tags(
        (name = "images", description = "Image compression endpoints"),
        (name = "system", description = "Service status")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub image_service: Arc<ImageService>,
    pub config: CompressorConfig,
}

pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(api::handlers::health::health_check))
        .route(
            "/upload",
            post(api::handlers::images::upload_images).layer(
                axum::extract::DefaultBodyLimit::max(state.config.max_request_size),
            ),
        )
        .route(
            "/s3upload",
            post(api::handlers::images::s3_upload).layer(axum::extract::DefaultBodyLimit::max(
                state.config.max_file_size + 1024 * 1024, // 1MB buffer for multipart overhead
            )),
        )
        .layer(from_fn(api::middleware::request_id::request_id_middleware))
        .layer(cors)
        .with_state(state)
}
