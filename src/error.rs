use thiserror::Error;

use crate::models::VariantFailure;

/// The job could not be planned. Aborts the whole job.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanningError {
    #[error("Image payload is empty")]
    EmptyPayload,

    #[error("Original dimensions are required for aspect-preserving variants")]
    MissingDimensions,

    #[error("Aspect ratio is undefined for {width}x{height}")]
    UndefinedAspectRatio { width: u32, height: u32 },

    #[error("Variant {variant} would be {width}x{height}, above the {max}px limit")]
    DimensionsTooLarge {
        variant: String,
        width: u32,
        height: u32,
        max: u32,
    },
}

/// Returned by object stores.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UploadError {
    #[error("Failed to establish storage session: {0}")]
    Session(String),

    #[error("Failed to transfer object: {0}")]
    Transfer(String),
}

/// Failure of a single variant. Never aborts sibling variants.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VariantError {
    #[error("Transform failed: {0}")]
    Transform(String),

    #[error("Failed to write variant: {0}")]
    StorageWrite(String),

    #[error("Failed to establish storage session: {0}")]
    UploadSession(String),

    #[error("Failed to upload variant: {0}")]
    UploadTransfer(String),

    #[error("Variant timed out after {0:?}")]
    TimedOut(std::time::Duration),

    #[error("Variant task aborted: {0}")]
    Aborted(String),
}

impl VariantError {
    /// Stable machine-readable tag.
    pub fn kind(&self) -> &'static str {
        match self {
            VariantError::Transform(_) => "transform",
            VariantError::StorageWrite(_) => "storage_write",
            VariantError::UploadSession(_) => "upload_session",
            VariantError::UploadTransfer(_) => "upload_transfer",
            VariantError::TimedOut(_) => "timed_out",
            VariantError::Aborted(_) => "aborted",
        }
    }
}

impl From<UploadError> for VariantError {
    fn from(e: UploadError) -> Self {
        match e {
            UploadError::Session(msg) => VariantError::UploadSession(msg),
            UploadError::Transfer(msg) => VariantError::UploadTransfer(msg),
        }
    }
}

impl From<std::io::Error> for VariantError {
    fn from(e: std::io::Error) -> Self {
        VariantError::StorageWrite(e.to_string())
    }
}

#[derive(Error, Debug)]
pub enum JobError {
    #[error("Planning failed: {0}")]
    Planning(#[from] PlanningError),

    #[error("All {} variants failed", failures.len())]
    AllVariantsFailed { failures: Vec<VariantFailure> },

    #[error("Remote storage is not configured")]
    RemoteDisabled,
}
