//! Terminal step of every variant: where the encoded bytes end up.
//!
//! A pipeline owns exactly one sink, so a job never mixes local paths and
//! remote URLs.

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::VariantError;
use crate::services::naming::variant_file_name;
use crate::services::storage::ObjectStore;

#[async_trait]
pub trait VariantSink: Send + Sync {
    /// Persist one encoded variant and return its location.
    async fn persist(
        &self,
        prefix: &str,
        variant: &str,
        data: Vec<u8>,
    ) -> Result<String, VariantError>;

    fn kind(&self) -> &'static str;
}

/// Writes `{root}/{prefix}_{variant}.jpg` and returns that path.
#[derive(Debug, Clone)]
pub struct LocalSink {
    root: PathBuf,
}

impl LocalSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, prefix: &str, variant: &str) -> PathBuf {
        self.root.join(variant_file_name(prefix, variant))
    }

    pub async fn write(
        &self,
        prefix: &str,
        variant: &str,
        data: &[u8],
    ) -> Result<PathBuf, VariantError> {
        let path = self.path_for(prefix, variant);
        tokio::fs::write(&path, data).await.map_err(|e| {
            VariantError::StorageWrite(format!("Failed to write {}: {}", path.display(), e))
        })?;
        Ok(path)
    }
}

#[async_trait]
impl VariantSink for LocalSink {
    async fn persist(
        &self,
        prefix: &str,
        variant: &str,
        data: Vec<u8>,
    ) -> Result<String, VariantError> {
        let path = self.write(prefix, variant, &data).await?;
        Ok(path.to_string_lossy().into_owned())
    }

    fn kind(&self) -> &'static str {
        "local"
    }
}

/// Stages the variant on disk, then uploads the staged file under
/// `{key_prefix}{prefix}_{variant}.jpg` and returns the public URL.
///
/// Staged files are left in place; they share the local sink's naming.
pub struct RemoteSink {
    staging: LocalSink,
    store: Arc<dyn ObjectStore>,
    key_prefix: String,
}

impl RemoteSink {
    pub fn new(
        staging_root: impl Into<PathBuf>,
        store: Arc<dyn ObjectStore>,
        key_prefix: impl Into<String>,
    ) -> Self {
        Self {
            staging: LocalSink::new(staging_root),
            store,
            key_prefix: key_prefix.into(),
        }
    }

    pub fn object_key(&self, prefix: &str, variant: &str) -> String {
        format!("{}{}", self.key_prefix, variant_file_name(prefix, variant))
    }
}

#[async_trait]
impl VariantSink for RemoteSink {
    async fn persist(
        &self,
        prefix: &str,
        variant: &str,
        data: Vec<u8>,
    ) -> Result<String, VariantError> {
        let staged = self.staging.write(prefix, variant, &data).await?;
        drop(data);

        let body = ByteStream::from_path(&staged).await.map_err(|e| {
            VariantError::StorageWrite(format!(
                "Failed to open staged variant {}: {}",
                staged.display(),
                e
            ))
        })?;

        let key = self.object_key(prefix, variant);
        let url = self
            .store
            .put_object(&key, mime::IMAGE_JPEG.as_ref(), body)
            .await?;
        Ok(url)
    }

    fn kind(&self) -> &'static str {
        "remote"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UploadError;
    use crate::test_helpers::MockObjectStore;

    #[tokio::test]
    async fn test_local_sink_writes_deterministic_path() {
        let dir = tempfile::tempdir().unwrap();
        let sink = LocalSink::new(dir.path());

        let location = sink.persist("My_Photo", "original", vec![1, 2, 3]).await.unwrap();

        let expected = dir.path().join("My_Photo_original.jpg");
        assert_eq!(location, expected.to_string_lossy());
        assert_eq!(std::fs::read(expected).unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_local_sink_missing_root_is_storage_write_error() {
        let dir = tempfile::tempdir().unwrap();
        let sink = LocalSink::new(dir.path().join("does-not-exist"));

        let err = sink.persist("cat", "original", vec![0]).await.unwrap_err();
        assert_eq!(err.kind(), "storage_write");
    }

    #[tokio::test]
    async fn test_remote_sink_stages_and_uploads() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MockObjectStore::new());
        let sink = RemoteSink::new(dir.path(), store.clone(), "imaginary/");

        let url = sink.persist("cat", "10-50KB", vec![9, 9]).await.unwrap();

        assert_eq!(url, "https://mock-bucket.s3.amazonaws.com/imaginary/cat_10-50KB.jpg");
        assert_eq!(store.object("imaginary/cat_10-50KB.jpg"), Some(vec![9, 9]));
        assert_eq!(
            store.content_type("imaginary/cat_10-50KB.jpg").as_deref(),
            Some("image/jpeg")
        );
        assert!(dir.path().join("cat_10-50KB.jpg").exists());
    }

    #[tokio::test]
    async fn test_remote_sink_distinguishes_upload_failures() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MockObjectStore::new());
        store.fail_key(
            "imaginary/cat_original.jpg",
            UploadError::Session("no credentials".into()),
        );
        store.fail_key(
            "imaginary/cat_10-50KB.jpg",
            UploadError::Transfer("connection reset".into()),
        );
        let sink = RemoteSink::new(dir.path(), store, "imaginary/");

        let session = sink.persist("cat", "original", vec![1]).await.unwrap_err();
        let transfer = sink.persist("cat", "10-50KB", vec![1]).await.unwrap_err();

        assert_eq!(session, VariantError::UploadSession("no credentials".into()));
        assert_eq!(transfer, VariantError::UploadTransfer("connection reset".into()));
    }
}
