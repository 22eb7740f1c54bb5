use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use bytes::Bytes;
use time::OffsetDateTime;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::storage::StorageClient;

const ALLOWED: [&str; 4] = ["jpeg", "jpg", "png", "gif"];

pub struct ImageUpload {
    pub body: Bytes,
    pub file_name: String,
    pub content_type: String,
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Invalid file type. Only JPEG, PNG, and GIF are allowed.")]
    InvalidFileType,
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Accepts image uploads and hands the bytes to a storage backend.
#[derive(Clone)]
pub struct UploadHandler {
    storage: Arc<dyn StorageClient>,
}

impl UploadHandler {
    pub fn new(storage: Arc<dyn StorageClient>) -> Self {
        Self { storage }
    }

    /// Returns the normalized extension when both the file name and the
    /// declared content type name an allowed image type.
    pub fn check(&self, upload: &ImageUpload) -> Result<String, UploadError> {
        let ext = ext_from_name(&upload.file_name).ok_or(UploadError::InvalidFileType)?;
        let subtype = subtype_from_mime(&upload.content_type).ok_or(UploadError::InvalidFileType)?;
        if ALLOWED.contains(&ext.as_str()) && ALLOWED.contains(&subtype.as_str()) {
            Ok(ext)
        } else {
            Err(UploadError::InvalidFileType)
        }
    }

    pub async fn store(&self, upload: ImageUpload) -> Result<String, UploadError> {
        let ext = self.check(&upload)?;
        let name = unique_name(&ext);
        let path = self
            .storage
            .put_object(&name, upload.body, &upload.content_type)
            .await
            .with_context(|| format!("store upload {}", name))?;
        debug!(%path, original = %upload.file_name, "image stored");
        Ok(path)
    }

    /// Best-effort removal of a stored file whose record update failed.
    pub async fn discard(&self, path: &str) {
        if let Err(e) = self.storage.delete_object(path).await {
            warn!(error = %e, %path, "could not remove orphaned upload");
        }
    }
}

fn ext_from_name(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

fn subtype_from_mime(ct: &str) -> Option<String> {
    let essence = ct.split(';').next()?.trim().to_ascii_lowercase();
    essence.strip_prefix("image/").map(str::to_string)
}

fn unique_name(ext: &str) -> String {
    let millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
    format!("{}-{}.{}", millis, Uuid::new_v4(), ext)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records every call instead of touching disk.
    #[derive(Default)]
    pub(crate) struct FakeStorage {
        pub stored: Mutex<Vec<String>>,
        pub deleted: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl StorageClient for FakeStorage {
        async fn put_object(&self, name: &str, _b: Bytes, _ct: &str) -> anyhow::Result<String> {
            let path = format!("images/{}", name);
            self.stored.lock().unwrap().push(path.clone());
            Ok(path)
        }
        async fn delete_object(&self, path: &str) -> anyhow::Result<()> {
            self.deleted.lock().unwrap().push(path.to_string());
            Ok(())
        }
    }

    fn upload(file_name: &str, content_type: &str) -> ImageUpload {
        ImageUpload {
            body: Bytes::from_static(b"GIF89a"),
            file_name: file_name.into(),
            content_type: content_type.into(),
        }
    }

    #[test]
    fn test_ext_from_name() {
        assert_eq!(ext_from_name("me.PNG").as_deref(), Some("png"));
        assert_eq!(ext_from_name("a.b.jpeg").as_deref(), Some("jpeg"));
        assert_eq!(ext_from_name("noext"), None);
        assert_eq!(ext_from_name(".gif"), None);
    }

    #[test]
    fn test_subtype_from_mime() {
        assert_eq!(subtype_from_mime("image/gif").as_deref(), Some("gif"));
        assert_eq!(subtype_from_mime("Image/JPEG; q=1").as_deref(), Some("jpeg"));
        assert_eq!(subtype_from_mime("application/octet-stream"), None);
    }

    #[test]
    fn check_requires_name_and_mime_to_agree_on_images() {
        let h = UploadHandler::new(Arc::new(FakeStorage::default()));
        assert_eq!(h.check(&upload("cat.JPG", "image/jpeg")).unwrap(), "jpg");
        assert_eq!(h.check(&upload("cat.gif", "image/gif")).unwrap(), "gif");
        assert!(h.check(&upload("cat.png", "image/png")).is_ok());

        for (name, ct) in [
            ("cat.webp", "image/webp"),
            ("cat.png", "application/octet-stream"),
            ("cat.exe", "image/png"),
            ("cat", "image/png"),
            ("cat.svg", "image/svg+xml"),
        ] {
            assert!(
                matches!(h.check(&upload(name, ct)), Err(UploadError::InvalidFileType)),
                "{name} / {ct} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn store_generates_unique_paths() {
        let fake = Arc::new(FakeStorage::default());
        let h = UploadHandler::new(fake.clone());

        let a = h.store(upload("me.png", "image/png")).await.unwrap();
        let b = h.store(upload("me.png", "image/png")).await.unwrap();
        assert_ne!(a, b);
        assert!(a.starts_with("images/") && a.ends_with(".png"));
        assert_eq!(fake.stored.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn rejected_upload_is_never_stored() {
        let fake = Arc::new(FakeStorage::default());
        let h = UploadHandler::new(fake.clone());

        let err = h.store(upload("doc.pdf", "application/pdf")).await.unwrap_err();
        assert!(matches!(err, UploadError::InvalidFileType));
        assert!(fake.stored.lock().unwrap().is_empty());
    }
}
