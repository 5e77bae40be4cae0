//! Product image files.

use async_trait::async_trait;
use std::path::PathBuf;
use tracing::info;
use uuid::Uuid;

use crate::domain::aggregates::product::MAX_IMAGE_URL_LEN;
use crate::{EcommerceError, Result};

/// Public URL prefix under which stored images are served.
pub const IMAGE_URL_PREFIX: &str = "/Images";

const UUID_LEN: usize = 36;

/// Longest sanitized name that still fits `/Images/<uuid>_<name>` in a product's image locator.
const MAX_FILE_NAME_LEN: usize = MAX_IMAGE_URL_LEN - IMAGE_URL_PREFIX.len() - UUID_LEN - 2;

#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Persists `bytes` and returns the locator clients use to fetch the file.
    async fn store(&self, file_name: &str, bytes: &[u8]) -> Result<String>;

    /// Deletes a file previously returned by [`ImageStore::store`]. Missing files are not an error.
    async fn remove(&self, locator: &str) -> Result<()>;
}

/// Writes images below `<root>/Images`.
#[derive(Clone, Debug)]
pub struct LocalImageStore {
    root: PathBuf,
}

impl LocalImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self { Self { root: root.into() } }

    /// Directory that backs [`IMAGE_URL_PREFIX`].
    pub fn images_dir(&self) -> PathBuf { self.root.join("Images") }
}

/// Keeps the final path component, replaces anything outside `[A-Za-z0-9._-]`
/// and shortens the stem so the name fits [`MAX_FILE_NAME_LEN`].
fn sanitize(file_name: &str) -> String {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base.chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect();
    let trimmed = cleaned.trim_start_matches('.');
    if trimmed.is_empty() { "image".to_string() } else { truncate(trimmed, MAX_FILE_NAME_LEN) }
}

// Input is ASCII, so byte offsets are char boundaries.
fn truncate(name: &str, max: usize) -> String {
    if name.len() <= max {
        return name.to_string();
    }
    match name.rfind('.') {
        Some(dot) if name.len() - dot < max => {
            let ext = &name[dot..];
            format!("{}{ext}", &name[..max - ext.len()])
        }
        _ => name[..max].to_string(),
    }
}

#[async_trait]
impl ImageStore for LocalImageStore {
    async fn store(&self, file_name: &str, bytes: &[u8]) -> Result<String> {
        let dir = self.images_dir();
        tokio::fs::create_dir_all(&dir).await.map_err(EcommerceError::storage)?;
        let unique = format!("{}_{}", Uuid::new_v4(), sanitize(file_name));
        tokio::fs::write(dir.join(&unique), bytes).await.map_err(EcommerceError::storage)?;
        info!(file = %unique, size = bytes.len(), "Stored product image");
        Ok(format!("{IMAGE_URL_PREFIX}/{unique}"))
    }

    async fn remove(&self, locator: &str) -> Result<()> {
        let name = locator.strip_prefix(IMAGE_URL_PREFIX).and_then(|rest| rest.strip_prefix('/')).unwrap_or_default();
        if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
            return Err(EcommerceError::invalid(format!("not a stored image locator: {locator}")));
        }
        match tokio::fs::remove_file(self.images_dir().join(name)).await {
            Ok(()) => {
                info!(file = %name, "Removed product image");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(EcommerceError::storage(e)),
        }
    }
}
