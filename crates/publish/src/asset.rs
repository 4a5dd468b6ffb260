use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::PublishError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Image,
    Video,
}

impl AssetKind {
    pub fn from_mime(mime_type: &str) -> Option<Self> {
        match mime_type.split('/').next()?.trim().to_ascii_lowercase().as_str() {
            "image" => Some(AssetKind::Image),
            "video" => Some(AssetKind::Video),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AssetKind::Image => "image",
            AssetKind::Video => "video",
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A local file picked for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaAsset {
    pub local_path: PathBuf,
    pub mime_type: String,
    pub size_bytes: u64,
    pub name: String,
}

impl MediaAsset {
    pub fn new(
        local_path: impl Into<PathBuf>,
        mime_type: impl Into<String>,
        size_bytes: u64,
        name: impl Into<String>,
    ) -> Self {
        Self {
            local_path: local_path.into(),
            mime_type: mime_type.into(),
            size_bytes,
            name: name.into(),
        }
    }

    /// Describe a local file, guessing its type from the extension.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, PublishError> {
        let path = path.as_ref();
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|source| PublishError::ReadAsset {
                path: path.to_path_buf(),
                source,
            })?;

        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mime_type = mime_guess::from_path(path).first_or_octet_stream();

        Ok(Self::new(path, mime_type.essence_str(), metadata.len(), name))
    }

    pub fn kind(&self) -> Option<AssetKind> {
        AssetKind::from_mime(&self.mime_type)
    }
}
