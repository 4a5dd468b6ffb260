use std::path::PathBuf;

use aora_backend::BackendError;
use thiserror::Error;

use crate::asset::AssetKind;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("draft is missing its {0}")]
    IncompleteDraft(&'static str),
    #[error("{name} has type {mime_type}, expected {expected} media")]
    InvalidAssetType {
        name: String,
        mime_type: String,
        expected: AssetKind,
    },
    #[error("could not read {}: {source}", .path.display())]
    ReadAsset {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{kind} upload failed: {source}")]
    Upload {
        kind: AssetKind,
        #[source]
        source: BackendError,
    },
    /// Both files are stored remotely; only the post record is missing.
    #[error("post creation failed after upload: {source}")]
    Document {
        thumbnail_url: String,
        video_url: String,
        #[source]
        source: BackendError,
    },
    #[error("draft {draft_id} is already published")]
    AlreadyPublished { draft_id: String },
}
