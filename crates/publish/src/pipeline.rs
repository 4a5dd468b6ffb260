use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use aora_backend::{
    unique_id, video_fields, Backend, FileUpload, PreviewOptions, VideoPost,
};
use aora_config::AppConfig;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::asset::{AssetKind, MediaAsset};
use crate::error::PublishError;

/// A post waiting to be published.
///
/// `draft_id` keys every remote write of the post, so publishing the same
/// draft again after a partial failure reuses files already uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draft {
    pub draft_id: String,
    pub title: String,
    pub prompt: String,
    pub thumbnail: MediaAsset,
    pub video: MediaAsset,
    /// Profile document id of the creator.
    pub user_id: String,
}

impl Draft {
    pub fn new(
        title: impl Into<String>,
        prompt: impl Into<String>,
        thumbnail: MediaAsset,
        video: MediaAsset,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            draft_id: unique_id(),
            title: title.into(),
            prompt: prompt.into(),
            thumbnail,
            video,
            user_id: user_id.into(),
        }
    }

    fn validate(&self) -> Result<(), PublishError> {
        let required = [
            ("title", &self.title),
            ("prompt", &self.prompt),
            ("creator", &self.user_id),
            ("draft id", &self.draft_id),
        ];
        match required.iter().find(|(_, value)| value.trim().is_empty()) {
            Some((field, _)) => Err(PublishError::IncompleteDraft(*field)),
            None => Ok(()),
        }
    }
}

#[derive(Clone)]
pub struct PublishPipeline {
    backend: Arc<dyn Backend>,
    video_collection_id: String,
    preview: PreviewOptions,
    in_flight: Arc<AtomicUsize>,
}

impl PublishPipeline {
    pub fn new(backend: Arc<dyn Backend>, config: &AppConfig) -> Self {
        Self {
            backend,
            video_collection_id: config.backend.video_collection_id.clone(),
            preview: PreviewOptions::from(&config.media),
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Whether any publish started through this pipeline is still running.
    pub fn is_submitting(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }

    /// Upload both assets concurrently, then create the post. Nothing is
    /// recorded unless both uploads succeed.
    pub async fn publish(&self, draft: Draft) -> Result<VideoPost, PublishError> {
        draft.validate()?;
        expect_kind(&draft.thumbnail, AssetKind::Image)?;
        expect_kind(&draft.video, AssetKind::Video)?;

        let _submitting = InFlight::enter(&self.in_flight);
        info!(draft = %draft.draft_id, creator = %draft.user_id, "publishing post");

        let (thumbnail_url, video_url) = tokio::try_join!(
            self.upload(&draft.draft_id, &draft.thumbnail, AssetKind::Image),
            self.upload(&draft.draft_id, &draft.video, AssetKind::Video),
        )?;

        let created = self
            .backend
            .create_document(
                &self.video_collection_id,
                &draft.draft_id,
                json!({
                    video_fields::TITLE: draft.title,
                    video_fields::THUMBNAIL: thumbnail_url,
                    video_fields::VIDEO: video_url,
                    video_fields::PROMPT: draft.prompt,
                    video_fields::CREATOR: draft.user_id,
                }),
            )
            .await;

        let document = match created {
            Ok(document) => document,
            Err(source) if source.is_conflict() => {
                return Err(PublishError::AlreadyPublished {
                    draft_id: draft.draft_id,
                })
            }
            Err(source) => {
                warn!(draft = %draft.draft_id, error = %source, "uploaded files left without a post");
                return Err(PublishError::Document {
                    thumbnail_url,
                    video_url,
                    source,
                });
            }
        };

        let post = document
            .decode::<VideoPost>()
            .map_err(|source| PublishError::Document {
                thumbnail_url,
                video_url,
                source,
            })?;

        info!(post = %post.id, "post published");
        Ok(post)
    }

    async fn upload(
        &self,
        draft_id: &str,
        asset: &MediaAsset,
        kind: AssetKind,
    ) -> Result<String, PublishError> {
        let file_id = format!("{draft_id}-{}", slot_name(kind));
        let contents = tokio::fs::read(&asset.local_path)
            .await
            .map_err(|source| PublishError::ReadAsset {
                path: asset.local_path.clone(),
                source,
            })?;

        let upload = FileUpload::new(asset.name.clone(), asset.mime_type.clone(), contents);
        match self.backend.create_file(&file_id, upload).await {
            Ok(file) => debug!(file = %file.id, size = file.size, "stored {kind}"),
            Err(source) if source.is_conflict() => {
                debug!(file = %file_id, "{kind} already uploaded, reusing it")
            }
            Err(source) => return Err(PublishError::Upload { kind, source }),
        }

        let url = match kind {
            AssetKind::Image => self.backend.get_file_preview(&file_id, &self.preview).await,
            AssetKind::Video => self.backend.get_file_view(&file_id).await,
        };
        url.map_err(|source| PublishError::Upload { kind, source })
    }
}

fn slot_name(kind: AssetKind) -> &'static str {
    match kind {
        AssetKind::Image => "thumbnail",
        AssetKind::Video => "video",
    }
}

fn expect_kind(asset: &MediaAsset, expected: AssetKind) -> Result<(), PublishError> {
    if asset.kind() == Some(expected) {
        return Ok(());
    }
    Err(PublishError::InvalidAssetType {
        name: asset.name.clone(),
        mime_type: asset.mime_type.clone(),
        expected,
    })
}

struct InFlight(Arc<AtomicUsize>);

impl InFlight {
    fn enter(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(counter))
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
