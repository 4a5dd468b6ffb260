use std::sync::Arc;

use aora_backend::{video_fields, Backend, Query, VideoPost};
use aora_config::AppConfig;
use tracing::debug;

use crate::error::RepositoryError;

/// Read-only queries over the video collection. Never retries.
#[derive(Clone)]
pub struct ContentRepository {
    backend: Arc<dyn Backend>,
    video_collection_id: String,
    latest_limit: u32,
}

impl ContentRepository {
    pub fn new(backend: Arc<dyn Backend>, config: &AppConfig) -> Self {
        Self {
            backend,
            video_collection_id: config.backend.video_collection_id.clone(),
            latest_limit: config.feed.latest_limit,
        }
    }

    pub fn latest_limit(&self) -> u32 {
        self.latest_limit
    }

    pub async fn list_all(&self) -> Result<Vec<VideoPost>, RepositoryError> {
        self.list(&[]).await
    }

    /// Newest posts first, at most `limit` of them.
    pub async fn list_latest(&self, limit: u32) -> Result<Vec<VideoPost>, RepositoryError> {
        let mut posts = self
            .list(&[
                Query::order_desc(video_fields::CREATED_AT),
                Query::limit(limit),
            ])
            .await?;
        posts.truncate(limit as usize);
        Ok(posts)
    }

    pub async fn latest(&self) -> Result<Vec<VideoPost>, RepositoryError> {
        self.list_latest(self.latest_limit).await
    }

    pub async fn list_by_user(&self, user_id: &str) -> Result<Vec<VideoPost>, RepositoryError> {
        self.list(&[Query::equal(video_fields::CREATOR, user_id)])
            .await
    }

    /// Full-text match on titles. A blank query matches nothing.
    pub async fn search(&self, text: &str) -> Result<Vec<VideoPost>, RepositoryError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(Vec::new());
        }
        self.list(&[Query::search(video_fields::TITLE, text)]).await
    }

    async fn list(&self, queries: &[Query]) -> Result<Vec<VideoPost>, RepositoryError> {
        let list = self
            .backend
            .list_documents(&self.video_collection_id, queries)
            .await?;
        debug!(
            collection = %self.video_collection_id,
            returned = list.documents.len(),
            total = list.total,
            "listed videos"
        );

        list.documents
            .iter()
            .map(|document| {
                document
                    .decode::<VideoPost>()
                    .map_err(|source| RepositoryError::Decode {
                        id: document.id.clone(),
                        source,
                    })
            })
            .collect()
    }
}
