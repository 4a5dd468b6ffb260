use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use aora_backend::VideoPost;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::RepositoryError;
use crate::repository::ContentRepository;

/// Keyed results kept per map (`user`, `search`) before the least recently
/// requested settled ones are dropped.
pub const MAX_KEYED_RESULTS: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryStatus {
    #[default]
    Idle,
    Loading,
    Success,
    Error,
}

/// Cached outcome of one logical query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult<T> {
    /// Items of the last successful fetch, kept while a new one is loading.
    pub items: Vec<T>,
    pub status: QueryStatus,
    pub error: Option<String>,
    token: u64,
}

impl<T> Default for QueryResult<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            status: QueryStatus::Idle,
            error: None,
            token: 0,
        }
    }
}

impl<T> QueryResult<T> {
    pub fn is_loading(&self) -> bool {
        self.status == QueryStatus::Loading
    }

    pub fn is_error(&self) -> bool {
        self.status == QueryStatus::Error
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostsState {
    pub all: QueryResult<VideoPost>,
    pub latest: QueryResult<VideoPost>,
    /// Keyed by creator id. Bounded by [`MAX_KEYED_RESULTS`].
    pub user: HashMap<String, QueryResult<VideoPost>>,
    /// Keyed by trimmed search text. Bounded by [`MAX_KEYED_RESULTS`].
    pub search: HashMap<String, QueryResult<VideoPost>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RefreshStatus {
    pub loading: bool,
    pub errored: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Slot {
    All,
    Latest,
    User(String),
    Search(String),
}

impl PostsState {
    fn slot_mut(&mut self, slot: &Slot) -> &mut QueryResult<VideoPost> {
        match slot {
            Slot::All => &mut self.all,
            Slot::Latest => &mut self.latest,
            Slot::User(id) => self.user.entry(id.clone()).or_default(),
            Slot::Search(text) => self.search.entry(text.clone()).or_default(),
        }
    }

    fn existing_mut(&mut self, slot: &Slot) -> Option<&mut QueryResult<VideoPost>> {
        match slot {
            Slot::All => Some(&mut self.all),
            Slot::Latest => Some(&mut self.latest),
            Slot::User(id) => self.user.get_mut(id),
            Slot::Search(text) => self.search.get_mut(text),
        }
    }

    fn evict_beyond_capacity(&mut self, slot: &Slot) {
        match slot {
            Slot::User(id) => evict_settled(&mut self.user, id),
            Slot::Search(text) => evict_settled(&mut self.search, text),
            Slot::All | Slot::Latest => {}
        }
    }

    fn slot(&self, slot: &Slot) -> QueryResult<VideoPost> {
        match slot {
            Slot::All => self.all.clone(),
            Slot::Latest => self.latest.clone(),
            Slot::User(id) => self.user.get(id).cloned().unwrap_or_default(),
            Slot::Search(text) => self.search.get(text).cloned().unwrap_or_default(),
        }
    }
}

/// Drop the least recently requested entries until the map fits. `keep` and
/// entries still loading are never dropped.
fn evict_settled(results: &mut HashMap<String, QueryResult<VideoPost>>, keep: &str) {
    while results.len() > MAX_KEYED_RESULTS {
        let oldest = results
            .iter()
            .filter(|(key, result)| key.as_str() != keep && !result.is_loading())
            .min_by_key(|(_, result)| result.token)
            .map(|(key, _)| key.clone());
        match oldest {
            Some(key) => {
                debug!(key = %key, "evicting cached feed query");
                results.remove(&key);
            }
            None => break,
        }
    }
}

/// Per-query cache of feed results.
///
/// Every fetch takes a fresh token for its slot; a response is applied only
/// while its token is still the slot's newest, so the last issued request
/// wins and older ones are dropped.
#[derive(Clone)]
pub struct PostStore {
    repository: ContentRepository,
    state: Arc<watch::Sender<PostsState>>,
    tokens: Arc<AtomicU64>,
}

impl PostStore {
    pub fn new(repository: ContentRepository) -> Self {
        let (state, _) = watch::channel(PostsState::default());
        Self {
            repository,
            state: Arc::new(state),
            tokens: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn snapshot(&self) -> PostsState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PostsState> {
        self.state.subscribe()
    }

    pub fn all(&self) -> QueryResult<VideoPost> {
        self.state.borrow().all.clone()
    }

    pub fn latest(&self) -> QueryResult<VideoPost> {
        self.state.borrow().latest.clone()
    }

    pub fn user_posts(&self, user_id: &str) -> QueryResult<VideoPost> {
        self.state.borrow().slot(&Slot::User(user_id.to_string()))
    }

    pub fn search_results(&self, text: &str) -> QueryResult<VideoPost> {
        self.state.borrow().slot(&Slot::Search(text.trim().to_string()))
    }

    pub async fn fetch_all_posts(&self) -> QueryResult<VideoPost> {
        let slot = Slot::All;
        let token = self.begin(&slot);
        let outcome = self.repository.list_all().await;
        self.finish(&slot, token, outcome)
    }

    pub async fn fetch_latest_posts(&self) -> QueryResult<VideoPost> {
        let slot = Slot::Latest;
        let token = self.begin(&slot);
        let outcome = self.repository.latest().await;
        self.finish(&slot, token, outcome)
    }

    pub async fn fetch_user_posts(&self, user_id: &str) -> QueryResult<VideoPost> {
        let slot = Slot::User(user_id.to_string());
        let token = self.begin(&slot);
        let outcome = self.repository.list_by_user(user_id).await;
        self.finish(&slot, token, outcome)
    }

    pub async fn search_posts(&self, text: &str) -> QueryResult<VideoPost> {
        let slot = Slot::Search(text.trim().to_string());
        let token = self.begin(&slot);
        let outcome = self.repository.search(text).await;
        self.finish(&slot, token, outcome)
    }

    /// Refetch all posts, then the latest posts.
    pub async fn refresh(&self) -> RefreshStatus {
        self.fetch_all_posts().await;
        self.fetch_latest_posts().await;

        let state = self.state.borrow();
        RefreshStatus {
            loading: state.all.is_loading() || state.latest.is_loading(),
            errored: state.all.is_error() || state.latest.is_error(),
        }
    }

    fn begin(&self, slot: &Slot) -> u64 {
        let token = self.tokens.fetch_add(1, Ordering::Relaxed) + 1;
        self.state.send_modify(|state| {
            let entry = state.slot_mut(slot);
            entry.status = QueryStatus::Loading;
            entry.error = None;
            entry.token = token;
            state.evict_beyond_capacity(slot);
        });
        token
    }

    fn finish(
        &self,
        slot: &Slot,
        token: u64,
        outcome: Result<Vec<VideoPost>, RepositoryError>,
    ) -> QueryResult<VideoPost> {
        let applied = self.state.send_if_modified(|state| {
            let Some(entry) = state.existing_mut(slot) else {
                return false;
            };
            if entry.token != token {
                return false;
            }
            match outcome {
                Ok(items) => {
                    entry.items = items;
                    entry.status = QueryStatus::Success;
                    entry.error = None;
                }
                Err(error) => {
                    warn!(slot = ?slot, error = %error, "feed query failed");
                    entry.status = QueryStatus::Error;
                    entry.error = Some(error.to_string());
                }
            }
            true
        });

        if !applied {
            debug!(slot = ?slot, token, "dropping stale response");
        }
        self.state.borrow().slot(slot)
    }
}
