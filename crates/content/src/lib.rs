//! Video feed reads and the per-query cache the UI renders from.

mod error;
mod repository;
mod store;

pub use error::RepositoryError;
pub use repository::ContentRepository;
pub use store::{PostStore, MAX_KEYED_RESULTS, PostsState, QueryResult, QueryStatus, RefreshStatus};
