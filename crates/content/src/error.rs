use aora_backend::BackendError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("feed request failed: {0}")]
    Backend(#[from] BackendError),
    #[error("malformed video document {id}: {source}")]
    Decode {
        id: String,
        #[source]
        source: BackendError,
    },
}
