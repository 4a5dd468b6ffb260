//! Typed access to the remote account, database, and storage service.

pub mod client;
pub mod entities;
pub mod error;
pub mod http;
#[cfg(any(test, feature = "test-support"))]
pub mod memory;
pub mod query;
pub mod types;

pub use client::{Backend, CURRENT_SESSION};
pub use entities::{user_fields, video_fields, Creator, Identity, VideoPost};
pub use error::{BackendError, BackendResult};
pub use http::HttpBackend;
pub use query::Query;
pub use types::{
    unique_id, Account, Document, DocumentList, FileUpload, Gravity, PreviewOptions, Session,
    StoredFile,
};
