use async_trait::async_trait;
use serde_json::Value;

use crate::error::BackendResult;
use crate::query::Query;
use crate::types::{Account, Document, DocumentList, FileUpload, PreviewOptions, Session, StoredFile};

/// Session id that addresses the session attached to this client.
pub const CURRENT_SESSION: &str = "current";

/// Typed facade over the remote account, database, and storage primitives.
///
/// Every operation maps to exactly one remote call and reports failures as
/// [`BackendError`](crate::BackendError). Implementations never retry and
/// never cache; resilience policy belongs to the callers.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn create_account(
        &self,
        account_id: &str,
        email: &str,
        password: &str,
        name: &str,
    ) -> BackendResult<Account>;

    /// Exchange credentials for a session and attach it to this client.
    async fn create_session(&self, email: &str, password: &str) -> BackendResult<Session>;

    /// End a session; [`CURRENT_SESSION`] addresses the attached one.
    async fn delete_session(&self, session_id: &str) -> BackendResult<()>;

    /// Account of the attached session.
    async fn get_account(&self) -> BackendResult<Account>;

    async fn create_document(
        &self,
        collection_id: &str,
        document_id: &str,
        data: Value,
    ) -> BackendResult<Document>;

    async fn list_documents(
        &self,
        collection_id: &str,
        queries: &[Query],
    ) -> BackendResult<DocumentList>;

    async fn create_file(&self, file_id: &str, upload: FileUpload) -> BackendResult<StoredFile>;

    /// Public URL serving the stored file as-is.
    async fn get_file_view(&self, file_id: &str) -> BackendResult<String>;

    /// Public URL of a resized, cropped rendition of a stored image.
    async fn get_file_preview(
        &self,
        file_id: &str,
        options: &PreviewOptions,
    ) -> BackendResult<String>;

    /// URL of an avatar image rendering the initials of `name`.
    fn initials_avatar_url(&self, name: &str) -> String;
}
