//! In-process [`Backend`] used by tests across the workspace.
//!
//! Mirrors the remote's observable rules (one session per client, unique ids,
//! credential checks, query evaluation) and lets tests inject failures and
//! latency per operation.

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use reqwest::Url;
use serde_json::{Map, Value};
use tokio::sync::Mutex;

use crate::client::{Backend, CURRENT_SESSION};
use crate::error::{BackendError, BackendResult};
use crate::query::Query;
use crate::types::{
    unique_id, Account, Document, DocumentList, FileUpload, PreviewOptions, Session, StoredFile,
};

const BASE_URL: &str = "https://backend.test/v1";
const BUCKET: &str = "media";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateAccount,
    CreateSession,
    DeleteSession,
    GetAccount,
    CreateDocument,
    ListDocuments,
    CreateFile,
    GetFileView,
    GetFilePreview,
}

#[derive(Debug, Clone)]
struct Failure {
    status: u16,
    message: String,
}

struct StoredAccount {
    account: Account,
    password: String,
}

#[derive(Default)]
struct State {
    accounts: Vec<StoredAccount>,
    sessions: HashMap<String, String>,
    current: Option<Session>,
    sessions_created: usize,
    collections: HashMap<String, Vec<Document>>,
    files: Vec<(StoredFile, Bytes)>,
    failures: HashMap<Operation, Failure>,
    failing_uploads: HashSet<String>,
    latencies: HashMap<Operation, VecDeque<Duration>>,
    last_created_at: Option<DateTime<Utc>>,
    calls: Vec<Operation>,
}

impl State {
    fn next_created_at(&mut self) -> DateTime<Utc> {
        let mut now = Utc::now();
        if let Some(last) = self.last_created_at {
            if now <= last {
                now = last + chrono::Duration::milliseconds(1);
            }
        }
        self.last_created_at = Some(now);
        now
    }

    fn file(&self, file_id: &str) -> Option<&StoredFile> {
        self.files
            .iter()
            .map(|(file, _)| file)
            .find(|file| file.id == file_id)
    }
}

#[derive(Default)]
pub struct InMemoryBackend {
    state: Mutex<State>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following call of `operation` fail with `status`.
    pub async fn fail(&self, operation: Operation, status: u16, message: impl Into<String>) {
        self.state.lock().await.failures.insert(
            operation,
            Failure {
                status,
                message: message.into(),
            },
        );
    }

    /// Reject uploads whose file name is `name`; other uploads keep working.
    pub async fn fail_uploads_named(&self, name: impl Into<String>) {
        self.state.lock().await.failing_uploads.insert(name.into());
    }

    pub async fn clear_failures(&self) {
        let mut state = self.state.lock().await;
        state.failures.clear();
        state.failing_uploads.clear();
    }

    /// Delay the next calls of `operation`, one queued duration per call.
    pub async fn queue_latency(&self, operation: Operation, delays: impl IntoIterator<Item = Duration>) {
        self.state
            .lock()
            .await
            .latencies
            .entry(operation)
            .or_default()
            .extend(delays);
    }

    /// Insert a document with an explicit creation time, bypassing failures.
    pub async fn seed_document(
        &self,
        collection_id: &str,
        document_id: &str,
        created_at: DateTime<Utc>,
        data: Value,
    ) -> Document {
        let document = Document {
            id: document_id.to_string(),
            created_at,
            updated_at: None,
            fields: into_fields(data),
        };
        self.state
            .lock()
            .await
            .collections
            .entry(collection_id.to_string())
            .or_default()
            .push(document.clone());
        document
    }

    pub async fn documents(&self, collection_id: &str) -> Vec<Document> {
        self.state
            .lock()
            .await
            .collections
            .get(collection_id)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn files(&self) -> Vec<StoredFile> {
        self.state
            .lock()
            .await
            .files
            .iter()
            .map(|(file, _)| file.clone())
            .collect()
    }

    pub async fn accounts(&self) -> Vec<Account> {
        self.state
            .lock()
            .await
            .accounts
            .iter()
            .map(|stored| stored.account.clone())
            .collect()
    }

    pub async fn current_session(&self) -> Option<Session> {
        self.state.lock().await.current.clone()
    }

    /// Sessions alive on the remote side, attached or not.
    pub async fn active_session_count(&self) -> usize {
        self.state.lock().await.sessions.len()
    }

    pub async fn sessions_created(&self) -> usize {
        self.state.lock().await.sessions_created
    }

    pub async fn calls(&self) -> Vec<Operation> {
        self.state.lock().await.calls.clone()
    }

    pub async fn call_count(&self, operation: Operation) -> usize {
        self.state
            .lock()
            .await
            .calls
            .iter()
            .filter(|call| **call == operation)
            .count()
    }

    async fn enter(&self, operation: Operation) -> BackendResult<()> {
        let delay = {
            let mut state = self.state.lock().await;
            state.calls.push(operation);
            state
                .latencies
                .get_mut(&operation)
                .and_then(|queue| queue.pop_front())
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let state = self.state.lock().await;
        match state.failures.get(&operation) {
            Some(failure) => Err(BackendError::Remote {
                status: failure.status,
                kind: Some("injected_failure".to_string()),
                message: failure.message.clone(),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Backend for InMemoryBackend {
    async fn create_account(
        &self,
        account_id: &str,
        email: &str,
        password: &str,
        name: &str,
    ) -> BackendResult<Account> {
        self.enter(Operation::CreateAccount).await?;
        let mut state = self.state.lock().await;

        if password.len() < 8 {
            return Err(BackendError::remote(
                400,
                "general_argument_invalid",
                "Password must be at least 8 characters",
            ));
        }
        if state
            .accounts
            .iter()
            .any(|stored| stored.account.id == account_id || stored.account.email == email)
        {
            return Err(BackendError::remote(
                409,
                "user_already_exists",
                "A user with the same id, email, or phone already exists",
            ));
        }

        let account = Account {
            id: account_id.to_string(),
            email: email.to_string(),
            name: name.to_string(),
        };
        state.accounts.push(StoredAccount {
            account: account.clone(),
            password: password.to_string(),
        });
        Ok(account)
    }

    async fn create_session(&self, email: &str, password: &str) -> BackendResult<Session> {
        self.enter(Operation::CreateSession).await?;
        let mut state = self.state.lock().await;

        if state.current.is_some() {
            return Err(BackendError::remote(
                401,
                "user_session_already_exists",
                "Creation of a session is prohibited when a session is active",
            ));
        }

        let account_id = state
            .accounts
            .iter()
            .find(|stored| stored.account.email == email && stored.password == password)
            .map(|stored| stored.account.id.clone())
            .ok_or_else(|| {
                BackendError::remote(
                    401,
                    "user_invalid_credentials",
                    "Invalid credentials. Please check the email and password.",
                )
            })?;

        let session = Session {
            id: unique_id(),
            user_id: account_id.clone(),
            expire: Some(Utc::now() + chrono::Duration::days(365)),
            current: true,
        };
        state.sessions.insert(session.id.clone(), account_id);
        state.sessions_created += 1;
        state.current = Some(session.clone());
        Ok(session)
    }

    async fn delete_session(&self, session_id: &str) -> BackendResult<()> {
        self.enter(Operation::DeleteSession).await?;
        let mut state = self.state.lock().await;

        let current = state.current.clone().ok_or_else(|| {
            BackendError::remote(
                401,
                "general_unauthorized_scope",
                "User (role: guests) missing scope (account)",
            )
        })?;

        let target = if session_id == CURRENT_SESSION {
            current.id.clone()
        } else {
            session_id.to_string()
        };

        if state.sessions.remove(&target).is_none() {
            return Err(BackendError::remote(
                404,
                "user_session_not_found",
                "The current user session could not be found.",
            ));
        }
        if target == current.id {
            state.current = None;
        }
        Ok(())
    }

    async fn get_account(&self) -> BackendResult<Account> {
        self.enter(Operation::GetAccount).await?;
        let state = self.state.lock().await;

        let session = state.current.as_ref().ok_or_else(|| {
            BackendError::remote(
                401,
                "general_unauthorized_scope",
                "User (role: guests) missing scope (account)",
            )
        })?;

        state
            .accounts
            .iter()
            .find(|stored| stored.account.id == session.user_id)
            .map(|stored| stored.account.clone())
            .ok_or_else(|| BackendError::remote(404, "user_not_found", "User not found"))
    }

    async fn create_document(
        &self,
        collection_id: &str,
        document_id: &str,
        data: Value,
    ) -> BackendResult<Document> {
        self.enter(Operation::CreateDocument).await?;
        let mut state = self.state.lock().await;

        let exists = state
            .collections
            .get(collection_id)
            .is_some_and(|documents| documents.iter().any(|document| document.id == document_id));
        if exists {
            return Err(BackendError::remote(
                409,
                "document_already_exists",
                "Document with the requested ID already exists.",
            ));
        }

        let document = Document {
            id: document_id.to_string(),
            created_at: state.next_created_at(),
            updated_at: None,
            fields: into_fields(data),
        };
        state
            .collections
            .entry(collection_id.to_string())
            .or_default()
            .push(document.clone());
        Ok(document)
    }

    async fn list_documents(
        &self,
        collection_id: &str,
        queries: &[Query],
    ) -> BackendResult<DocumentList> {
        self.enter(Operation::ListDocuments).await?;
        let state = self.state.lock().await;

        let mut documents: Vec<Document> = state
            .collections
            .get(collection_id)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .filter(|document| queries.iter().all(|query| matches_filter(document, query)))
            .collect();

        for query in queries.iter().rev() {
            match query {
                Query::OrderDesc(attribute) => documents.sort_by(|a, b| {
                    compare(&attribute_of(b, attribute), &attribute_of(a, attribute))
                }),
                Query::OrderAsc(attribute) => documents.sort_by(|a, b| {
                    compare(&attribute_of(a, attribute), &attribute_of(b, attribute))
                }),
                _ => {}
            }
        }

        let total = documents.len() as u64;
        if let Some(limit) = queries.iter().find_map(|query| match query {
            Query::Limit(limit) => Some(*limit as usize),
            _ => None,
        }) {
            documents.truncate(limit);
        }

        Ok(DocumentList { total, documents })
    }

    async fn create_file(&self, file_id: &str, upload: FileUpload) -> BackendResult<StoredFile> {
        self.enter(Operation::CreateFile).await?;
        let mut state = self.state.lock().await;

        if state.failing_uploads.contains(&upload.name) {
            return Err(BackendError::remote(
                503,
                "storage_device_unavailable",
                format!("upload of {} was rejected", upload.name),
            ));
        }
        if state.file(file_id).is_some() {
            return Err(BackendError::remote(
                409,
                "storage_file_already_exists",
                "A storage file with the requested ID already exists.",
            ));
        }

        let file = StoredFile {
            id: file_id.to_string(),
            bucket_id: BUCKET.to_string(),
            name: upload.name.clone(),
            mime_type: upload.mime_type.clone(),
            size: upload.len() as u64,
        };
        state.files.push((file.clone(), upload.contents));
        Ok(file)
    }

    async fn get_file_view(&self, file_id: &str) -> BackendResult<String> {
        self.enter(Operation::GetFileView).await?;
        let state = self.state.lock().await;
        state.file(file_id).ok_or_else(file_not_found)?;
        Ok(format!("{BASE_URL}/storage/buckets/{BUCKET}/files/{file_id}/view"))
    }

    async fn get_file_preview(
        &self,
        file_id: &str,
        options: &PreviewOptions,
    ) -> BackendResult<String> {
        self.enter(Operation::GetFilePreview).await?;
        let state = self.state.lock().await;
        state.file(file_id).ok_or_else(file_not_found)?;
        Ok(format!(
            "{BASE_URL}/storage/buckets/{BUCKET}/files/{file_id}/preview?width={}&height={}&gravity={}&quality={}",
            options.width,
            options.height,
            options.gravity.as_str(),
            options.quality
        ))
    }

    fn initials_avatar_url(&self, name: &str) -> String {
        let base = format!("{BASE_URL}/avatars/initials");
        match Url::parse(&base) {
            Ok(mut url) => {
                url.query_pairs_mut().append_pair("name", name);
                url.to_string()
            }
            Err(_) => base,
        }
    }
}

fn file_not_found() -> BackendError {
    BackendError::remote(
        404,
        "storage_file_not_found",
        "The requested file could not be found.",
    )
}

fn into_fields(data: Value) -> Map<String, Value> {
    match data {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn attribute_of(document: &Document, attribute: &str) -> Value {
    match attribute {
        "$id" => Value::String(document.id.clone()),
        "$createdAt" => Value::String(document.created_at.to_rfc3339()),
        _ => document.fields.get(attribute).cloned().unwrap_or(Value::Null),
    }
}

/// Relationship attributes compare by the related document's id.
fn scalar(value: &Value) -> Value {
    match value {
        Value::Object(map) => map.get("$id").cloned().unwrap_or(Value::Null),
        other => other.clone(),
    }
}

fn matches_filter(document: &Document, query: &Query) -> bool {
    match query {
        Query::Equal { attribute, values } => {
            let actual = scalar(&attribute_of(document, attribute));
            values.iter().any(|expected| *expected == actual)
        }
        Query::Search { attribute, text } => {
            let terms: Vec<String> = text.split_whitespace().map(str::to_lowercase).collect();
            if terms.is_empty() {
                return false;
            }
            let haystack = attribute_of(document, attribute)
                .as_str()
                .map(str::to_lowercase)
                .unwrap_or_default();
            terms.iter().any(|term| haystack.contains(term.as_str()))
        }
        _ => true,
    }
}

fn compare(a: &Value, b: &Value) -> std::cmp::Ordering {
    use std::cmp::Ordering;

    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => {
            match (DateTime::parse_from_rfc3339(x), DateTime::parse_from_rfc3339(y)) {
                (Ok(x), Ok(y)) => x.cmp(&y),
                _ => x.cmp(y),
            }
        }
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}
