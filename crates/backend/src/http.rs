//! REST implementation of [`Backend`].

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, COOKIE, ORIGIN, SET_COOKIE};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use aora_config::BackendConfig;

use crate::client::{Backend, CURRENT_SESSION};
use crate::error::{BackendError, BackendResult, RemoteErrorBody};
use crate::query::Query;
use crate::types::{Account, Document, DocumentList, FileUpload, PreviewOptions, Session, StoredFile};

const PROJECT_HEADER: &str = "x-appwrite-project";
const RESPONSE_FORMAT_HEADER: &str = "x-appwrite-response-format";
const RESPONSE_FORMAT: &str = "1.5.0";
const FALLBACK_COOKIES_HEADER: &str = "x-fallback-cookies";
const UPLOAD_ID_HEADER: &str = "x-appwrite-id";
const CONTENT_RANGE_HEADER: &str = "content-range";
const ORIGIN_SCHEME: &str = "appwrite-android";

/// Largest body the storage API accepts in one request; bigger files are sent
/// as consecutive `Content-Range` chunks.
pub const UPLOAD_CHUNK_SIZE: usize = 5 * 1024 * 1024;

pub struct HttpBackend {
    client: Client,
    endpoint: Url,
    project_id: String,
    origin: String,
    database_id: String,
    storage_id: String,
    session_cookie: RwLock<Option<String>>,
}

impl HttpBackend {
    pub fn new(config: &BackendConfig) -> BackendResult<Self> {
        let endpoint = Url::parse(&config.endpoint)
            .map_err(|error| BackendError::InvalidUrl(format!("{}: {error}", config.endpoint)))?;
        if endpoint.cannot_be_a_base() {
            return Err(BackendError::InvalidUrl(config.endpoint.clone()));
        }

        let mut builder = Client::builder().user_agent(concat!("aora-client/", env!("CARGO_PKG_VERSION")));
        if let Some(seconds) = config.request_timeout_seconds {
            builder = builder.timeout(Duration::from_secs(seconds));
        }
        let client = builder.build()?;

        debug!(endpoint = %endpoint, project = %config.project_id, "backend client ready");

        Ok(Self {
            client,
            endpoint,
            project_id: config.project_id.clone(),
            origin: format!("{ORIGIN_SCHEME}://{}", config.platform),
            database_id: config.database_id.clone(),
            storage_id: config.storage_id.clone(),
            session_cookie: RwLock::new(None),
        })
    }

    /// Whether a session credential is currently attached to this client.
    pub async fn has_session(&self) -> bool {
        self.session_cookie.read().await.is_some()
    }

    fn cookie_name(&self) -> String {
        format!("a_session_{}", self.project_id.to_lowercase())
    }

    fn endpoint_url(&self, segments: &[&str]) -> Url {
        let mut url = self.endpoint.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn documents_url(&self, collection_id: &str) -> Url {
        self.endpoint_url(&[
            "databases",
            &self.database_id,
            "collections",
            collection_id,
            "documents",
        ])
    }

    fn file_url(&self, file_id: &str, action: &str) -> Url {
        self.endpoint_url(&["storage", "buckets", &self.storage_id, "files", file_id, action])
    }

    async fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let mut request = self
            .client
            .request(method, url)
            .header(PROJECT_HEADER, &self.project_id)
            .header(RESPONSE_FORMAT_HEADER, RESPONSE_FORMAT)
            .header(ORIGIN, &self.origin);

        if let Some(cookie) = self.session_cookie.read().await.as_ref() {
            request = request.header(COOKIE, format!("{}={cookie}", self.cookie_name()));
        }

        request
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> BackendResult<T> {
        let response = Self::check_status(response).await?;
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn check_status(response: Response) -> BackendResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let parsed = serde_json::from_str::<RemoteErrorBody>(&body).ok();
        let kind = parsed.as_ref().and_then(|body| body.kind.clone());
        let message = parsed
            .and_then(|body| body.message)
            .filter(|message| !message.is_empty())
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            });

        Err(BackendError::Remote {
            status: status.as_u16(),
            kind,
            message,
        })
    }

    fn session_cookie_from(&self, headers: &HeaderMap) -> Option<String> {
        let name = self.cookie_name();

        let from_set_cookie = headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .filter_map(|value| value.split(';').next())
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(key, value)| *key == name && !value.is_empty())
            .map(|(_, value)| value.to_string());

        from_set_cookie.or_else(|| {
            headers
                .get(FALLBACK_COOKIES_HEADER)
                .and_then(|value| value.to_str().ok())
                .and_then(|raw| serde_json::from_str::<HashMap<String, String>>(raw).ok())
                .and_then(|mut cookies| cookies.remove(&name))
        })
    }

    fn file_part(upload: &FileUpload, contents: bytes::Bytes) -> BackendResult<Part> {
        Ok(Part::bytes(contents.to_vec())
            .file_name(upload.name.clone())
            .mime_str(&upload.mime_type)?)
    }
}

/// Headers of the chunk covering `start..end`. Chunks after the first name
/// the upload they continue.
fn chunk_headers(
    file_id: &str,
    start: usize,
    end: usize,
    total: usize,
) -> Vec<(&'static str, String)> {
    let range = format!("bytes {start}-{}/{total}", end - 1);
    let mut headers = vec![(CONTENT_RANGE_HEADER, range)];
    if start > 0 {
        headers.push((UPLOAD_ID_HEADER, file_id.to_string()));
    }
    headers
}

#[async_trait]
impl Backend for HttpBackend {
    async fn create_account(
        &self,
        account_id: &str,
        email: &str,
        password: &str,
        name: &str,
    ) -> BackendResult<Account> {
        debug!(account = account_id, "creating account");
        let response = self
            .request(Method::POST, self.endpoint_url(&["account"]))
            .await
            .json(&json!({
                "userId": account_id,
                "email": email,
                "password": password,
                "name": name,
            }))
            .send()
            .await?;

        Self::read_json(response).await
    }

    async fn create_session(&self, email: &str, password: &str) -> BackendResult<Session> {
        let response = self
            .request(Method::POST, self.endpoint_url(&["account", "sessions", "email"]))
            .await
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;

        let response = Self::check_status(response).await?;
        let cookie = self.session_cookie_from(response.headers());
        let body = response.bytes().await?;
        let session: Session = serde_json::from_slice(&body)?;

        if self.has_session().await {
            debug!(session = %session.id, "replacing the attached session cookie");
        }
        match cookie {
            Some(cookie) => *self.session_cookie.write().await = Some(cookie),
            None => warn!(session = %session.id, "session created without a session cookie"),
        }

        debug!(session = %session.id, account = %session.user_id, "session created");
        Ok(session)
    }

    async fn delete_session(&self, session_id: &str) -> BackendResult<()> {
        let result = match self
            .request(
                Method::DELETE,
                self.endpoint_url(&["account", "sessions", session_id]),
            )
            .await
            .send()
            .await
        {
            Ok(response) => Self::check_status(response).await.map(|_| ()),
            Err(error) => Err(error.into()),
        };

        if session_id == CURRENT_SESSION {
            self.session_cookie.write().await.take();
        }

        result
    }

    async fn get_account(&self) -> BackendResult<Account> {
        let response = self
            .request(Method::GET, self.endpoint_url(&["account"]))
            .await
            .send()
            .await?;

        Self::read_json(response).await
    }

    async fn create_document(
        &self,
        collection_id: &str,
        document_id: &str,
        data: Value,
    ) -> BackendResult<Document> {
        debug!(collection = collection_id, document = document_id, "creating document");
        let response = self
            .request(Method::POST, self.documents_url(collection_id))
            .await
            .json(&json!({ "documentId": document_id, "data": data }))
            .send()
            .await?;

        Self::read_json(response).await
    }

    async fn list_documents(
        &self,
        collection_id: &str,
        queries: &[Query],
    ) -> BackendResult<DocumentList> {
        let params: Vec<(&str, String)> = queries
            .iter()
            .map(|query| ("queries[]", query.encode()))
            .collect();

        debug!(collection = collection_id, queries = params.len(), "listing documents");
        let response = self
            .request(Method::GET, self.documents_url(collection_id))
            .await
            .query(&params)
            .send()
            .await?;

        Self::read_json(response).await
    }

    async fn create_file(&self, file_id: &str, upload: FileUpload) -> BackendResult<StoredFile> {
        let url = self.endpoint_url(&["storage", "buckets", &self.storage_id, "files"]);
        let total = upload.len();
        debug!(file = file_id, size = total, mime = %upload.mime_type, "uploading file");

        if total <= UPLOAD_CHUNK_SIZE {
            let form = Form::new()
                .text("fileId", file_id.to_string())
                .part("file", Self::file_part(&upload, upload.contents.clone())?);
            let response = self
                .request(Method::POST, url)
                .await
                .multipart(form)
                .send()
                .await?;
            return Self::read_json(response).await;
        }

        let mut start = 0;
        loop {
            let end = (start + UPLOAD_CHUNK_SIZE).min(total);
            let form = Form::new()
                .text("fileId", file_id.to_string())
                .part("file", Self::file_part(&upload, upload.contents.slice(start..end))?);

            let mut request = self.request(Method::POST, url.clone()).await.multipart(form);
            for (name, value) in chunk_headers(file_id, start, end, total) {
                request = request.header(name, value);
            }

            let response = request.send().await?;
            let stored: StoredFile = Self::read_json(response).await?;
            debug!(file = file_id, uploaded = end, size = total, "uploaded chunk");

            if end == total {
                return Ok(stored);
            }
            start = end;
        }
    }

    async fn get_file_view(&self, file_id: &str) -> BackendResult<String> {
        let mut url = self.file_url(file_id, "view");
        url.query_pairs_mut().append_pair("project", &self.project_id);
        Ok(url.to_string())
    }

    async fn get_file_preview(
        &self,
        file_id: &str,
        options: &PreviewOptions,
    ) -> BackendResult<String> {
        let mut url = self.file_url(file_id, "preview");
        url.query_pairs_mut()
            .append_pair("width", &options.width.to_string())
            .append_pair("height", &options.height.to_string())
            .append_pair("gravity", options.gravity.as_str())
            .append_pair("quality", &options.quality.to_string())
            .append_pair("project", &self.project_id);
        Ok(url.to_string())
    }

    fn initials_avatar_url(&self, name: &str) -> String {
        let mut url = self.endpoint_url(&["avatars", "initials"]);
        url.query_pairs_mut()
            .append_pair("name", name)
            .append_pair("project", &self.project_id);
        url.to_string()
    }
}
