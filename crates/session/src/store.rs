use std::sync::Arc;

use aora_backend::{
    unique_id, user_fields, Backend, Identity, Query, Session, CURRENT_SESSION,
};
use aora_config::BackendConfig;
use serde_json::json;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::{AuthError, RegistrationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionStatus {
    #[default]
    Anonymous,
    Authenticated,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub status: SessionStatus,
    pub identity: Option<Identity>,
    /// Metadata of the session created by this store, if any.
    pub session: Option<Session>,
}

impl SessionState {
    fn authenticated(session: Option<Session>, identity: Option<Identity>) -> Self {
        Self {
            status: SessionStatus::Authenticated,
            identity,
            session,
        }
    }
}

#[derive(Clone)]
pub struct SessionStore {
    backend: Arc<dyn Backend>,
    user_collection_id: String,
    state: Arc<watch::Sender<SessionState>>,
}

impl SessionStore {
    pub fn new(backend: Arc<dyn Backend>, config: &BackendConfig) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        Self {
            backend,
            user_collection_id: config.user_collection_id.clone(),
            state: Arc::new(state),
        }
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn identity(&self) -> Option<Identity> {
        self.state.borrow().identity.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().status == SessionStatus::Authenticated
    }

    /// Create an account and its profile document, then sign in with the same
    /// credentials. A profile failure leaves the account behind.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        username: &str,
    ) -> Result<Identity, RegistrationError> {
        if [email, password, username].iter().any(|field| field.trim().is_empty()) {
            return Err(RegistrationError::MissingFields);
        }

        let account_id = unique_id();
        let account = self
            .backend
            .create_account(&account_id, email, password, username)
            .await
            .map_err(RegistrationError::Account)?;

        let avatar_url = self.backend.initials_avatar_url(username);
        let profile = self
            .backend
            .create_document(
                &self.user_collection_id,
                &unique_id(),
                json!({
                    user_fields::ACCOUNT_ID: account.id,
                    user_fields::EMAIL: email,
                    user_fields::USERNAME: username,
                    user_fields::AVATAR: avatar_url,
                }),
            )
            .await
            .and_then(|document| document.decode::<Identity>());

        let identity = match profile {
            Ok(identity) => identity,
            Err(source) => {
                warn!(account = %account.id, error = %source, "account created without a profile document");
                return Err(RegistrationError::Profile {
                    account_id: account.id,
                    source,
                });
            }
        };

        self.login(email, password).await?;

        // The profile index may lag behind the write; keep the document we created.
        if self.state.borrow().identity.is_none() {
            let identity = identity.clone();
            self.state.send_modify(|state| state.identity = Some(identity));
        }

        info!(account = %identity.account_id, user = %identity.id, "registered account");
        Ok(identity)
    }

    /// Exchange credentials for a session, ending any session this client
    /// already holds first.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }

        self.end_existing_session().await;
        // From here on a failed sign-in must leave the store signed out.
        self.state.send_if_modified(|state| {
            let stale = *state != SessionState::default();
            *state = SessionState::default();
            stale
        });

        let session = self
            .backend
            .create_session(email, password)
            .await
            .map_err(AuthError::from_sign_in)?;

        self.state
            .send_replace(SessionState::authenticated(Some(session.clone()), None));

        let identity = self.current_user().await;
        if identity.is_none() {
            warn!(account = %session.user_id, "signed in but no profile document was found");
        }
        self.state.send_modify(|state| state.identity = identity);

        info!(account = %session.user_id, session = %session.id, "signed in");
        Ok(session)
    }

    /// Identity behind the attached session. Any failure reads as "nobody".
    pub async fn current_user(&self) -> Option<Identity> {
        let account = match self.backend.get_account().await {
            Ok(account) => account,
            Err(error) => {
                debug!(error = %error, "no active account");
                return None;
            }
        };

        let profiles = match self
            .backend
            .list_documents(
                &self.user_collection_id,
                &[Query::equal(user_fields::ACCOUNT_ID, account.id.as_str())],
            )
            .await
        {
            Ok(list) => list,
            Err(error) => {
                debug!(account = %account.id, error = %error, "profile lookup failed");
                return None;
            }
        };

        let document = profiles.documents.into_iter().next()?;
        match document.decode::<Identity>() {
            Ok(identity) => Some(identity),
            Err(error) => {
                debug!(account = %account.id, error = %error, "profile document is malformed");
                None
            }
        }
    }

    /// End the attached session. Safe to call when signed out.
    pub async fn logout(&self) {
        if let Err(error) = self.backend.delete_session(CURRENT_SESSION).await {
            debug!(error = %error, "session deletion failed, treating as signed out");
        }
        self.state.send_replace(SessionState::default());
        info!("signed out");
    }

    /// App-start check: adopt a session the backend still holds.
    pub async fn restore(&self) -> SessionStatus {
        match self.current_user().await {
            Some(identity) => {
                debug!(user = %identity.id, "restored session");
                self.state
                    .send_replace(SessionState::authenticated(None, Some(identity)));
                SessionStatus::Authenticated
            }
            None => {
                self.state.send_replace(SessionState::default());
                SessionStatus::Anonymous
            }
        }
    }

    async fn end_existing_session(&self) {
        let had_session = self.state.borrow().session.is_some();
        match self.backend.delete_session(CURRENT_SESSION).await {
            Ok(()) => debug!("ended previous session"),
            Err(error) if had_session => {
                warn!(error = %error, "could not end previous session")
            }
            Err(error) => debug!(error = %error, "no previous session to end"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aora_backend::memory::InMemoryBackend;

    fn store(backend: Arc<InMemoryBackend>) -> SessionStore {
        SessionStore::new(backend, &BackendConfig::default())
    }

    #[tokio::test]
    async fn blank_credentials_never_reach_the_backend() {
        let backend = Arc::new(InMemoryBackend::new());
        let store = store(backend.clone());

        assert!(matches!(
            store.login("  ", "secret").await,
            Err(AuthError::MissingCredentials)
        ));
        assert!(matches!(
            store.register("a@x.com", "pw123456", "").await,
            Err(RegistrationError::MissingFields)
        ));
        assert!(backend.calls().await.is_empty());
    }

    #[tokio::test]
    async fn snapshot_starts_anonymous() {
        let store = store(Arc::new(InMemoryBackend::new()));
        let state = store.snapshot();
        assert_eq!(state.status, SessionStatus::Anonymous);
        assert!(state.identity.is_none());
        assert!(state.session.is_none());
    }
}
