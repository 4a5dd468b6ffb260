use std::sync::Arc;

use aora_backend::memory::{InMemoryBackend, Operation};
use aora_backend::Backend;
use aora_config::BackendConfig;
use aora_session::{AuthError, RegistrationError, SessionState, SessionStatus, SessionStore};

fn setup() -> (Arc<InMemoryBackend>, SessionStore) {
    let backend = Arc::new(InMemoryBackend::new());
    let store = SessionStore::new(backend.clone(), &BackendConfig::default());
    (backend, store)
}

#[tokio::test]
async fn register_then_logout_forgets_the_user() {
    let (_backend, store) = setup();

    let identity = store
        .register("a@x.com", "pw123456", "alice")
        .await
        .expect("registration succeeds");
    assert_eq!(identity.username, "alice");
    assert_eq!(identity.email, "a@x.com");
    assert!(identity.avatar_url.contains("alice"));
    assert_eq!(store.snapshot().status, SessionStatus::Authenticated);
    assert_eq!(store.identity(), Some(identity));

    store.logout().await;

    assert!(store.current_user().await.is_none());
    assert_eq!(store.snapshot().status, SessionStatus::Anonymous);
    assert!(store.identity().is_none());
}

#[tokio::test]
async fn login_resolves_identity_of_the_signed_in_account() {
    let (backend, store) = setup();
    store.register("b@x.com", "pw123456", "bob").await.unwrap();
    store.logout().await;

    let session = store.login("b@x.com", "pw123456").await.unwrap();
    let account = backend.get_account().await.unwrap();
    let identity = store.current_user().await.expect("identity after login");

    assert_eq!(session.user_id, account.id);
    assert_eq!(identity.account_id, account.id);
    assert_eq!(store.identity(), Some(identity));
}

#[tokio::test]
async fn wrong_password_leaves_store_anonymous() {
    let (_backend, store) = setup();
    store.register("c@x.com", "pw123456", "carol").await.unwrap();
    store.logout().await;

    let err = store.login("c@x.com", "not-it").await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidCredentials(_)));
    assert_eq!(store.snapshot().status, SessionStatus::Anonymous);
}

#[tokio::test]
async fn failed_sign_in_over_a_live_session_signs_out() {
    let (backend, store) = setup();
    store.register("p@x.com", "pw123456", "pat").await.unwrap();
    assert_eq!(store.snapshot().status, SessionStatus::Authenticated);

    let err = store.login("p@x.com", "wrong-password").await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidCredentials(_)));

    let state = store.snapshot();
    assert_eq!(state.status, SessionStatus::Anonymous);
    assert!(state.identity.is_none());
    assert!(state.session.is_none());
    assert!(backend.current_session().await.is_none());
}

#[tokio::test]
async fn failed_sign_in_on_transport_error_signs_out() {
    let (backend, store) = setup();
    store.register("q@x.com", "pw123456", "quinn").await.unwrap();
    backend
        .fail(Operation::CreateSession, 503, "gateway unavailable")
        .await;

    let err = store.login("q@x.com", "pw123456").await.unwrap_err();
    assert!(matches!(err, AuthError::Backend(_)));
    assert_eq!(store.snapshot(), SessionState::default());
}

#[tokio::test]
async fn repeated_login_keeps_a_single_session() {
    let (backend, store) = setup();
    store.register("d@x.com", "pw123456", "dave").await.unwrap();

    store.login("d@x.com", "pw123456").await.unwrap();
    store.login("d@x.com", "pw123456").await.unwrap();

    assert_eq!(backend.active_session_count().await, 1);
    assert_eq!(backend.sessions_created().await, 3);
}

#[tokio::test]
async fn logout_is_idempotent() {
    let (_backend, store) = setup();
    store.logout().await;
    store.logout().await;
    assert_eq!(store.snapshot().status, SessionStatus::Anonymous);
}

#[tokio::test]
async fn failed_profile_creation_reports_the_orphaned_account() {
    let (backend, store) = setup();
    backend
        .fail(Operation::CreateDocument, 500, "database unavailable")
        .await;

    let err = store
        .register("e@x.com", "pw123456", "erin")
        .await
        .unwrap_err();

    let RegistrationError::Profile { account_id, .. } = err else {
        panic!("expected a profile error, got {err:?}");
    };
    let accounts = backend.accounts().await;
    assert_eq!(accounts.len(), 1);
    assert_eq!(accounts[0].id, account_id);
    assert_eq!(store.snapshot().status, SessionStatus::Anonymous);
    assert_eq!(backend.call_count(Operation::CreateSession).await, 0);
}

#[tokio::test]
async fn duplicate_registration_fails_on_the_account() {
    let (_backend, store) = setup();
    store.register("f@x.com", "pw123456", "frank").await.unwrap();
    store.logout().await;

    let err = store
        .register("f@x.com", "pw123456", "frank")
        .await
        .unwrap_err();
    assert!(matches!(err, RegistrationError::Account(ref source) if source.is_conflict()));
}

#[tokio::test]
async fn current_user_swallows_backend_failures() {
    let (backend, store) = setup();
    store.register("g@x.com", "pw123456", "gina").await.unwrap();
    backend
        .fail(Operation::ListDocuments, 503, "index unavailable")
        .await;

    assert!(store.current_user().await.is_none());
}

#[tokio::test]
async fn restore_adopts_a_session_held_by_the_backend() {
    let backend = Arc::new(InMemoryBackend::new());
    let first = SessionStore::new(backend.clone(), &BackendConfig::default());
    first.register("h@x.com", "pw123456", "hank").await.unwrap();

    let restarted = SessionStore::new(backend.clone(), &BackendConfig::default());
    assert_eq!(restarted.snapshot().status, SessionStatus::Anonymous);

    assert_eq!(restarted.restore().await, SessionStatus::Authenticated);
    assert_eq!(
        restarted.identity().map(|identity| identity.username),
        Some("hank".to_string())
    );

    restarted.logout().await;
    assert_eq!(restarted.restore().await, SessionStatus::Anonymous);
}

#[tokio::test]
async fn subscribers_observe_sign_in() {
    let (_backend, store) = setup();
    let mut changes = store.subscribe();

    store.register("i@x.com", "pw123456", "ivy").await.unwrap();

    changes.changed().await.expect("store still alive");
    assert_eq!(changes.borrow_and_update().status, SessionStatus::Authenticated);
}
