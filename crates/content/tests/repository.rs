use std::sync::Arc;

use aora_backend::memory::{InMemoryBackend, Operation};
use aora_config::AppConfig;
use aora_content::{ContentRepository, RepositoryError};
use chrono::{Duration, Utc};
use serde_json::json;

async fn seed_posts(backend: &InMemoryBackend, titles: &[(&str, &str)]) {
    let base = Utc::now() - Duration::hours(1);
    for (index, (title, creator)) in titles.iter().enumerate() {
        backend
            .seed_document(
                "videos",
                &format!("post-{index}"),
                base + Duration::seconds(index as i64),
                json!({
                    "title": title,
                    "thumbnail": format!("https://cdn.test/{index}/thumb"),
                    "video": format!("https://cdn.test/{index}/video"),
                    "prompt": "prompt",
                    "creator": { "$id": creator, "accountId": format!("acc-{creator}"), "email": "x@y.z", "username": creator, "avatar": "" },
                }),
            )
            .await;
    }
}

fn repository(backend: Arc<InMemoryBackend>) -> ContentRepository {
    ContentRepository::new(backend, &AppConfig::default())
}

#[tokio::test]
async fn latest_is_capped_and_newest_first() {
    let backend = Arc::new(InMemoryBackend::new());
    let titles: Vec<(String, &str)> = (0..10).map(|i| (format!("clip {i}"), "u1")).collect();
    let titles: Vec<(&str, &str)> = titles.iter().map(|(t, c)| (t.as_str(), *c)).collect();
    seed_posts(&backend, &titles).await;
    let repository = repository(backend);

    let latest = repository.list_latest(7).await.unwrap();
    assert_eq!(latest.len(), 7);
    assert!(latest
        .windows(2)
        .all(|pair| pair[0].created_at >= pair[1].created_at));
    assert_eq!(latest[0].id, "post-9");

    let default_latest = repository.latest().await.unwrap();
    assert_eq!(default_latest.len(), repository.latest_limit() as usize);
}

#[tokio::test]
async fn list_by_user_filters_on_creator() {
    let backend = Arc::new(InMemoryBackend::new());
    seed_posts(&backend, &[("one", "u1"), ("two", "u2"), ("three", "u1")]).await;
    let repository = repository(backend);

    let posts = repository.list_by_user("u1").await.unwrap();
    assert_eq!(posts.len(), 2);
    assert!(posts.iter().all(|post| post.creator.id() == "u1"));

    assert!(repository.list_by_user("nobody").await.unwrap().is_empty());
}

#[tokio::test]
async fn blank_search_returns_nothing_without_a_request() {
    let backend = Arc::new(InMemoryBackend::new());
    seed_posts(&backend, &[("Sunset drive", "u1")]).await;
    let repository = repository(backend.clone());

    assert!(repository.search("").await.unwrap().is_empty());
    assert!(repository.search("   ").await.unwrap().is_empty());
    assert_eq!(backend.call_count(Operation::ListDocuments).await, 0);
}

#[tokio::test]
async fn search_matches_titles() {
    let backend = Arc::new(InMemoryBackend::new());
    seed_posts(&backend, &[("Sunset drive", "u1"), ("Morning coffee", "u2")]).await;
    let repository = repository(backend);

    let hits = repository.search("sunset").await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].title, "Sunset drive");

    assert!(repository.search("zzz-nonexistent").await.unwrap().is_empty());
}

#[tokio::test]
async fn backend_failures_are_wrapped() {
    let backend = Arc::new(InMemoryBackend::new());
    backend.fail(Operation::ListDocuments, 500, "offline").await;
    let repository = repository(backend);

    let err = repository.list_all().await.unwrap_err();
    assert!(matches!(err, RepositoryError::Backend(ref source) if source.status() == Some(500)));
}

#[tokio::test]
async fn malformed_documents_name_the_offender() {
    let backend = Arc::new(InMemoryBackend::new());
    backend
        .seed_document("videos", "broken", Utc::now(), json!({ "title": 42 }))
        .await;
    let repository = repository(backend);

    match repository.list_all().await {
        Err(RepositoryError::Decode { id, .. }) => assert_eq!(id, "broken"),
        other => panic!("expected decode failure, got {other:?}"),
    }
}
