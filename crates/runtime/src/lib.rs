use std::sync::Arc;

use anyhow::{Context, Result};
use aora_backend::{Backend, HttpBackend};
use aora_config::AppConfig;
use aora_content::{ContentRepository, PostStore};
use aora_publish::PublishPipeline;
use aora_session::{SessionStatus, SessionStore};
use tracing::info;

pub mod telemetry {
    use anyhow::Result;
    use tracing::Level;
    use tracing_subscriber::{fmt::SubscriberBuilder, EnvFilter};

    pub fn init_tracing() -> Result<()> {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let subscriber = SubscriberBuilder::default()
            .with_max_level(Level::TRACE)
            .with_env_filter(env_filter)
            .with_target(false)
            .finish();

        tracing::subscriber::set_global_default(subscriber)
            .map_err(|error| anyhow::anyhow!("failed to set tracing subscriber: {error}"))
    }
}

/// Every client component, wired over one shared backend.
#[derive(Clone)]
pub struct ClientServices {
    pub backend: Arc<dyn Backend>,
    pub session: SessionStore,
    pub repository: ContentRepository,
    pub posts: PostStore,
    pub publisher: PublishPipeline,
}

impl ClientServices {
    pub fn initialise(config: &AppConfig) -> Result<Self> {
        let backend =
            HttpBackend::new(&config.backend).context("failed to build backend client")?;
        info!(endpoint = %config.backend.endpoint, project = %config.backend.project_id, "backend configured");
        Ok(Self::with_backend(config, Arc::new(backend)))
    }

    pub fn with_backend(config: &AppConfig, backend: Arc<dyn Backend>) -> Self {
        let session = SessionStore::new(backend.clone(), &config.backend);
        let repository = ContentRepository::new(backend.clone(), config);
        let posts = PostStore::new(repository.clone());
        let publisher = PublishPipeline::new(backend.clone(), config);

        Self {
            backend,
            session,
            repository,
            posts,
            publisher,
        }
    }

    /// App-start session check.
    pub async fn start(&self) -> SessionStatus {
        let status = self.session.restore().await;
        match self.session.identity() {
            Some(identity) => info!(user = %identity.username, "resumed session"),
            None => info!("starting signed out"),
        }
        status
    }
}

pub async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(?error, "failed to listen for shutdown signal");
    }
    info!("shutdown signal received");
}
