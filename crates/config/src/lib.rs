use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

const DEFAULT_CONFIG_FILES: &[&str] = &[
    "aora.toml",
    "config/aora.toml",
    "../aora.toml",
    "../config/aora.toml",
];

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    pub backend: BackendConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub media: MediaConfig,
}

/// Connection settings for the remote backend service.
///
/// ```
/// use aora_config::BackendConfig;
///
/// let backend = BackendConfig::default();
/// assert_eq!(backend.endpoint, "https://cloud.appwrite.io/v1");
/// assert!(backend.request_timeout_seconds.is_none());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    pub endpoint: String,
    pub project_id: String,
    pub platform: String,
    pub database_id: String,
    pub user_collection_id: String,
    pub video_collection_id: String,
    pub storage_id: String,
    /// Transport timeout. Unset leaves the HTTP client's own defaults in place.
    #[serde(default)]
    pub request_timeout_seconds: Option<u64>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://cloud.appwrite.io/v1".to_string(),
            project_id: "aora".to_string(),
            platform: "com.jsm.aora".to_string(),
            database_id: "aora-db".to_string(),
            user_collection_id: "users".to_string(),
            video_collection_id: "videos".to_string(),
            storage_id: "media".to_string(),
            request_timeout_seconds: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    #[serde(default = "FeedConfig::default_latest_limit")]
    pub latest_limit: u32,
}

impl FeedConfig {
    const fn default_latest_limit() -> u32 {
        7
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            latest_limit: Self::default_latest_limit(),
        }
    }
}

/// Geometry of the preview URL derived for uploaded thumbnails.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    #[serde(default = "MediaConfig::default_dimension")]
    pub preview_width: u32,
    #[serde(default = "MediaConfig::default_dimension")]
    pub preview_height: u32,
    #[serde(default = "MediaConfig::default_gravity")]
    pub preview_gravity: String,
    #[serde(default = "MediaConfig::default_quality")]
    pub preview_quality: u8,
}

impl MediaConfig {
    const fn default_dimension() -> u32 {
        2000
    }

    fn default_gravity() -> String {
        "top".to_string()
    }

    const fn default_quality() -> u8 {
        100
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            preview_width: Self::default_dimension(),
            preview_height: Self::default_dimension(),
            preview_gravity: Self::default_gravity(),
            preview_quality: Self::default_quality(),
        }
    }
}

/// Load the client configuration by combining defaults, files, and environment overrides.
///
/// ```
/// use aora_config::load;
///
/// std::env::remove_var("AORA_CONFIG");
///
/// let config = load().expect("configuration should load with defaults");
/// assert!(!config.backend.endpoint.is_empty());
/// ```
pub fn load() -> anyhow::Result<AppConfig> {
    let defaults = AppConfig::default();

    let mut builder = config::Config::builder();
    builder = builder
        .set_default("backend.endpoint", defaults.backend.endpoint.clone())?
        .set_default("backend.project_id", defaults.backend.project_id.clone())?
        .set_default("backend.platform", defaults.backend.platform.clone())?
        .set_default("backend.database_id", defaults.backend.database_id.clone())?
        .set_default(
            "backend.user_collection_id",
            defaults.backend.user_collection_id.clone(),
        )?
        .set_default(
            "backend.video_collection_id",
            defaults.backend.video_collection_id.clone(),
        )?
        .set_default("backend.storage_id", defaults.backend.storage_id.clone())?
        .set_default("feed.latest_limit", i64::from(defaults.feed.latest_limit))?
        .set_default("media.preview_width", i64::from(defaults.media.preview_width))?
        .set_default(
            "media.preview_height",
            i64::from(defaults.media.preview_height),
        )?
        .set_default("media.preview_gravity", defaults.media.preview_gravity.clone())?
        .set_default(
            "media.preview_quality",
            i64::from(defaults.media.preview_quality),
        )?;

    let environment_overrides = config::Environment::with_prefix("AORA").separator("__");

    let mut config_file_attached = false;

    if let Ok(path) = std::env::var("AORA_CONFIG") {
        builder = builder.add_source(config::File::from(PathBuf::from(&path)));
        config_file_attached = true;
        debug!(path, "loading configuration via AORA_CONFIG");
    } else if let Ok(cwd) = std::env::current_dir() {
        let fallback = DEFAULT_CONFIG_FILES
            .iter()
            .map(|candidate| cwd.join(candidate))
            .find(|path| path.exists());

        if let Some(path) = fallback {
            debug!(path = %path.display(), "loading configuration file");
            builder = builder.add_source(config::File::from(path));
            config_file_attached = true;
        }
    }

    if !config_file_attached {
        debug!("no configuration file found, relying on defaults and environment overrides");
    }

    builder = builder.add_source(environment_overrides);

    let cfg = builder.build().context("unable to build configuration")?;

    let mut config = cfg
        .try_deserialize::<AppConfig>()
        .context("invalid configuration")?;

    if config.media.preview_quality > 100 {
        config.media.preview_quality = 100;
    }

    debug!(
        endpoint = %config.backend.endpoint,
        project = %config.backend.project_id,
        "loaded client configuration"
    );
    Ok(config)
}
