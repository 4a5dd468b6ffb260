//! Test plan for the `aora-config` crate.
//!
//! These tests exercise the configuration loader across default handling,
//! file discovery, environment overrides, and validation behaviour.

use std::fs;
use std::path::{Path, PathBuf};

use serial_test::serial;
use tempfile::TempDir;

use aora_config::{load, AppConfig, BackendConfig, FeedConfig, MediaConfig};

const ENV_VARS_TO_RESET: &[&str] = &[
    "AORA_CONFIG",
    "AORA__BACKEND__ENDPOINT",
    "AORA__BACKEND__PROJECT_ID",
    "AORA__BACKEND__PLATFORM",
    "AORA__BACKEND__DATABASE_ID",
    "AORA__BACKEND__USER_COLLECTION_ID",
    "AORA__BACKEND__VIDEO_COLLECTION_ID",
    "AORA__BACKEND__STORAGE_ID",
    "AORA__BACKEND__REQUEST_TIMEOUT_SECONDS",
    "AORA__FEED__LATEST_LIMIT",
    "AORA__MEDIA__PREVIEW_WIDTH",
    "AORA__MEDIA__PREVIEW_HEIGHT",
    "AORA__MEDIA__PREVIEW_GRAVITY",
    "AORA__MEDIA__PREVIEW_QUALITY",
];

struct TestContext {
    vars: Vec<(String, Option<String>)>,
    original_dir: Option<PathBuf>,
}

impl TestContext {
    fn new() -> Self {
        Self {
            vars: Vec::new(),
            original_dir: None,
        }
    }

    fn reset_environment(&mut self) {
        for key in ENV_VARS_TO_RESET {
            self.remove_var(key);
        }
    }

    fn set_var(&mut self, key: &str, value: impl AsRef<str>) {
        let previous = std::env::var(key).ok();
        std::env::set_var(key, value.as_ref());
        self.vars.push((key.to_string(), previous));
    }

    fn remove_var(&mut self, key: &str) {
        let previous = std::env::var(key).ok();
        std::env::remove_var(key);
        self.vars.push((key.to_string(), previous));
    }

    fn set_current_dir(&mut self, dir: &Path) {
        if self.original_dir.is_none() {
            self.original_dir =
                Some(std::env::current_dir().expect("failed to capture current directory"));
        }
        std::env::set_current_dir(dir).expect("failed to set current directory");
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        if let Some(original) = self.original_dir.take() {
            let _ = std::env::set_current_dir(original);
        }

        while let Some((key, value)) = self.vars.pop() {
            match value {
                Some(val) => std::env::set_var(&key, val),
                None => std::env::remove_var(&key),
            }
        }
    }
}

fn write_config_file(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("failed to create config directories");
    }
    fs::write(path, contents).expect("failed to write config file");
}

#[test]
#[serial]
fn load_uses_default_values_when_no_files_found() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    let config = load().expect("configuration load should succeed without files");
    let defaults = AppConfig::default();

    assert_eq!(config.backend.endpoint, defaults.backend.endpoint);
    assert_eq!(config.backend.project_id, defaults.backend.project_id);
    assert_eq!(config.backend.platform, defaults.backend.platform);
    assert_eq!(config.backend.database_id, defaults.backend.database_id);
    assert_eq!(
        config.backend.user_collection_id,
        defaults.backend.user_collection_id
    );
    assert_eq!(
        config.backend.video_collection_id,
        defaults.backend.video_collection_id
    );
    assert_eq!(config.backend.storage_id, defaults.backend.storage_id);
    assert!(config.backend.request_timeout_seconds.is_none());
    assert_eq!(config.feed.latest_limit, 7);
    assert_eq!(config.media.preview_width, 2000);
    assert_eq!(config.media.preview_height, 2000);
    assert_eq!(config.media.preview_gravity, "top");
    assert_eq!(config.media.preview_quality, 100);
}

#[test]
#[serial]
fn load_picks_first_available_file_in_search_order() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    write_config_file(
        temp_dir.path(),
        "aora.toml",
        r#"
        [backend]
        project_id = "from-root"
        "#,
    );
    write_config_file(
        temp_dir.path(),
        "config/aora.toml",
        r#"
        [backend]
        project_id = "from-config-dir"
        "#,
    );

    let config = load().expect("configuration load should pick the first file");
    assert_eq!(config.backend.project_id, "from-root");
}

#[test]
#[serial]
fn load_merges_partial_file_with_defaults() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    write_config_file(
        temp_dir.path(),
        "aora.toml",
        r#"
        [backend]
        endpoint = "https://appwrite.internal/v1"
        video_collection_id = "clips"

        [feed]
        latest_limit = 3
        "#,
    );

    let config = load().expect("configuration load should succeed");
    let defaults = AppConfig::default();

    assert_eq!(config.backend.endpoint, "https://appwrite.internal/v1");
    assert_eq!(config.backend.video_collection_id, "clips");
    assert_eq!(config.backend.project_id, defaults.backend.project_id);
    assert_eq!(config.feed.latest_limit, 3);
    assert_eq!(config.media.preview_gravity, defaults.media.preview_gravity);
}

#[test]
#[serial]
fn load_honours_explicit_config_path() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    write_config_file(
        temp_dir.path(),
        "elsewhere/client.toml",
        r#"
        [backend]
        storage_id = "bucket-from-explicit-path"
        "#,
    );
    write_config_file(
        temp_dir.path(),
        "aora.toml",
        r#"
        [backend]
        storage_id = "bucket-from-cwd"
        "#,
    );

    let explicit = temp_dir.path().join("elsewhere/client.toml");
    ctx.set_var("AORA_CONFIG", explicit.display().to_string());

    let config = load().expect("configuration load should use AORA_CONFIG");
    assert_eq!(config.backend.storage_id, "bucket-from-explicit-path");
}

#[test]
#[serial]
fn load_applies_environment_overrides() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    write_config_file(
        temp_dir.path(),
        "aora.toml",
        r#"
        [backend]
        project_id = "file-project"
        "#,
    );

    ctx.set_var("AORA__BACKEND__PROJECT_ID", "env-project");
    ctx.set_var("AORA__BACKEND__REQUEST_TIMEOUT_SECONDS", "15");

    let config = load().expect("configuration load should honour env overrides");
    assert_eq!(config.backend.project_id, "env-project");
    assert_eq!(config.backend.request_timeout_seconds, Some(15));
}

#[test]
#[serial]
fn load_clamps_preview_quality_to_one_hundred() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    ctx.set_var("AORA__MEDIA__PREVIEW_QUALITY", "180");

    let config = load().expect("configuration load should succeed with oversized quality");
    assert_eq!(
        config.media.preview_quality, 100,
        "preview quality should be clamped to 100"
    );
}

#[test]
#[serial]
fn load_errors_on_invalid_toml_contents() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    write_config_file(
        temp_dir.path(),
        "aora.toml",
        r#"
        [feed]
        latest_limit = "not-a-number
        "#,
    );

    let error = load().expect_err("invalid TOML should cause load to fail");
    let message = error.to_string();
    assert!(
        message.contains("invalid configuration") || message.contains("unable to build configuration"),
        "unexpected error message: {message}"
    );
}

#[test]
fn backend_config_defaults_leave_timeout_to_transport() {
    let defaults = BackendConfig::default();
    assert!(defaults.request_timeout_seconds.is_none());
    assert_eq!(defaults.user_collection_id, "users");
    assert_eq!(defaults.video_collection_id, "videos");
}

#[test]
fn feed_config_defaults_to_seven_latest_posts() {
    assert_eq!(FeedConfig::default().latest_limit, 7);
}

#[test]
fn media_config_defaults_match_square_top_cropped_preview() {
    let defaults = MediaConfig::default();
    assert_eq!(defaults.preview_width, 2000);
    assert_eq!(defaults.preview_height, 2000);
    assert_eq!(defaults.preview_gravity, "top");
    assert_eq!(defaults.preview_quality, 100);
}
