//! Wire types exchanged with the remote service.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use cuid2::CuidConstructor;
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::BackendResult;

static CUID: Lazy<CuidConstructor> = Lazy::new(CuidConstructor::new);

/// Client-generated identifier accepted by every create primitive.
pub fn unique_id() -> String {
    CUID.create_id()
}

/// A document from any collection, system attributes split from payload fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(rename = "$createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "$updatedAt", default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Document {
    /// Decode the whole document, system attributes included, into a typed record.
    pub fn decode<T: DeserializeOwned>(&self) -> BackendResult<T> {
        let value = serde_json::to_value(self)?;
        Ok(serde_json::from_value(value)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentList {
    pub total: u64,
    pub documents: Vec<Document>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
}

/// Metadata of an issued session. The credential itself stays inside the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(default)]
    pub expire: Option<DateTime<Utc>>,
    #[serde(default)]
    pub current: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredFile {
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(rename = "bucketId", default)]
    pub bucket_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "mimeType", default)]
    pub mime_type: String,
    #[serde(rename = "sizeOriginal", default)]
    pub size: u64,
}

/// File contents ready to be sent to the storage bucket.
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub name: String,
    pub mime_type: String,
    pub contents: Bytes,
}

impl FileUpload {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, contents: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            contents: contents.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.contents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }
}

/// Crop anchor used when the preview aspect ratio differs from the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Gravity {
    #[default]
    Center,
    TopLeft,
    Top,
    TopRight,
    Left,
    Right,
    BottomLeft,
    Bottom,
    BottomRight,
}

impl Gravity {
    pub fn as_str(self) -> &'static str {
        match self {
            Gravity::Center => "center",
            Gravity::TopLeft => "top-left",
            Gravity::Top => "top",
            Gravity::TopRight => "top-right",
            Gravity::Left => "left",
            Gravity::Right => "right",
            Gravity::BottomLeft => "bottom-left",
            Gravity::Bottom => "bottom",
            Gravity::BottomRight => "bottom-right",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let gravity = match value.trim().to_ascii_lowercase().as_str() {
            "center" => Gravity::Center,
            "top-left" => Gravity::TopLeft,
            "top" => Gravity::Top,
            "top-right" => Gravity::TopRight,
            "left" => Gravity::Left,
            "right" => Gravity::Right,
            "bottom-left" => Gravity::BottomLeft,
            "bottom" => Gravity::Bottom,
            "bottom-right" => Gravity::BottomRight,
            _ => return None,
        };
        Some(gravity)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviewOptions {
    pub width: u32,
    pub height: u32,
    pub gravity: Gravity,
    pub quality: u8,
}

impl Default for PreviewOptions {
    fn default() -> Self {
        Self {
            width: 2000,
            height: 2000,
            gravity: Gravity::Top,
            quality: 100,
        }
    }
}

impl From<&aora_config::MediaConfig> for PreviewOptions {
    fn from(config: &aora_config::MediaConfig) -> Self {
        Self {
            width: config.preview_width,
            height: config.preview_height,
            gravity: Gravity::parse(&config.preview_gravity).unwrap_or(Gravity::Top),
            quality: config.preview_quality.min(100),
        }
    }
}
