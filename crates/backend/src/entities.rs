//! Domain records shared by the session, content, and publish crates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Attribute names of the user-profile collection.
pub mod user_fields {
    pub const ACCOUNT_ID: &str = "accountId";
    pub const EMAIL: &str = "email";
    pub const USERNAME: &str = "username";
    pub const AVATAR: &str = "avatar";
}

/// Attribute names of the video collection.
pub mod video_fields {
    pub const TITLE: &str = "title";
    pub const THUMBNAIL: &str = "thumbnail";
    pub const VIDEO: &str = "video";
    pub const PROMPT: &str = "prompt";
    pub const CREATOR: &str = "creator";
    pub const CREATED_AT: &str = "$createdAt";
}

/// A user profile as known to this client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Id of the profile document; video posts reference this id.
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(rename = "accountId")]
    pub account_id: String,
    pub email: String,
    pub username: String,
    #[serde(rename = "avatar", default)]
    pub avatar_url: String,
}

/// Creator relationship of a video post. The remote expands it to the full
/// profile on reads and echoes the bare id on some writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Creator {
    Profile(Identity),
    Reference(String),
}

impl Creator {
    /// Profile document id, whichever form the relationship arrived in.
    pub fn id(&self) -> &str {
        match self {
            Creator::Profile(identity) => &identity.id,
            Creator::Reference(id) => id,
        }
    }

    pub fn profile(&self) -> Option<&Identity> {
        match self {
            Creator::Profile(identity) => Some(identity),
            Creator::Reference(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoPost {
    #[serde(rename = "$id")]
    pub id: String,
    pub title: String,
    #[serde(rename = "thumbnail")]
    pub thumbnail_url: String,
    #[serde(rename = "video")]
    pub video_url: String,
    #[serde(default)]
    pub prompt: String,
    pub creator: Creator,
    #[serde(rename = "$createdAt")]
    pub created_at: DateTime<Utc>,
}
