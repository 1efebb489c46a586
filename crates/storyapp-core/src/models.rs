//! Data models for storyapp
//!
//! Defines the story, bookmark and session records, plus the wire shapes
//! returned by the story service. Field names follow the service's JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// A story as returned by the service
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoryItem {
    /// Unique identifier assigned by the service
    pub id: String,
    /// Display name of the author
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    /// URL of the uploaded photo
    #[serde(default, deserialize_with = "null_as_empty")]
    pub photo_url: String,
    /// Creation time as sent by the service (ISO-8601)
    #[serde(default, deserialize_with = "null_as_empty")]
    pub created_at: String,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
}

/// Read a text field the service may send as `null`
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl StoryItem {
    /// Whether both coordinates are present
    pub fn has_location(&self) -> bool {
        self.lat.is_some() && self.lon.is_some()
    }

    /// Parse `created_at`, returning `None` if the service sent something odd
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.created_at)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

/// Paging bookmark stored alongside each cached story
///
/// `prev_key` is `None` on the first page; `next_key` is `None` once the
/// feed has no further pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageKeys {
    pub prev_key: Option<u32>,
    pub next_key: Option<u32>,
}

impl PageKeys {
    /// Keys for rows fetched from `page`
    pub fn for_page(page: u32, end_reached: bool) -> Self {
        Self {
            prev_key: if page <= 1 { None } else { Some(page - 1) },
            next_key: if end_reached { None } else { Some(page + 1) },
        }
    }
}

/// A bookmark row joined to the story it belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageBookmark {
    pub story_id: String,
    pub keys: PageKeys,
}

/// The logged-in user, persisted between runs
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionRecord {
    pub email: String,
    pub token: String,
    pub is_logged_in: bool,
}

impl SessionRecord {
    /// A logged-in session for `email`
    pub fn logged_in(email: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            token: token.into(),
            is_logged_in: true,
        }
    }
}

/// Content type used when the caller does not name one
pub const DEFAULT_PHOTO_MIME: &str = "image/jpeg";

/// A new story to upload; never persisted
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// Encoded image bytes
    pub image: Vec<u8>,
    /// File name sent with the multipart part
    pub file_name: String,
    /// Content type of the multipart part
    pub mime_type: String,
    pub description: String,
    /// Latitude as text, sent verbatim as a form field
    pub lat: Option<String>,
    /// Longitude as text, sent verbatim as a form field
    pub lon: Option<String>,
}

impl UploadRequest {
    pub fn new(image: Vec<u8>, file_name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            image,
            file_name: file_name.into(),
            mime_type: DEFAULT_PHOTO_MIME.to_string(),
            description: description.into(),
            lat: None,
            lon: None,
        }
    }

    /// Attach coordinates
    pub fn with_location(mut self, lat: f64, lon: f64) -> Self {
        self.lat = Some(lat.to_string());
        self.lon = Some(lon.to_string());
        self
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = mime_type.into();
        self
    }
}

// ==================== Wire responses ====================

/// Response carrying only the error flag and a message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MessageResponse {
    pub error: bool,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LoginResult {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub name: String,
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub error: bool,
    pub message: String,
    /// Absent when `error` is set
    #[serde(default)]
    pub login_result: Option<LoginResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoryListResponse {
    pub error: bool,
    pub message: String,
    #[serde(default)]
    pub list_story: Vec<StoryItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoryDetailResponse {
    pub error: bool,
    pub message: String,
    #[serde(default)]
    pub story: Option<StoryItem>,
}

/// Body of a non-2xx response; every field may be missing
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    #[serde(default)]
    pub error: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
}
