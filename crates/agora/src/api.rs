//! Wire types exchanged with the forum REST API.
//!
//! The server speaks PascalCase JSON for posts and comments and snake/camel
//! case for authentication payloads. The Rust field names follow Rust
//! conventions; serde attributes pin the wire names.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

// ============================================================================
// Identifiers
// ============================================================================

pub type PostId = i64;
pub type CommentId = i64;
pub type UserId = i64;
pub type CategoryId = i64;

/// Header carrying the session credential on authenticated requests.
pub const SESSION_HEADER: &str = "session_id";

// ============================================================================
// Resources
// ============================================================================

/// A forum post as served by `GET /posts` and `GET /posts/:id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    #[serde(rename = "PostID")]
    pub id: PostId,
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Content")]
    pub content: String,
    #[serde(rename = "CreationDate", deserialize_with = "timestamp::deserialize")]
    pub creation_date: DateTime<Utc>,
    #[serde(rename = "UserID", default)]
    pub author_user_id: Option<UserId>,
    #[serde(rename = "Username", default, skip_serializing_if = "Option::is_none")]
    pub author_username: Option<String>,
    #[serde(rename = "IsSticky", default)]
    pub is_sticky: bool,
    #[serde(rename = "IsLocked", default)]
    pub is_locked: bool,
    #[serde(rename = "PostCategoryID", default)]
    pub category_id: Option<CategoryId>,
    #[serde(rename = "AdditionalNotes", default)]
    pub additional_notes: Option<String>,
}

/// A comment as served by `GET /comments/post/:postId`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    #[serde(rename = "CommentID")]
    pub id: CommentId,
    #[serde(rename = "Content")]
    pub content: String,
    #[serde(rename = "CreationDate", deserialize_with = "timestamp::deserialize")]
    pub creation_date: DateTime<Utc>,
    #[serde(rename = "PostID")]
    pub post_id: PostId,
    #[serde(rename = "UserID", default)]
    pub author_user_id: Option<UserId>,
    #[serde(rename = "Username", default, skip_serializing_if = "Option::is_none")]
    pub author_username: Option<String>,
}

// ============================================================================
// Requests
// ============================================================================

/// Body of `POST /posts`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePostRequest {
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Content")]
    pub content: String,
    #[serde(rename = "PostCategoryID", default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<CategoryId>,
    #[serde(rename = "AdditionalNotes", default, skip_serializing_if = "Option::is_none")]
    pub additional_notes: Option<String>,
}

/// Body of `PUT /posts`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdatePostRequest {
    #[serde(rename = "PostID")]
    pub post_id: PostId,
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Content")]
    pub content: String,
    #[serde(rename = "PostCategoryID", default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<CategoryId>,
    #[serde(rename = "AdditionalNotes", default, skip_serializing_if = "Option::is_none")]
    pub additional_notes: Option<String>,
}

/// Body of `POST /comments`.
///
/// The server checks `UserID` against the session owner, so it is sent
/// whenever the client knows who is logged in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCommentRequest {
    #[serde(rename = "Content")]
    pub content: String,
    #[serde(rename = "PostID")]
    pub post_id: PostId,
    #[serde(rename = "UserID", default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
}

/// Body of `PUT /comments`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateCommentRequest {
    #[serde(rename = "CommentID")]
    pub comment_id: CommentId,
    #[serde(rename = "Content")]
    pub content: String,
}

/// Body of `POST /login`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Body of `POST /users` (signup).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(rename = "profilePicture", default, skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub biography: Option<String>,
}

// ============================================================================
// Responses
// ============================================================================

/// Response of `POST /login`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub session_id: String,
    pub user_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Acknowledgement returned by mutating endpoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MutationResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Error body: the server uses either `error` or `message`.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorBody {
    pub(crate) fn into_message(self) -> Option<String> {
        self.error.or(self.message).filter(|m| !m.trim().is_empty())
    }
}

// ============================================================================
// Timestamps
// ============================================================================

/// Lenient timestamp parsing.
///
/// Accepts RFC 3339 and zone-less `YYYY-MM-DDTHH:MM:SS[.fff]`, which is
/// read as UTC.
mod timestamp {
    use super::*;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
    }

    pub(super) fn parse(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Some(ts.with_timezone(&Utc));
        }
        ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
            .map(|naive| naive.and_utc())
    }
}
