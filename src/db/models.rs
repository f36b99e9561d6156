use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub display_name: String,
    pub avatar_url: String,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub display_name: String,
    pub avatar_url: String,
}

/// The three kinds of post content. Photo and video carry a URL, text carries the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Photo,
    Video,
    Text,
}

impl ContentKind {
    pub const ALL: [ContentKind; 3] = [ContentKind::Photo, ContentKind::Video, ContentKind::Text];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Photo => "photo",
            ContentKind::Video => "video",
            ContentKind::Text => "text",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "photo" => Ok(ContentKind::Photo),
            "video" => Ok(ContentKind::Video),
            "text" => Ok(ContentKind::Text),
            other => Err(format!("unknown content type: {}", other)),
        }
    }
}

impl ToSql for ContentKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for ContentKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: String| FromSqlError::Other(e.into()))
    }
}

/// Author fields copied onto a post when it is written.
///
/// This is a snapshot: later changes to the user do not reach posts that
/// already exist.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthorSnapshot {
    pub username: String,
    pub display_name: String,
    pub avatar_url: String,
}

impl AuthorSnapshot {
    pub fn of(user: &User) -> Self {
        Self {
            username: user.username.clone(),
            display_name: user.display_name.clone(),
            avatar_url: user.avatar_url.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Post {
    pub id: i64,
    pub user_id: i64,
    #[serde(flatten)]
    pub author: AuthorSnapshot,
    pub content_type: ContentKind,
    pub content: String,
    pub caption: String,
    pub likes: i64,
    pub comments: i64,
    pub reposts: i64,
    #[serde(default)]
    pub filter_tags: String,
    #[serde(default)]
    pub location: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub user_id: i64,
    pub author: AuthorSnapshot,
    pub content_type: ContentKind,
    pub content: String,
    pub caption: String,
    pub filter_tags: String,
    pub location: String,
}

/// Partial update of a post. `None` leaves the column untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostChanges {
    pub caption: Option<String>,
    pub likes: Option<i64>,
    pub comments: Option<i64>,
    pub reposts: Option<i64>,
    pub filter_tags: Option<String>,
    pub location: Option<String>,
}
