use axum::body::Bytes;
use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::auth::handlers::DEFAULT_AVATAR_URL;
use crate::db::models::{AuthorSnapshot, ContentKind, NewPost, Post, PostChanges};
use crate::error::{AppError, AppResult, FieldViolation};
use crate::extractors::{MaybeUser, ValidatedJson};
use crate::state::AppState;

/// Owner id recorded for posts created without a bearer token.
pub const GUEST_USER_ID: i64 = 0;

fn guest_author() -> AuthorSnapshot {
    AuthorSnapshot {
        username: "current_user".to_string(),
        display_name: "Current User".to_string(),
        avatar_url: DEFAULT_AVATAR_URL.to_string(),
    }
}

// -- Envelopes --

#[derive(Debug, Serialize, Deserialize)]
pub struct PostsEnvelope {
    pub posts: Vec<Post>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PostEnvelope {
    pub post: Post,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageEnvelope {
    pub message: String,
}

// -- Request types --

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub limit: Option<u32>,
}

impl ListQuery {
    /// `limit=0` means the same as no limit.
    fn limit(&self) -> Option<u32> {
        self.limit.filter(|n| *n > 0)
    }
}

/// Tags arrive either as a ready-made string or as a JSON list.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum TagsInput {
    List(Vec<String>),
    Text(String),
}

impl TagsInput {
    /// Stored form: lists become a JSON array string, text is kept as given.
    pub fn into_stored(self) -> String {
        match self {
            TagsInput::List(tags) if tags.is_empty() => String::new(),
            TagsInput::List(tags) => serde_json::to_string(&tags).unwrap_or_default(),
            TagsInput::Text(text) => text.trim().to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePostRequest {
    pub content_type: ContentKind,
    #[serde(default)]
    #[validate(length(min = 1, message = "Content is required"))]
    pub content: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Caption is required"))]
    pub caption: String,
    #[serde(default)]
    pub filter_tags: Option<TagsInput>,
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdatePostRequest {
    pub caption: Option<String>,
    #[validate(range(min = 0, message = "Likes cannot be negative"))]
    pub likes: Option<i64>,
    #[validate(range(min = 0, message = "Comments cannot be negative"))]
    pub comments: Option<i64>,
    #[validate(range(min = 0, message = "Reposts cannot be negative"))]
    pub reposts: Option<i64>,
    pub filter_tags: Option<TagsInput>,
    pub location: Option<String>,
}

impl From<UpdatePostRequest> for PostChanges {
    fn from(req: UpdatePostRequest) -> Self {
        PostChanges {
            caption: req.caption,
            likes: req.likes,
            comments: req.comments,
            reposts: req.reposts,
            filter_tags: req.filter_tags.map(TagsInput::into_stored),
            location: req.location.map(|l| l.trim().to_string()),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct LikeRequest {
    #[serde(default = "default_increment")]
    pub increment: bool,
}

fn default_increment() -> bool {
    true
}

impl LikeRequest {
    /// An empty body counts as a like.
    fn parse(body: &[u8]) -> AppResult<Self> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(LikeRequest { increment: true });
        }
        serde_json::from_slice(body)
            .map_err(|e| AppError::Validation(vec![FieldViolation::new("body", e.to_string())]))
    }
}

// -- Router --

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/posts", get(list_posts).post(create_post))
        .route(
            "/api/posts/{id}",
            get(get_post).put(update_post).delete(delete_post),
        )
        .route("/api/posts/user/{user_id}", get(list_user_posts))
        .route("/api/posts/{id}/like", post(like_post))
}

fn post_id(path: Result<Path<i64>, PathRejection>) -> AppResult<i64> {
    path.map(|Path(id)| id)
        .map_err(|_| AppError::BadRequest("Invalid post ID".into()))
}

fn list_query(query: Result<Query<ListQuery>, QueryRejection>) -> AppResult<ListQuery> {
    query
        .map(|Query(q)| q)
        .map_err(|_| AppError::BadRequest("Invalid limit".into()))
}

// -- Handlers --

/// GET /api/posts
async fn list_posts(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> AppResult<Json<PostsEnvelope>> {
    let query = list_query(query)?;
    let posts = state.posts.list(query.limit()).await?;
    Ok(Json(PostsEnvelope { posts }))
}

/// GET /api/posts/{id}
async fn get_post(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> AppResult<Json<PostEnvelope>> {
    let id = post_id(path)?;
    let post = state
        .posts
        .find_by_id(id)
        .await?
        .ok_or(AppError::NotFound("Post"))?;
    Ok(Json(PostEnvelope { post }))
}

/// GET /api/posts/user/{user_id}
async fn list_user_posts(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> AppResult<Json<PostsEnvelope>> {
    let user_id = path
        .map(|Path(id)| id)
        .map_err(|_| AppError::BadRequest("Invalid user ID".into()))?;
    let query = list_query(query)?;
    let posts = state.posts.list_by_user(user_id, query.limit()).await?;
    Ok(Json(PostsEnvelope { posts }))
}

/// POST /api/posts
async fn create_post(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    ValidatedJson(req): ValidatedJson<CreatePostRequest>,
) -> AppResult<(StatusCode, Json<PostEnvelope>)> {
    let (user_id, author) = match &user {
        Some(u) => (u.id, AuthorSnapshot::of(u)),
        None => (GUEST_USER_ID, guest_author()),
    };

    let post = state
        .posts
        .create(NewPost {
            user_id,
            author,
            content_type: req.content_type,
            content: req.content,
            caption: req.caption,
            filter_tags: req
                .filter_tags
                .map(TagsInput::into_stored)
                .unwrap_or_default(),
            location: req
                .location
                .map(|l| l.trim().to_string())
                .unwrap_or_default(),
        })
        .await?;

    tracing::info!(post_id = post.id, user_id, kind = %post.content_type, "Created post");
    Ok((StatusCode::CREATED, Json(PostEnvelope { post })))
}

/// PUT /api/posts/{id}
async fn update_post(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    ValidatedJson(req): ValidatedJson<UpdatePostRequest>,
) -> AppResult<Json<PostEnvelope>> {
    let id = post_id(path)?;
    let post = state
        .posts
        .update(id, req.into())
        .await?
        .ok_or(AppError::NotFound("Post"))?;
    Ok(Json(PostEnvelope { post }))
}

/// DELETE /api/posts/{id}
async fn delete_post(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> AppResult<Json<MessageEnvelope>> {
    let id = post_id(path)?;
    if !state.posts.delete(id).await? {
        return Err(AppError::NotFound("Post"));
    }
    tracing::info!(post_id = id, "Deleted post");
    Ok(Json(MessageEnvelope {
        message: "Post deleted successfully".to_string(),
    }))
}

/// POST /api/posts/{id}/like
async fn like_post(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    body: Bytes,
) -> AppResult<Json<PostEnvelope>> {
    let id = post_id(path)?;
    let req = LikeRequest::parse(&body)?;
    let post = state
        .posts
        .adjust_likes(id, req.increment)
        .await?
        .ok_or(AppError::NotFound("Post"))?;
    Ok(Json(PostEnvelope { post }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_limit_means_unlimited() {
        assert_eq!(ListQuery { limit: Some(0) }.limit(), None);
        assert_eq!(ListQuery { limit: Some(5) }.limit(), Some(5));
        assert_eq!(ListQuery::default().limit(), None);
    }

    #[test]
    fn tag_list_is_stored_as_json_array() {
        let tags: TagsInput = serde_json::from_str(r#"["tech","ai"]"#).unwrap();
        assert_eq!(tags.into_stored(), r#"["tech","ai"]"#);
    }

    #[test]
    fn tag_text_is_kept_as_given() {
        let tags: TagsInput = serde_json::from_str(r#"" tech, ai ""#).unwrap();
        assert_eq!(tags.into_stored(), "tech, ai");
    }

    #[test]
    fn empty_tag_list_is_stored_empty() {
        assert_eq!(TagsInput::List(vec![]).into_stored(), "");
    }

    #[test]
    fn empty_like_body_increments() {
        assert!(LikeRequest::parse(b"").unwrap().increment);
        assert!(LikeRequest::parse(b"  \n").unwrap().increment);
        assert!(LikeRequest::parse(b"{}").unwrap().increment);
    }

    #[test]
    fn like_body_can_decrement() {
        assert!(!LikeRequest::parse(br#"{"increment":false}"#).unwrap().increment);
    }

    #[test]
    fn malformed_like_body_is_rejected() {
        assert!(matches!(
            LikeRequest::parse(b"{nope"),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn negative_counters_fail_validation() {
        let req = UpdatePostRequest {
            likes: Some(-1),
            ..Default::default()
        };
        assert!(req.validate().is_err());

        let ok = UpdatePostRequest {
            likes: Some(0),
            ..Default::default()
        };
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn update_request_maps_to_changes() {
        let req = UpdatePostRequest {
            caption: Some("new".into()),
            filter_tags: Some(TagsInput::List(vec!["x".into()])),
            location: Some("  Porto ".into()),
            ..Default::default()
        };
        let changes: PostChanges = req.into();
        assert_eq!(changes.caption.as_deref(), Some("new"));
        assert_eq!(changes.filter_tags.as_deref(), Some(r#"["x"]"#));
        assert_eq!(changes.location.as_deref(), Some("Porto"));
        assert!(changes.likes.is_none());
    }
}
