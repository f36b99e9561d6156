//! HTTP client for the feed API, used by the CLI subcommands.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::auth::handlers::{AuthResponse, ProfileResponse};
use crate::db::models::{ContentKind, Post, User};
use crate::routes::health::HealthResponse;
use crate::routes::posts::{MessageEnvelope, PostEnvelope, PostsEnvelope};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server returned {status}: {message}")]
    Api { status: u16, message: String },
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Http(e) => e.status().map(|s| s.as_u16()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Body for `POST /api/posts`.
#[derive(Debug, Clone, Serialize)]
pub struct PostDraft {
    pub content_type: ContentKind,
    pub content: String,
    pub caption: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub filter_tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// Body for `PUT /api/posts/{id}`. Unset fields are left as they are.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PostUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub likes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reposts: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

pub struct ApiClient {
    http: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    /// `base_url` is the API root, e.g. `http://localhost:3001/api`.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .map(|b| b.error)
            .unwrap_or(text);
        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }

    pub async fn health(&self) -> Result<HealthResponse, ClientError> {
        let response = self.http.get(self.url("/health")).send().await?;
        Self::decode(response).await
    }

    pub async fn list_posts(&self, limit: Option<u32>) -> Result<Vec<Post>, ClientError> {
        let mut req = self.http.get(self.url("/posts"));
        if let Some(limit) = limit {
            req = req.query(&[("limit", limit)]);
        }
        let envelope: PostsEnvelope = Self::decode(req.send().await?).await?;
        Ok(envelope.posts)
    }

    pub async fn get_post(&self, id: i64) -> Result<Post, ClientError> {
        let req = self.http.get(self.url(&format!("/posts/{}", id)));
        let envelope: PostEnvelope = Self::decode(req.send().await?).await?;
        Ok(envelope.post)
    }

    pub async fn list_user_posts(
        &self,
        user_id: i64,
        limit: Option<u32>,
    ) -> Result<Vec<Post>, ClientError> {
        let mut req = self.http.get(self.url(&format!("/posts/user/{}", user_id)));
        if let Some(limit) = limit {
            req = req.query(&[("limit", limit)]);
        }
        let envelope: PostsEnvelope = Self::decode(req.send().await?).await?;
        Ok(envelope.posts)
    }

    pub async fn update_post(&self, id: i64, update: &PostUpdate) -> Result<Post, ClientError> {
        let req = self
            .http
            .put(self.url(&format!("/posts/{}", id)))
            .json(update);
        let envelope: PostEnvelope = Self::decode(req.send().await?).await?;
        Ok(envelope.post)
    }

    pub async fn create_post(&self, draft: &PostDraft) -> Result<Post, ClientError> {
        let req = self.authorized(self.http.post(self.url("/posts"))).json(draft);
        let envelope: PostEnvelope = Self::decode(req.send().await?).await?;
        Ok(envelope.post)
    }

    pub async fn toggle_like(&self, id: i64, increment: bool) -> Result<Post, ClientError> {
        let req = self
            .http
            .post(self.url(&format!("/posts/{}/like", id)))
            .json(&json!({ "increment": increment }));
        let envelope: PostEnvelope = Self::decode(req.send().await?).await?;
        Ok(envelope.post)
    }

    pub async fn delete_post(&self, id: i64) -> Result<String, ClientError> {
        let req = self.http.delete(self.url(&format!("/posts/{}", id)));
        let envelope: MessageEnvelope = Self::decode(req.send().await?).await?;
        Ok(envelope.message)
    }

    /// The account behind the stored token.
    pub async fn profile(&self) -> Result<User, ClientError> {
        let req = self.authorized(self.http.get(self.url("/protected/profile")));
        let profile: ProfileResponse = Self::decode(req.send().await?).await?;
        Ok(profile.user)
    }

    /// Logs in and keeps the returned token for later calls.
    pub async fn login(&mut self, email: &str, password: &str) -> Result<User, ClientError> {
        let req = self
            .http
            .post(self.url("/auth/login"))
            .json(&json!({ "email": email, "password": password }));
        let auth: AuthResponse = Self::decode(req.send().await?).await?;
        self.token = Some(auth.token);
        Ok(auth.user)
    }

    /// Registers and keeps the returned token for later calls.
    pub async fn register(
        &mut self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<User, ClientError> {
        let req = self
            .http
            .post(self.url("/auth/register"))
            .json(&json!({ "email": email, "password": password, "name": name }));
        let auth: AuthResponse = Self::decode(req.send().await?).await?;
        self.token = Some(auth.token);
        Ok(auth.user)
    }
}
