use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::config::MentorConfig;
use crate::mentor::{MentorClient, MentorError};

/// Client for the Gemini `generateContent` REST endpoint.
pub struct GeminiClient {
    http: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

impl GeminiClient {
    pub fn new(config: &MentorConfig) -> Result<Self, MentorError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

fn extract_text(response: GenerateResponse) -> Option<String> {
    let text: String = response
        .candidates
        .into_iter()
        .next()?
        .content?
        .parts
        .into_iter()
        .filter_map(|p| p.text)
        .collect();
    let text = text.trim().to_string();
    (!text.is_empty()).then_some(text)
}

#[async_trait]
impl MentorClient for GeminiClient {
    async fn generate(&self, system_prompt: &str, message: &str) -> Result<String, MentorError> {
        let api_key = self.api_key.as_deref().ok_or(MentorError::MissingApiKey)?;

        let body = json!({
            "systemInstruction": { "parts": [{ "text": system_prompt }] },
            "contents": [{ "role": "user", "parts": [{ "text": message }] }],
        });

        tracing::debug!(model = %self.model, "Calling mentor upstream");
        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MentorError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = response.json().await?;
        extract_text(parsed).ok_or(MentorError::EmptyResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};

    async fn spawn_upstream(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn config(base_url: String, api_key: Option<&str>) -> MentorConfig {
        MentorConfig {
            api_key: api_key.map(str::to_string),
            model: "test-model".to_string(),
            base_url,
            timeout_secs: 5,
        }
    }

    #[test]
    fn extract_text_joins_parts_of_first_candidate() {
        let response: GenerateResponse = serde_json::from_value(json!({
            "candidates": [
                { "content": { "parts": [{ "text": "Hello " }, { "text": "there" }] } },
                { "content": { "parts": [{ "text": "ignored" }] } }
            ]
        }))
        .unwrap();
        assert_eq!(extract_text(response).as_deref(), Some("Hello there"));
    }

    #[test]
    fn extract_text_rejects_empty_candidates() {
        let response: GenerateResponse = serde_json::from_value(json!({})).unwrap();
        assert!(extract_text(response).is_none());

        let blank: GenerateResponse = serde_json::from_value(json!({
            "candidates": [{ "content": { "parts": [{ "text": "  " }] } }]
        }))
        .unwrap();
        assert!(extract_text(blank).is_none());
    }

    #[tokio::test]
    async fn missing_key_fails_without_network() {
        let client = GeminiClient::new(&config("http://127.0.0.1:9".into(), None)).unwrap();
        let err = client.generate("sys", "hi").await.unwrap_err();
        assert!(matches!(err, MentorError::MissingApiKey));
    }

    #[tokio::test]
    async fn successful_call_returns_text() {
        let router = Router::new().route(
            "/models/test-model:generateContent",
            post(|headers: HeaderMap, Json(body): Json<serde_json::Value>| async move {
                assert_eq!(headers["x-goog-api-key"], "k");
                let msg = body["contents"][0]["parts"][0]["text"].as_str().unwrap().to_string();
                Json(json!({
                    "candidates": [{ "content": { "parts": [{ "text": format!("you said {}", msg) }] } }]
                }))
            }),
        );
        let base = spawn_upstream(router).await;

        let client = GeminiClient::new(&config(base, Some("k"))).unwrap();
        let reply = client.generate("sys", "hi").await.unwrap();
        assert_eq!(reply, "you said hi");
    }

    #[tokio::test]
    async fn error_status_is_reported() {
        let router = Router::new().route(
            "/models/test-model:generateContent",
            post(|| async { (StatusCode::TOO_MANY_REQUESTS, "quota exceeded") }),
        );
        let base = spawn_upstream(router).await;

        let client = GeminiClient::new(&config(base, Some("k"))).unwrap();
        let err = client.generate("sys", "hi").await.unwrap_err();
        match err {
            MentorError::Status { status, body } => {
                assert_eq!(status, 429);
                assert_eq!(body, "quota exceeded");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
