//! Mentor chat: one upstream call, canned reply on any failure.

pub mod gemini;

use std::sync::Arc;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tokio::sync::Mutex;

use crate::config::MentorConfig;

pub use gemini::GeminiClient;

pub const SYSTEM_PROMPT: &str = "You are a friendly and knowledgeable university student mentor on a social media platform. \
Your goal is to support, guide, and encourage students in their academic and personal life. \
Your tone should be approachable, empathetic, and concise, like a helpful peer who is trustworthy and positive.";

pub const FALLBACK_RESPONSES: [&str; 3] = [
    "That's a great question! I'd recommend breaking down your task into smaller, manageable chunks. Start with the most important part and work from there.",
    "I understand you're looking for guidance. Remember to take breaks and stay organized. What specific aspect would you like help with?",
    "Thanks for reaching out! As your mentor, I suggest creating a schedule that balances study time with relaxation. How does that sound?",
];

#[derive(Debug, thiserror::Error)]
pub enum MentorError {
    #[error("No API key configured")]
    MissingApiKey,

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Upstream returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Upstream returned no text")]
    EmptyResponse,
}

/// A generative-language backend.
#[async_trait]
pub trait MentorClient: Send + Sync {
    async fn generate(&self, system_prompt: &str, message: &str) -> Result<String, MentorError>;
}

pub struct MentorProxy {
    client: Arc<dyn MentorClient>,
    rng: Mutex<StdRng>,
}

impl MentorProxy {
    /// `rng` picks the fallback reply; seed it to make the choice reproducible.
    pub fn new(client: Arc<dyn MentorClient>, rng: StdRng) -> Self {
        Self {
            client,
            rng: Mutex::new(rng),
        }
    }

    pub fn from_config(config: &MentorConfig) -> Result<Self, MentorError> {
        let client = GeminiClient::new(config)?;
        Ok(Self::new(Arc::new(client), StdRng::from_entropy()))
    }

    /// Never fails: upstream errors are logged and replaced by a canned reply.
    pub async fn respond(&self, message: &str) -> String {
        match self.client.generate(SYSTEM_PROMPT, message).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(error = %e, "Mentor upstream failed, using fallback response");
                self.fallback().await.to_string()
            }
        }
    }

    async fn fallback(&self) -> &'static str {
        let mut rng = self.rng.lock().await;
        FALLBACK_RESPONSES
            .choose(&mut *rng)
            .copied()
            .unwrap_or(FALLBACK_RESPONSES[0])
    }
}
