//! # Embedding client
//!
//! Turns text into vectors through the Gemini `embedContent` REST endpoint.
//!
//! The rest of the crate only sees the [`Embedder`] trait, so the backfill
//! and search flows can run against an in-memory double in tests.
//!
//! ## Task types
//!
//! Gemini tunes the output for how the text will be used. Queries are embedded
//! with [`TaskType::RetrievalQuery`], stored customer descriptions with
//! [`TaskType::RetrievalDocument`]. The two are not interchangeable; vectors
//! from different task types are only approximately comparable.
//!
//! ## Wire format
//!
//! ```text
//! POST {api_base}/models/text-embedding-004:embedContent
//! x-goog-api-key: <GOOGLE_API_KEY>
//!
//! {"model": "models/text-embedding-004",
//!  "content": {"parts": [{"text": "..."}]},
//!  "taskType": "RETRIEVAL_QUERY"}
//!
//! 200 OK
//! {"embedding": {"values": [0.013, -0.021, ...]}}
//! ```

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{config::SearchConfig, error::EmbeddingError};

/// What the embedded text will be used for.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskType {
    /// Free-text search input.
    RetrievalQuery,
    /// A record stored for retrieval.
    RetrievalDocument,
}

/// Anything that can turn text into an embedding vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embeds `text` for the given task.
    ///
    /// # Errors
    ///
    /// Returns an [`EmbeddingError`] if the request fails or the response
    /// holds no usable vector.
    async fn embed(&self, text: &str, task_type: TaskType) -> Result<Vec<f64>, EmbeddingError>;
}

/// [`Embedder`] backed by the Gemini REST API.
pub struct GeminiEmbedder {
    /// HTTP client for API requests.
    client: Client,
    /// Base URL, without a trailing slash.
    api_base: String,
    /// Gemini API key.
    api_key: String,
    /// Model identifier, always with the `models/` prefix.
    model: String,
}

impl GeminiEmbedder {
    pub fn new(
        api_base: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::default(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: normalize_model(&model.into()),
        }
    }

    pub fn from_config(config: &SearchConfig) -> Self {
        Self::new(
            config.gemini_api_base.clone(),
            config.google_api_key.clone(),
            config.embedding_model.clone(),
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/{}:embedContent", self.api_base, self.model)
    }
}

/// Request payload for `embedContent`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedContentRequest<'a> {
    model: &'a str,
    content: Content<'a>,
    task_type: TaskType,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

/// Response payload from `embedContent`.
#[derive(Debug, Deserialize)]
struct EmbedContentResponse {
    embedding: ContentEmbedding,
}

#[derive(Debug, Deserialize)]
struct ContentEmbedding {
    #[serde(default)]
    values: Vec<f64>,
}

/// Google's error envelope, `{"error": {"code", "message", "status"}}`.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

#[async_trait]
impl Embedder for GeminiEmbedder {
    async fn embed(&self, text: &str, task_type: TaskType) -> Result<Vec<f64>, EmbeddingError> {
        let url = self.endpoint();
        debug!("POST {} ({:?}, {} chars)", url, task_type, text.len());

        let body = EmbedContentRequest {
            model: &self.model,
            content: Content {
                parts: [Part { text }],
            },
            task_type,
        };

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let raw = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorEnvelope>(&raw)
                .map(|envelope| envelope.error.message)
                .unwrap_or(raw);
            return Err(EmbeddingError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: EmbedContentResponse =
            serde_json::from_str(&raw).map_err(|e| EmbeddingError::Decode(e.to_string()))?;

        if parsed.embedding.values.is_empty() {
            return Err(EmbeddingError::Empty);
        }
        Ok(parsed.embedding.values)
    }
}

/// Adds the `models/` prefix the REST API expects when it is missing.
fn normalize_model(model: &str) -> String {
    let model = model.trim();
    if model.starts_with("models/") || model.starts_with("tunedModels/") {
        model.to_string()
    } else {
        format!("models/{model}")
    }
}
