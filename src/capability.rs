//! External service capabilities
//!
//! The server talks to two optional HTTP services: a sentiment
//! classifier (for the `/sentiment` command) and a translator (for
//! per-recipient chat translation). Both are behind traits so the core
//! never depends on the transport, and both degrade gracefully when the
//! service is down.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

use crate::error::AppError;

/// Bounded wait for either external service
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Sentiment classification capability
///
/// Returns a label -> score mapping; callers pick the argmax.
#[async_trait]
pub trait SentimentClassifier: Send + Sync {
    async fn classify(&self, text: &str) -> Result<HashMap<String, f64>, AppError>;
}

/// Translation capability
///
/// Failure must never block or drop chat delivery; callers fall back
/// to the original text.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str, target_language: &str) -> Result<String, AppError>;
}

/// Pick the highest-scoring label from a classifier response
pub fn top_label(scores: &HashMap<String, f64>) -> Option<&str> {
    scores
        .iter()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(label, _)| label.as_str())
}

/// Sentiment service spoken to over HTTP
///
/// Form-posts `text` to the configured endpoint and expects a JSON
/// object mapping labels to scores.
pub struct HttpSentimentClassifier {
    client: reqwest::Client,
    url: String,
}

impl HttpSentimentClassifier {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl SentimentClassifier for HttpSentimentClassifier {
    async fn classify(&self, text: &str) -> Result<HashMap<String, f64>, AppError> {
        let response = self
            .client
            .post(&self.url)
            .timeout(REQUEST_TIMEOUT)
            .form(&[("text", text)])
            .send()
            .await
            .map_err(|e| {
                warn!("Sentiment request failed: {}", e);
                AppError::ClassifierUnavailable
            })?;

        if !response.status().is_success() {
            warn!("Sentiment service returned {}", response.status());
            return Err(AppError::ClassifierUnavailable);
        }

        response.json().await.map_err(|e| {
            warn!("Unparseable sentiment response: {}", e);
            AppError::ClassifierUnavailable
        })
    }
}

#[derive(Debug, Deserialize)]
struct TranslationResponse {
    text: String,
}

/// Translation service spoken to over HTTP
pub struct HttpTranslator {
    client: reqwest::Client,
    url: String,
}

impl HttpTranslator {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl Translator for HttpTranslator {
    async fn translate(&self, text: &str, target_language: &str) -> Result<String, AppError> {
        let response = self
            .client
            .post(&self.url)
            .timeout(REQUEST_TIMEOUT)
            .form(&[("text", text), ("target", target_language)])
            .send()
            .await
            .map_err(|e| {
                warn!("Translation request failed: {}", e);
                AppError::ClassifierUnavailable
            })?;

        if !response.status().is_success() {
            warn!("Translation service returned {}", response.status());
            return Err(AppError::ClassifierUnavailable);
        }

        let body: TranslationResponse = response.json().await.map_err(|e| {
            warn!("Unparseable translation response: {}", e);
            AppError::ClassifierUnavailable
        })?;
        Ok(body.text)
    }
}
