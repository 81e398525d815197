use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error};
use url::Url;

use crate::config::ChatConfig;

/// Request body accepted by the completion endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub input: String,
    pub max_tokens: u32,
    pub temperature: f64,
}

/// Status and body of a response, before any interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCompletion {
    pub status: u16,
    pub body: String,
}

/// The request never produced a readable response.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("could not reach completion endpoint: {0}")]
    Send(#[source] reqwest::Error),

    #[error("could not read completion response: {0}")]
    Body(#[source] reqwest::Error),
}

/// Maps a single prompt to a raw HTTP result.
///
/// Any status code counts as a response. Only transport failures are errors.
#[async_trait]
pub trait CompletionEndpoint: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<RawCompletion, CompletionError>;
}

pub struct CompletionClient {
    api_url: Url,
    api_key: String,
    client: reqwest::Client,
}

impl CompletionClient {
    pub fn new(api_url: Url, api_key: impl Into<String>) -> Self {
        Self {
            api_url,
            api_key: api_key.into(),
            client: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &ChatConfig) -> Self {
        Self::new(config.api_url.clone(), config.api_key())
    }
}

#[async_trait]
impl CompletionEndpoint for CompletionClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<RawCompletion, CompletionError> {
        debug!("Sending request to {}: {:?}", self.api_url, request);

        let response = self
            .client
            .post(self.api_url.clone())
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                error!("Completion request failed: {}", e);
                CompletionError::Send(e)
            })?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(CompletionError::Body)?;

        debug!("Received {} from completion endpoint: {}", status, body);

        Ok(RawCompletion { status, body })
    }
}
