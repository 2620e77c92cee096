//! HTTP client for the generation service's chat endpoint.

use std::sync::Arc;

use reqwest::{Client, header};
use tracing::{info, instrument, warn};

use categorizer_shared::{ClassificationError, GenerationConfig, Result};

use crate::streaming::ResponseStream;
use crate::types::{ChatDetails, ChatRequest};

/// API version path segment of the chat action.
const CHAT_PATH: &str = "/20231130/actions/chat";

/// Streaming chat client. Cheap to clone.
#[derive(Clone)]
pub struct GenerationClient {
    http: Client,
    config: Arc<GenerationConfig>,
}

impl GenerationClient {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                ClassificationError::ModelService(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            http,
            config: Arc::new(config.clone()),
        })
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    /// Send a chat request and return the response event stream.
    ///
    /// Transport failures and non-success statuses are
    /// [`ClassificationError::ModelService`] errors.
    #[instrument(skip_all, fields(model = %self.config.model_id, prompt_chars = request.message.len()))]
    pub async fn chat_stream(&self, request: &ChatRequest) -> Result<ResponseStream> {
        let body = ChatDetails::new(&self.config.compartment_id, &self.config.model_id, request);
        let url = format!("{}{CHAT_PATH}", self.config.endpoint);

        let mut builder = self
            .http
            .post(&url)
            .header(header::ACCEPT, "text/event-stream")
            .json(&body);
        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key);
        }

        let started = std::time::Instant::now();
        let response = builder.send().await.map_err(|e| {
            warn!(error = %e, "chat request failed");
            ClassificationError::ModelService(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(status = %status, error = %error_text, "chat request rejected");
            return Err(ClassificationError::ModelService(format!(
                "HTTP {status}: {error_text}"
            )));
        }

        info!(elapsed_ms = started.elapsed().as_millis() as u64, "response stream opened");
        Ok(ResponseStream::new(response.bytes_stream()))
    }
}
