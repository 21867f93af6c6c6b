mod client;
pub(crate) mod schema;
pub(crate) mod types;

pub use schema::StructuredOutput;

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::AiError;
use crate::traits::TextGenerator;

use client::{OpenAiClient, OPENAI_API_URL};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

// =============================================================================
// OpenAi Agent
// =============================================================================

/// Client for any OpenAI-compatible chat completions endpoint (OpenAI itself,
/// vLLM, Ollama, llama.cpp server, ...).
#[derive(Debug, Clone)]
pub struct OpenAi {
    api_key: Option<String>,
    pub(crate) model: String,
    base_url: String,
    temperature: Option<f32>,
    top_p: Option<f32>,
    max_tokens: u32,
    structured_output: bool,
    timeout: Duration,
}

impl OpenAi {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            api_key: None,
            model: model.into(),
            base_url: OPENAI_API_URL.to_string(),
            temperature: None,
            top_p: None,
            max_tokens: 2048,
            structured_output: true,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Disable `response_format: json_schema` for runtimes that reject it.
    pub fn with_structured_output(mut self, enabled: bool) -> Self {
        self.structured_output = enabled;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Get the model name.
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn supports_structured_output(&self) -> bool {
        self.structured_output
    }

    fn client(&self) -> std::result::Result<OpenAiClient, AiError> {
        OpenAiClient::new(self.api_key.as_deref(), &self.base_url, self.timeout)
    }

    fn request(&self, prompt: &str) -> types::ChatRequest {
        let mut request =
            types::ChatRequest::new(&self.model).message(types::WireMessage::user(prompt));

        if types::uses_max_completion_tokens(&self.model) {
            request = request.max_completion_tokens(self.max_tokens);
        } else {
            request = request.max_tokens(self.max_tokens);
            if let Some(t) = self.temperature {
                request = request.temperature(t);
            }
            if let Some(p) = self.top_p {
                request = request.top_p(p);
            }
        }

        request
    }

    /// Single-prompt completion, returning the raw text.
    pub async fn complete(&self, prompt: &str) -> Result<String> {
        let request = self.request(prompt);
        Ok(self.client()?.complete(&request).await?)
    }

    /// Completion constrained to `schema`, returning the raw text.
    pub async fn structured_output(&self, prompt: &str, schema: serde_json::Value) -> Result<String> {
        let request = self.request(prompt).json_schema("structured_response", schema);
        Ok(self.client()?.complete(&request).await?)
    }

    /// Confirm the endpoint answers and serves the configured model.
    pub async fn ensure_model_available(&self) -> Result<()> {
        let client = self.client()?;
        let models = client.models().await?;
        debug!(count = models.len(), "Listed served models");

        if models.iter().any(|m| m == &self.model) {
            Ok(())
        } else {
            Err(AiError::ModelUnavailable {
                model: self.model.clone(),
                base_url: client.base_url().to_string(),
            }
            .into())
        }
    }
}

// =============================================================================
// TextGenerator Implementation
// =============================================================================

#[async_trait]
impl TextGenerator for OpenAi {
    async fn generate(&self, prompt: &str, schema: Option<&serde_json::Value>) -> Result<String> {
        match schema {
            Some(schema) if self.structured_output => {
                self.structured_output(prompt, schema.clone()).await
            }
            _ => self.complete(prompt).await,
        }
    }

    async fn warm_up(&self) -> Result<()> {
        self.ensure_model_available().await?;
        info!(model = %self.model, base_url = %self.base_url, "Model available");
        Ok(())
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
