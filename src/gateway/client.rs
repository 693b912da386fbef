//! OpenAI-compatible chat-completions client
//!
//! Talks to a Groq-style endpoint with:
//! - POST {base}/chat/completions, bearer auth
//! - images inlined as base64 data URLs in multimodal content parts
//! - hard request timeout mapped to the timeout error variant

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::PipelineConfig;
use crate::errors::{PipelineError, Result};
use crate::gateway::{CallOptions, ModelGateway, ModelReply, ModelUsage};

/// Chat-completions client for one vision model and one text model
#[derive(Debug, Clone)]
pub struct VisionModelClient {
    client: Client,
    base_url: String,
    api_key: String,
    vision_model: String,
    text_model: String,
    timeout_ms: u64,
}

impl VisionModelClient {
    /// Create a client from the injected pipeline configuration
    pub fn new(config: &PipelineConfig) -> Result<Self> {
        Self::with_config(
            &config.api.base_url,
            &config.api.key,
            &config.models.vision,
            &config.models.text,
            config.timeout(),
        )
    }

    /// Create a client with explicit settings
    pub fn with_config(
        base_url: &str,
        api_key: &str,
        vision_model: &str,
        text_model: &str,
        timeout: std::time::Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(PipelineError::Http)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            vision_model: vision_model.to_string(),
            text_model: text_model.to_string(),
            timeout_ms: timeout.as_millis() as u64,
        })
    }

    /// Check if the remote API answers at all
    pub async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/models", self.base_url);

        match self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await
        {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    /// List model ids available behind the endpoint
    pub async fn list_models(&self) -> Result<Vec<String>> {
        let url = format!("{}/models", self.base_url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| PipelineError::Transport(format!("Failed to list models: {}", e)))?;

        if !response.status().is_success() {
            return Err(PipelineError::Transport(format!(
                "Model list returned HTTP {}",
                response.status()
            )));
        }

        let body: ModelListResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::Transport(format!("Failed to parse model list: {}", e)))?;

        Ok(body.data.into_iter().map(|m| m.id).collect())
    }

    /// Get the configured vision model name
    pub fn vision_model(&self) -> &str {
        &self.vision_model
    }

    /// Get the configured text model name
    pub fn text_model(&self) -> &str {
        &self.text_model
    }

    /// Get base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Encode image bytes as the data URL the multimodal API expects
    fn image_data_url(image: &[u8]) -> String {
        format!("data:image/jpeg;base64,{}", BASE64.encode(image))
    }

    async fn chat(
        &self,
        model: &str,
        content: MessageContent,
        opts: CallOptions,
    ) -> Result<ModelReply> {
        let url = format!("{}/chat/completions", self.base_url);

        let request = ChatRequest {
            model: model.to_string(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content,
            }],
            temperature: opts.temperature,
            max_tokens: opts.max_tokens,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PipelineError::Timeout {
                        duration_ms: self.timeout_ms,
                    }
                } else {
                    PipelineError::Transport(format!("Failed to send request: {}", e))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(PipelineError::Transport(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let body: ChatResponse = response.json().await.map_err(|e| {
            PipelineError::Transport(format!("Failed to parse API envelope: {}", e))
        })?;

        let usage = body.usage.unwrap_or_default();
        let text = body
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| {
                PipelineError::Transport("Model reply contained no choices".to_string())
            })?;

        tracing::debug!(
            model,
            total_tokens = usage.total_tokens,
            "chat completion finished"
        );

        Ok(ModelReply {
            text,
            usage,
            model: model.to_string(),
        })
    }
}

#[async_trait]
impl ModelGateway for VisionModelClient {
    async fn analyze_image(
        &self,
        image: &[u8],
        prompt: &str,
        opts: CallOptions,
    ) -> Result<ModelReply> {
        let content = MessageContent::Parts(vec![
            ContentPart::Text {
                text: prompt.to_string(),
            },
            ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url: Self::image_data_url(image),
                },
            },
        ]);

        self.chat(&self.vision_model, content, opts).await
    }

    async fn analyze_text(&self, prompt: &str, opts: CallOptions) -> Result<ModelReply> {
        let content = MessageContent::Text(prompt.to_string());
        self.chat(&self.text_model, content, opts).await
    }
}

/// Chat-completions request body
#[derive(Debug, Clone, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Clone, Serialize)]
struct ChatMessage {
    role: String,
    content: MessageContent,
}

/// Text-only messages send a plain string; multimodal messages send
/// typed content parts.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, Serialize)]
struct ImageUrl {
    url: String,
}

/// Chat-completions response envelope
#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ModelUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: String,
}

/// GET /models response envelope
#[derive(Debug, Deserialize)]
struct ModelListResponse {
    #[serde(default)]
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
}
