//! Gateway to the remote vision/text model
//!
//! Thin transport layer: sends an image plus prompt (or a text-only
//! prompt) to an OpenAI-compatible chat-completions API and returns the
//! raw reply text with token usage. No reply parsing happens here.

pub mod client;
pub mod retry;

pub use client::VisionModelClient;
pub use retry::RetryPolicy;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::Result;

/// Token usage reported by the remote API for one call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelUsage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

/// Raw successful reply from the remote model
#[derive(Debug, Clone)]
pub struct ModelReply {
    /// Verbatim assistant text, fences and all
    pub text: String,
    pub usage: ModelUsage,
    /// Model that actually served the call
    pub model: String,
}

/// Per-call sampling options
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CallOptions {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl CallOptions {
    /// Low temperature keeps framing verdicts consistent between shots
    pub const PHOTO_VALIDATION: CallOptions = CallOptions {
        temperature: 0.3,
        max_tokens: 512,
    };

    /// Full diagnosis needs room for the complete JSON schema
    pub const DIAGNOSIS: CallOptions = CallOptions {
        temperature: 0.7,
        max_tokens: 2048,
    };

    /// One-word verdict; near-deterministic
    pub const MODERATION: CallOptions = CallOptions {
        temperature: 0.2,
        max_tokens: 20,
    };

    pub const QUICK_TIPS: CallOptions = CallOptions {
        temperature: 0.7,
        max_tokens: 512,
    };
}

/// Transport to the remote multimodal capability.
///
/// Implementations move bytes and report transport failures; everything
/// above this trait treats the reply as opaque text.
#[async_trait]
pub trait ModelGateway: Send + Sync {
    /// Send an image and an instruction prompt to the vision model.
    async fn analyze_image(
        &self,
        image: &[u8],
        prompt: &str,
        opts: CallOptions,
    ) -> Result<ModelReply>;

    /// Send a text-only prompt to the text model.
    async fn analyze_text(&self, prompt: &str, opts: CallOptions) -> Result<ModelReply>;
}
