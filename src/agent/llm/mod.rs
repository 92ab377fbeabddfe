//! LLM gateway client with streaming support
//!
//! All models are reached through one OpenAI-compatible chat completions
//! endpoint (the AI gateway); the model id in the request selects the
//! underlying provider. Tests swap the provider behind [`LlmProvider`].

mod gateway;
mod stream;

pub use gateway::GatewayProvider;
pub use stream::*;

use serde::{Deserialize, Serialize};

use crate::agent::domain::{Message, ToolDefinition};

/// Trait for LLM providers. Completion is pull-based: the provider hands
/// back a stream immediately and does its work as the stream is polled.
pub trait LlmProvider: Send + Sync {
    /// Get the provider name
    fn name(&self) -> &str;

    /// Complete a request with streaming
    fn complete_stream(&self, request: CompletionRequest) -> LlmStream;
}

/// One model invocation: the conversation so far plus sampling knobs.
///
/// Unset knobs fall back to provider defaults; the session builds these
/// with struct update syntax over [`Default`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub messages: Vec<Message>,
    /// Overrides the provider default model when set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Tool definitions offered for this invocation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDefinition>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ToolChoice>,
    #[serde(default)]
    pub stream: bool,
}

/// Who decides whether tools get called.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolChoice {
    Auto,
    None,
    Required,
}

/// Why the model stopped emitting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ToolCalls,
    ContentFilter,
}
