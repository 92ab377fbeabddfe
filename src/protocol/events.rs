//! UI message stream wire events
//!
//! Event shapes follow the AI SDK UI Message Stream protocol: each event is
//! one SSE `data:` line carrying a JSON object tagged by `type`, fields in
//! camelCase. See <https://ai-sdk.dev/docs/ai-sdk-ui/stream-protocol>.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Terminator payload sent after the last event of a stream.
pub const DONE_MARKER: &str = "[DONE]";

/// One event of the UI message stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum UiStreamEvent {
    /// Opens the assistant message.
    Start {
        #[serde(rename = "messageId", skip_serializing_if = "Option::is_none")]
        message_id: Option<String>,
    },

    /// Marks the beginning of one model invocation.
    StartStep,

    /// Opens a text block.
    TextStart { id: String },

    /// Incremental text content for an open block.
    TextDelta { id: String, delta: String },

    /// Closes a text block.
    TextEnd { id: String },

    /// Opens a reasoning block.
    ReasoningStart { id: String },

    /// Incremental reasoning content for an open block.
    ReasoningDelta { id: String, delta: String },

    /// Closes a reasoning block.
    ReasoningEnd { id: String },

    /// Announces a tool call before its arguments have streamed.
    ToolInputStart {
        #[serde(rename = "toolCallId")]
        tool_call_id: String,
        #[serde(rename = "toolName")]
        tool_name: String,
    },

    /// Incremental fragment of the tool call arguments.
    ToolInputDelta {
        #[serde(rename = "toolCallId")]
        tool_call_id: String,
        #[serde(rename = "inputTextDelta")]
        input_text_delta: String,
    },

    /// Complete tool input, ready for execution.
    ToolInputAvailable {
        #[serde(rename = "toolCallId")]
        tool_call_id: String,
        #[serde(rename = "toolName")]
        tool_name: String,
        input: Value,
    },

    /// Result of a successful tool execution.
    ToolOutputAvailable {
        #[serde(rename = "toolCallId")]
        tool_call_id: String,
        output: Value,
    },

    /// Client-safe failure of a tool execution.
    ToolOutputError {
        #[serde(rename = "toolCallId")]
        tool_call_id: String,
        #[serde(rename = "errorText")]
        error_text: String,
    },

    /// External URL cited by the model.
    SourceUrl {
        #[serde(rename = "sourceId")]
        source_id: String,
        url: String,
    },

    /// Marks the end of one model invocation.
    FinishStep,

    /// Closes the assistant message.
    Finish,

    /// Client-safe run failure. The stream still ends with `finish`.
    Error {
        #[serde(rename = "errorText")]
        error_text: String,
    },
}

impl UiStreamEvent {
    pub fn start(message_id: impl Into<String>) -> Self {
        Self::Start {
            message_id: Some(message_id.into()),
        }
    }

    pub fn text_start(id: impl Into<String>) -> Self {
        Self::TextStart { id: id.into() }
    }

    pub fn text_delta(id: impl Into<String>, delta: impl Into<String>) -> Self {
        Self::TextDelta {
            id: id.into(),
            delta: delta.into(),
        }
    }

    pub fn text_end(id: impl Into<String>) -> Self {
        Self::TextEnd { id: id.into() }
    }

    pub fn reasoning_start(id: impl Into<String>) -> Self {
        Self::ReasoningStart { id: id.into() }
    }

    pub fn reasoning_delta(id: impl Into<String>, delta: impl Into<String>) -> Self {
        Self::ReasoningDelta {
            id: id.into(),
            delta: delta.into(),
        }
    }

    pub fn reasoning_end(id: impl Into<String>) -> Self {
        Self::ReasoningEnd { id: id.into() }
    }

    pub fn tool_input_start(tool_call_id: impl Into<String>, tool_name: impl Into<String>) -> Self {
        Self::ToolInputStart {
            tool_call_id: tool_call_id.into(),
            tool_name: tool_name.into(),
        }
    }

    pub fn tool_input_delta(tool_call_id: impl Into<String>, delta: impl Into<String>) -> Self {
        Self::ToolInputDelta {
            tool_call_id: tool_call_id.into(),
            input_text_delta: delta.into(),
        }
    }

    pub fn tool_input_available(
        tool_call_id: impl Into<String>,
        tool_name: impl Into<String>,
        input: Value,
    ) -> Self {
        Self::ToolInputAvailable {
            tool_call_id: tool_call_id.into(),
            tool_name: tool_name.into(),
            input,
        }
    }

    pub fn tool_output_available(tool_call_id: impl Into<String>, output: Value) -> Self {
        Self::ToolOutputAvailable {
            tool_call_id: tool_call_id.into(),
            output,
        }
    }

    pub fn tool_output_error(tool_call_id: impl Into<String>, error_text: impl Into<String>) -> Self {
        Self::ToolOutputError {
            tool_call_id: tool_call_id.into(),
            error_text: error_text.into(),
        }
    }

    pub fn source_url(source_id: impl Into<String>, url: impl Into<String>) -> Self {
        Self::SourceUrl {
            source_id: source_id.into(),
            url: url.into(),
        }
    }

    pub fn error(error_text: impl Into<String>) -> Self {
        Self::Error {
            error_text: error_text.into(),
        }
    }
}
