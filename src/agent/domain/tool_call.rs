//! Tool call types for the conversation loop

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A tool call requested by the model
///
/// Arguments are kept as the raw JSON text accumulated from the stream so
/// that malformed payloads can be rejected with a schema error instead of
/// being silently replaced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique identifier for this tool call
    pub id: String,
    /// Name of the tool being called
    pub name: String,
    /// Arguments as a JSON string, exactly as emitted by the model
    pub arguments: String,
}

impl ToolCall {
    /// Create a new tool call
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }

    /// Parse the accumulated arguments into a JSON value
    pub fn parsed_arguments(&self) -> Result<Value, serde_json::Error> {
        if self.arguments.trim().is_empty() {
            return Ok(Value::Object(Default::default()));
        }
        serde_json::from_str(&self.arguments)
    }
}

/// Definition of a tool offered to the model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// JSON Schema defining the tool's parameters
    pub parameters: Value,
}

impl ToolDefinition {
    /// Create a new tool definition
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parsed_arguments_empty_is_object() {
        let call = ToolCall::new("call_1", "getPaymentStatus", "");
        assert_eq!(call.parsed_arguments().unwrap(), serde_json::json!({}));
    }

    #[test]
    fn test_parsed_arguments_rejects_truncated_json() {
        let call = ToolCall::new("call_1", "getClaimStatus", r#"{"numSinistre": "SIN-"#);
        assert!(call.parsed_arguments().is_err());
    }
}
