//! OpenAI-compatible AI gateway provider

use futures::StreamExt;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use crate::agent::domain::{Message, Role};
use crate::agent::error::{LlmError, LlmResult};
use crate::agent::llm::{
    CompletionRequest, FinishReason, LlmProvider, LlmStream, LlmStreamSender, StreamChunk,
    ToolCallDelta, ToolChoice,
};
use crate::config::GatewaySettings;

/// Provider speaking the OpenAI chat completions protocol to the AI gateway
pub struct GatewayProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    default_model: String,
    default_temperature: Option<f32>,
    default_max_tokens: Option<u32>,
}

impl GatewayProvider {
    /// Create a new gateway provider from configuration
    pub fn new(config: &GatewaySettings) -> LlmResult<Self> {
        if config.api_key.is_empty() {
            return Err(LlmError::Authentication(
                "gateway API key is not configured".to_string(),
            ));
        }

        // No total timeout: responses stream for the whole run. The run
        // deadline is enforced by the session loop.
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| LlmError::InvalidRequest(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            default_model: config.default_model.clone(),
            default_temperature: config.temperature,
            default_max_tokens: config.max_tokens,
        })
    }

    fn build_request_body(&self, request: &CompletionRequest) -> Value {
        let mut body = json!({
            "model": request.model.as_ref().unwrap_or(&self.default_model),
            "messages": Self::convert_messages(&request.messages),
        });

        if let Some(temperature) = request.temperature.or(self.default_temperature) {
            body["temperature"] = json!(temperature);
        }

        if let Some(limit) = request.max_tokens.or(self.default_max_tokens) {
            body["max_tokens"] = json!(limit);
        }

        // Every registered tool carries a complete object schema, forwarded as-is.
        if let Some(tools) = request.tools.as_deref().filter(|defs| !defs.is_empty()) {
            let declarations: Vec<Value> = tools
                .iter()
                .map(|tool| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": tool.name,
                            "description": tool.description,
                            "parameters": tool.parameters,
                        }
                    })
                })
                .collect();
            body["tools"] = Value::Array(declarations);
        }

        if let Some(choice) = &request.tool_choice {
            body["tool_choice"] = json!(match choice {
                ToolChoice::Auto => "auto",
                ToolChoice::None => "none",
                ToolChoice::Required => "required",
            });
        }

        if request.stream {
            body["stream"] = json!(true);
        }

        body
    }

    /// Convert internal messages to the wire format
    fn convert_messages(messages: &[Message]) -> Vec<Value> {
        messages.iter().map(Self::wire_message).collect()
    }

    fn wire_message(message: &Message) -> Value {
        let role = match message.role {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        };
        let mut wire = json!({"role": role, "content": message.content});

        if let Some(calls) = &message.tool_calls {
            let calls: Vec<Value> = calls
                .iter()
                .map(|call| {
                    json!({
                        "id": call.id,
                        "type": "function",
                        "function": {"name": call.name, "arguments": call.arguments},
                    })
                })
                .collect();
            wire["tool_calls"] = Value::Array(calls);
        }

        if let Some(id) = &message.tool_call_id {
            wire["tool_call_id"] = json!(id);
        }

        wire
    }

    async fn relay_sse(call: reqwest::RequestBuilder, sender: LlmStreamSender) -> LlmResult<()> {
        let response = call.send().await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                401 | 403 => LlmError::Authentication(detail),
                code => LlmError::Api {
                    status: code,
                    message: detail,
                },
            });
        }

        let mut body_stream = response.bytes_stream();
        let mut buffer = String::new();
        let mut citations_sent = false;

        while let Some(next) = body_stream.next().await {
            let bytes = next.map_err(|e| LlmError::Streaming(e.to_string()))?;
            buffer.push_str(&String::from_utf8_lossy(&bytes));

            // Frames are newline-delimited `data:` lines
            while let Some(pos) = buffer.find('\n') {
                let line: String = buffer.drain(..=pos).collect();
                let Some(data) = line.trim().strip_prefix("data: ") else {
                    continue;
                };
                if data == "[DONE]" {
                    return Ok(());
                }

                let frame: GatewayStreamResponse = match serde_json::from_str(data) {
                    Ok(frame) => frame,
                    // Keep-alive comments and malformed frames are skipped
                    Err(_) => continue,
                };

                // Citation lists repeat on every frame; forward them once
                if !citations_sent {
                    if let Some(urls) = frame.citations.as_deref().filter(|u| !u.is_empty()) {
                        citations_sent = true;
                        if !sender.send(StreamChunk::citations(urls.to_vec())).await {
                            return Ok(());
                        }
                    }
                }

                let Some(choice) = frame.choices.first() else {
                    continue;
                };

                let mut chunk = StreamChunk {
                    content: choice.delta.content.clone().unwrap_or_default(),
                    reasoning: choice
                        .delta
                        .reasoning_content
                        .clone()
                        .or_else(|| choice.delta.reasoning.clone())
                        .unwrap_or_default(),
                    ..Default::default()
                };

                if let Some(tool_calls) = &choice.delta.tool_calls {
                    for tc in tool_calls {
                        let mut delta = ToolCallDelta::new(tc.index);
                        if let Some(id) = &tc.id {
                            delta = delta.with_id(id);
                        }
                        if let Some(func) = &tc.function {
                            if let Some(name) = &func.name {
                                delta = delta.with_name(name);
                            }
                            if let Some(args) = &func.arguments {
                                delta = delta.with_arguments(args);
                            }
                        }
                        chunk.tool_calls.push(delta);
                    }
                }

                if let Some(reason) = &choice.finish_reason {
                    chunk.finish_reason = Some(match reason.as_str() {
                        "stop" => FinishReason::Stop,
                        "length" => FinishReason::Length,
                        "tool_calls" => FinishReason::ToolCalls,
                        "content_filter" => FinishReason::ContentFilter,
                        _ => FinishReason::Stop,
                    });
                }

                if !sender.send(chunk).await {
                    return Ok(()); // Receiver dropped
                }
            }
        }

        Ok(())
    }
}

impl LlmProvider for GatewayProvider {
    fn name(&self) -> &str {
        "ai-gateway"
    }

    fn complete_stream(&self, request: CompletionRequest) -> LlmStream {
        let (sender, stream) = LlmStream::channel(64);

        let mut req = request;
        req.stream = true;
        let call = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&self.build_request_body(&req));

        tokio::spawn(async move {
            if let Err(e) = Self::relay_sse(call, sender.clone()).await {
                let _ = sender.send_error(e).await;
            }
        });

        stream
    }
}

// Gateway wire types

#[derive(Debug, Deserialize)]
struct GatewayStreamResponse {
    #[serde(default)]
    choices: Vec<GatewayStreamChoice>,
    /// Source urls, populated by search-backed models
    citations: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct GatewayStreamChoice {
    delta: GatewayDelta,
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct GatewayDelta {
    content: Option<String>,
    /// Reasoning trace field used by most reasoning models
    reasoning_content: Option<String>,
    /// Alternate reasoning field name used by some providers
    reasoning: Option<String>,
    tool_calls: Option<Vec<GatewayToolCallDelta>>,
}

#[derive(Debug, Deserialize)]
struct GatewayToolCallDelta {
    #[serde(default)]
    index: usize,
    id: Option<String>,
    function: Option<GatewayFunctionDelta>,
}

#[derive(Debug, Deserialize)]
struct GatewayFunctionDelta {
    name: Option<String>,
    arguments: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::domain::{ToolCall, ToolDefinition};

    fn test_provider() -> GatewayProvider {
        GatewayProvider::new(&GatewaySettings {
            base_url: "https://gateway.example/v1".to_string(),
            api_key: "sk-test".to_string(),
            default_model: "openai/gpt-oss-120b".to_string(),
            web_search_model: "perplexity/sonar".to_string(),
            temperature: Some(0.2),
            max_tokens: Some(1024),
        })
        .unwrap()
    }

    #[test]
    fn test_request_body_includes_tools_and_stream() {
        let provider = test_provider();
        let request = CompletionRequest {
            messages: vec![Message::system("tu es un assistant"), Message::user("bonjour")],
            tools: Some(vec![ToolDefinition::new(
                "getPaymentStatus",
                "Statut de paiement",
                json!({"type": "object", "properties": {}}),
            )]),
            tool_choice: Some(ToolChoice::Auto),
            stream: true,
            ..Default::default()
        };

        let body = provider.build_request_body(&request);
        assert_eq!(body["model"], "openai/gpt-oss-120b");
        assert_eq!(body["stream"], json!(true));
        assert_eq!(body["tool_choice"], "auto");
        assert_eq!(body["tools"][0]["type"], "function");
        assert_eq!(body["tools"][0]["function"]["name"], "getPaymentStatus");
        assert_eq!(body["messages"][0]["role"], "system");
    }

    #[test]
    fn test_model_override_wins_over_default() {
        let provider = test_provider();
        let request = CompletionRequest {
            model: Some("perplexity/sonar".to_string()),
            ..Default::default()
        };
        let body = provider.build_request_body(&request);
        assert_eq!(body["model"], "perplexity/sonar");
    }

    #[test]
    fn test_tool_feedback_messages_round_trip() {
        let calls = vec![ToolCall::new(
            "call_1",
            "checkClaimCoverage",
            r#"{"numContrat":"BH-AUTO-2024-001234","natureSinistre":"vol"}"#,
        )];
        let messages = vec![
            Message::assistant_with_tools("", calls),
            Message::tool_result("call_1", &json!({"status": "ok", "isCovered": true})),
        ];

        let converted = GatewayProvider::convert_messages(&messages);
        assert_eq!(converted[0]["tool_calls"][0]["function"]["name"], "checkClaimCoverage");
        assert_eq!(
            converted[0]["tool_calls"][0]["function"]["arguments"],
            r#"{"numContrat":"BH-AUTO-2024-001234","natureSinistre":"vol"}"#
        );
        assert_eq!(converted[1]["role"], "tool");
        assert_eq!(converted[1]["tool_call_id"], "call_1");
    }

    #[test]
    fn test_stream_frame_parsing_handles_reasoning_and_citations() {
        let frame = r#"{"choices":[{"delta":{"reasoning_content":"je vérifie"},"finish_reason":null}],"citations":["https://example.tn/assurance"]}"#;
        let parsed: GatewayStreamResponse = serde_json::from_str(frame).unwrap();
        assert_eq!(parsed.citations.as_ref().unwrap().len(), 1);
        assert_eq!(
            parsed.choices[0].delta.reasoning_content.as_deref(),
            Some("je vérifie")
        );
    }
}
