//! Chunked model output and tool-call reassembly.
//!
//! Providers push [`StreamChunk`] values through a channel-backed
//! [`LlmStream`]; the session loop folds tool-call fragments back into
//! complete calls with [`ToolCallAccumulator`]. Errors travel in-band as
//! the final stream item.

use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;

use crate::agent::domain::ToolCall;
use crate::agent::error::LlmError;

/// One streamed fragment of a model response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreamChunk {
    /// Answer text delta
    #[serde(default)]
    pub content: String,
    /// Reasoning delta, for models that expose their thinking
    #[serde(default)]
    pub reasoning: String,
    /// Tool-call fragments carried by this chunk
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallDelta>,
    /// Source citation urls, surfaced once per response
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub citations: Vec<String>,
    /// Set on the chunk that ends the response
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<super::FinishReason>,
}

impl StreamChunk {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn reasoning(reasoning: impl Into<String>) -> Self {
        Self {
            reasoning: reasoning.into(),
            ..Default::default()
        }
    }

    pub fn tool_call(delta: ToolCallDelta) -> Self {
        Self {
            tool_calls: vec![delta],
            ..Default::default()
        }
    }

    pub fn citations(urls: Vec<String>) -> Self {
        Self {
            citations: urls,
            ..Default::default()
        }
    }

    pub fn finish(reason: super::FinishReason) -> Self {
        Self {
            finish_reason: Some(reason),
            ..Default::default()
        }
    }
}

/// Fragment of one tool call, addressed by its position in the response.
///
/// The id and name usually arrive whole in the first fragment; argument
/// text trickles in over many fragments and is concatenated as raw JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolCallDelta {
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<String>,
}

impl ToolCallDelta {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_arguments(mut self, args: impl Into<String>) -> Self {
        self.arguments = Some(args.into());
        self
    }
}

/// Reassembles interleaved [`ToolCallDelta`] fragments into whole calls.
#[derive(Debug, Default)]
pub struct ToolCallAccumulator {
    partials: Vec<PartialCall>,
}

#[derive(Debug, Default)]
struct PartialCall {
    id: String,
    name: String,
    arguments: String,
}

impl ToolCallAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one fragment into the call at its index.
    pub fn apply_delta(&mut self, delta: &ToolCallDelta) {
        if self.partials.len() <= delta.index {
            self.partials.resize_with(delta.index + 1, PartialCall::default);
        }
        let slot = &mut self.partials[delta.index];
        if let Some(id) = &delta.id {
            slot.id.push_str(id);
        }
        if let Some(name) = &delta.name {
            slot.name.push_str(name);
        }
        if let Some(fragment) = &delta.arguments {
            slot.arguments.push_str(fragment);
        }
    }

    /// Call id at an index, once any fragment has delivered it.
    pub fn id_at(&self, index: usize) -> Option<&str> {
        self.partials
            .get(index)
            .filter(|p| !p.id.is_empty())
            .map(|p| p.id.as_str())
    }

    /// Tool name at an index, once any fragment has delivered it.
    pub fn name_at(&self, index: usize) -> Option<&str> {
        self.partials
            .get(index)
            .filter(|p| !p.name.is_empty())
            .map(|p| p.name.as_str())
    }

    /// Finish reassembly, keeping the raw argument text per call.
    ///
    /// Calls that never received an id or a name are dropped; there is
    /// nothing to execute and nothing to attribute a result to.
    pub fn build(self) -> Vec<ToolCall> {
        self.partials
            .into_iter()
            .filter(|p| !p.id.is_empty() && !p.name.is_empty())
            .map(|p| ToolCall {
                id: p.id,
                name: p.name,
                arguments: p.arguments,
            })
            .collect()
    }
}

/// Receiving half of a model response stream.
pub struct LlmStream {
    receiver: mpsc::Receiver<Result<StreamChunk, LlmError>>,
}

impl LlmStream {
    /// Build a sender/stream pair with the given channel capacity.
    pub fn channel(buffer: usize) -> (LlmStreamSender, Self) {
        let (tx, rx) = mpsc::channel(buffer);
        (LlmStreamSender { sender: tx }, Self { receiver: rx })
    }
}

impl Stream for LlmStream {
    type Item = Result<StreamChunk, LlmError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.receiver).poll_recv(cx)
    }
}

/// Sending half of a model response stream.
///
/// Sends report whether the consumer is still listening; a dropped
/// receiver is how a disconnected client cancels a response mid-flight.
#[derive(Clone)]
pub struct LlmStreamSender {
    sender: mpsc::Sender<Result<StreamChunk, LlmError>>,
}

impl LlmStreamSender {
    pub async fn send(&self, chunk: StreamChunk) -> bool {
        self.sender.send(Ok(chunk)).await.is_ok()
    }

    pub async fn send_error(&self, error: LlmError) -> bool {
        self.sender.send(Err(error)).await.is_ok()
    }

    pub async fn send_finish(&self, reason: super::FinishReason) -> bool {
        self.send(StreamChunk::finish(reason)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulator_rebuilds_interleaved_calls() {
        let mut acc = ToolCallAccumulator::new();
        acc.apply_delta(&ToolCallDelta::new(0).with_id("call_a").with_name("getPaymentStatus"));
        acc.apply_delta(&ToolCallDelta::new(1).with_id("call_b").with_name("getClaimStatus"));
        acc.apply_delta(&ToolCallDelta::new(0).with_arguments(r#"{"refPer"#));
        acc.apply_delta(&ToolCallDelta::new(1).with_arguments(r#"{"numSinistre":"SIN-1"}"#));
        acc.apply_delta(&ToolCallDelta::new(0).with_arguments(r#"sonne":1001}"#));

        let calls = acc.build();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].name, "getPaymentStatus");
        assert_eq!(calls[0].arguments, r#"{"refPersonne":1001}"#);
        assert_eq!(calls[1].id, "call_b");
    }

    #[test]
    fn test_accumulator_discards_incomplete_calls() {
        let mut acc = ToolCallAccumulator::new();
        acc.apply_delta(&ToolCallDelta::new(0).with_arguments("{}"));
        acc.apply_delta(&ToolCallDelta::new(1).with_id("call_x").with_name("getClaimStatus"));

        // Only the call that received both an id and a name survives.
        let calls = acc.build();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].id, "call_x");
    }

    #[test]
    fn test_partial_identity_becomes_visible_once_streamed() {
        let mut acc = ToolCallAccumulator::new();
        acc.apply_delta(&ToolCallDelta::new(0).with_arguments("{"));
        assert!(acc.id_at(0).is_none());
        assert!(acc.name_at(0).is_none());

        acc.apply_delta(&ToolCallDelta::new(0).with_id("call_7").with_name("generateQuote"));
        assert_eq!(acc.id_at(0), Some("call_7"));
        assert_eq!(acc.name_at(0), Some("generateQuote"));
    }
}
