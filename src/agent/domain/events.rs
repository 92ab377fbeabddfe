//! Streaming events emitted by a chat run
//!
//! The session loop pushes these through a channel; the HTTP layer turns
//! them into the UI message stream wire format. Error events always carry
//! client-safe text, never internal error details.

use futures::Stream;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;

/// An event produced while running a chat turn
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// The run started
    RunStarted { run_id: String },
    /// A model invocation started
    StepStarted { step: u32 },
    /// Streamed answer text
    TextDelta { delta: String },
    /// Streamed model reasoning
    ReasoningDelta { delta: String },
    /// Source citation attached to the answer
    Source { url: String },
    /// The model started emitting a tool call
    ToolInputStart { id: String, name: String },
    /// Partial tool arguments
    ToolInputDelta { id: String, delta: String },
    /// Complete tool call with parsed arguments
    ToolInputAvailable {
        id: String,
        name: String,
        input: Value,
    },
    /// Tool executed successfully
    ToolOutputAvailable { id: String, output: Value },
    /// Tool failed; message is already client-safe
    ToolOutputError { id: String, message: String },
    /// A model invocation finished (including its tool executions)
    StepFinished { step: u32 },
    /// The run failed; message is already client-safe
    RunError { message: String },
    /// The run ended, successfully or not
    RunFinished,
}

impl AgentEvent {
    pub fn text(delta: impl Into<String>) -> Self {
        Self::TextDelta {
            delta: delta.into(),
        }
    }

    pub fn reasoning(delta: impl Into<String>) -> Self {
        Self::ReasoningDelta {
            delta: delta.into(),
        }
    }

    pub fn source(url: impl Into<String>) -> Self {
        Self::Source { url: url.into() }
    }

    pub fn run_error(message: impl Into<String>) -> Self {
        Self::RunError {
            message: message.into(),
        }
    }
}

/// Streaming side of a chat run
pub struct AgentStream {
    receiver: mpsc::Receiver<AgentEvent>,
}

impl AgentStream {
    /// Create a channel pair for building an agent stream
    pub fn channel(buffer: usize) -> (AgentStreamSender, Self) {
        let (tx, rx) = mpsc::channel(buffer);
        (AgentStreamSender { sender: tx }, Self { receiver: rx })
    }

    /// Drain all events into a vector (test helper)
    pub async fn collect_events(mut self) -> Vec<AgentEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.receiver.recv().await {
            events.push(event);
        }
        events
    }
}

impl Stream for AgentStream {
    type Item = AgentEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.receiver).poll_recv(cx)
    }
}

/// Sender half for building an agent stream
#[derive(Clone)]
pub struct AgentStreamSender {
    sender: mpsc::Sender<AgentEvent>,
}

impl AgentStreamSender {
    /// Send an event; returns false when the client is gone
    pub async fn send(&self, event: AgentEvent) -> bool {
        self.sender.send(event).await.is_ok()
    }
}
