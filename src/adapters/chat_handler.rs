//! Chat endpoint and model catalog
//!
//! `POST /api/chat` accepts the conversation in UI-message form, resolves
//! the effective model, and streams the run back as a UI message stream
//! over SSE. Malformed JSON is the only non-200 outcome; failures after
//! the stream starts arrive in-band as `error` events.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::agent::{AgentEvent, AgentStream, ChatSession, Message};
use crate::prompt::SYSTEM_PROMPT;
use crate::protocol::{StreamEncoder, UiStreamEvent, DONE_MARKER};

use super::metrics_handler::MetricsCollector;

/// Stream protocol marker header expected by the UI.
pub const STREAM_PROTOCOL_HEADER: &str = "x-vercel-ai-ui-message-stream";

/// Models offered to the UI. Advisory only: ids outside the catalog are
/// forwarded to the gateway untouched.
const MODEL_CATALOG: &[(&str, &str)] = &[
    ("GPT OSS", "openai/gpt-oss-120b"),
    ("Command R", "cohere/command-r"),
    ("Gemini 2.5 flash", "google/gemini-2.5-flash"),
    ("Deepseek R1", "deepseek/deepseek-r1"),
];

/// Shared state for the /api routes.
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<ChatSession>,
    pub metrics: Arc<MetricsCollector>,
    pub default_model: String,
    pub web_search_model: String,
}

/// Role of a UI message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UiRole {
    System,
    User,
    Assistant,
}

/// One part of a UI message. Only text parts carry conversational
/// content; every other part kind is accepted and ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum UiMessagePart {
    Text {
        text: String,
    },
    #[serde(untagged)]
    Other(Value),
}

/// A conversation message as the UI sends it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub role: UiRole,
    #[serde(default)]
    pub parts: Vec<UiMessagePart>,
}

impl UiMessage {
    /// All text parts concatenated.
    pub fn text_content(&self) -> String {
        self.parts
            .iter()
            .filter_map(|part| match part {
                UiMessagePart::Text { text } => Some(text.as_str()),
                UiMessagePart::Other(_) => None,
            })
            .collect()
    }
}

/// Body of `POST /api/chat`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub messages: Vec<UiMessage>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub web_search: Option<bool>,
}

impl ChatRequest {
    /// The model id effectively used for the whole run. Web search routes
    /// to the search-capable model regardless of the requested one.
    fn resolve_model(&self, state: &AppState) -> String {
        if self.web_search.unwrap_or(false) {
            state.web_search_model.clone()
        } else {
            self.model
                .clone()
                .unwrap_or_else(|| state.default_model.clone())
        }
    }

    /// Map the UI conversation to model messages: system prompt first,
    /// then one message per UI message with its text parts concatenated.
    /// Messages with no text are dropped.
    fn conversation(&self) -> Vec<Message> {
        let mut messages = vec![Message::system(SYSTEM_PROMPT)];
        for ui in &self.messages {
            let text = ui.text_content();
            if text.is_empty() {
                continue;
            }
            messages.push(match ui.role {
                UiRole::System => Message::system(text),
                UiRole::User => Message::user(text),
                UiRole::Assistant => Message::assistant(text),
            });
        }
        messages
    }
}

pub async fn chat(State(state): State<AppState>, Json(request): Json<ChatRequest>) -> Response {
    state
        .metrics
        .requests_total
        .with_label_values(&["/api/chat"])
        .inc();

    let model = request.resolve_model(&state);
    let messages = request.conversation();
    tracing::info!(
        model = %model,
        messages = messages.len() - 1,
        web_search = request.web_search.unwrap_or(false),
        "chat run requested"
    );

    let events = state.session.run(Some(model), messages);
    ui_stream_response(events, state.metrics.clone())
}

pub async fn list_models(State(state): State<AppState>) -> impl IntoResponse {
    state
        .metrics
        .requests_total
        .with_label_values(&["/api/models"])
        .inc();

    let models: Vec<Value> = MODEL_CATALOG
        .iter()
        .map(|(name, value)| json!({"name": name, "value": value}))
        .collect();
    Json(json!({
        "models": models,
        "default": state.default_model,
    }))
}

/// Bridge the agent event stream onto an SSE response body.
fn ui_stream_response(events: AgentStream, metrics: Arc<MetricsCollector>) -> Response {
    let (tx, rx) = mpsc::channel::<Result<Bytes, Infallible>>(64);

    tokio::spawn(async move {
        let started = Instant::now();
        metrics.chat_runs_in_flight.inc();
        let outcome = pump_run(events, &tx).await;
        metrics.chat_runs_in_flight.dec();
        metrics.chat_runs_total.with_label_values(&[outcome]).inc();
        metrics
            .chat_run_duration
            .observe(started.elapsed().as_secs_f64());
    });

    sse_response(ReceiverStream::new(rx))
}

/// Encode agent events into SSE frames until the run ends or the client
/// disconnects. Returns the run outcome for metrics.
async fn pump_run(
    mut events: AgentStream,
    tx: &mpsc::Sender<Result<Bytes, Infallible>>,
) -> &'static str {
    let mut encoder = StreamEncoder::new();
    let mut outcome = "completed";

    while let Some(event) = events.next().await {
        if matches!(event, AgentEvent::RunError { .. }) {
            outcome = "error";
        }
        for wire in encoder.encode(&event) {
            if !send_frame(tx, &wire).await {
                return "aborted";
            }
        }
    }
    for wire in encoder.finalize() {
        if !send_frame(tx, &wire).await {
            return "aborted";
        }
    }

    let done = Bytes::from(format!("data: {DONE_MARKER}\n\n"));
    if tx.send(Ok(done)).await.is_err() {
        return "aborted";
    }
    outcome
}

async fn send_frame(tx: &mpsc::Sender<Result<Bytes, Infallible>>, event: &UiStreamEvent) -> bool {
    let json = match serde_json::to_string(event) {
        Ok(json) => json,
        Err(err) => {
            tracing::error!(error = %err, "failed to serialize stream event");
            return false;
        }
    };
    tx.send(Ok(Bytes::from(format!("data: {json}\n\n"))))
        .await
        .is_ok()
}

fn sse_response<S>(stream: S) -> Response
where
    S: futures::Stream<Item = Result<Bytes, Infallible>> + Send + 'static,
{
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/event-stream"),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert(
        HeaderName::from_static(STREAM_PROTOCOL_HEADER),
        HeaderValue::from_static("v1"),
    );
    (headers, Body::from_stream(stream)).into_response()
}
