//! Bounded streaming tool loop driving one chat turn
//!
//! Each run is one asynchronous task that owns its conversation buffer.
//! Per step the model is invoked once in streaming mode; requested tool
//! calls are executed concurrently and their results fed back in request
//! order, then the next step begins. The run stops when the model answers
//! without tools, when the step budget is spent, or at the wall-clock
//! deadline. Tool failures never abort the run; model failures do, with a
//! client-safe message.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use futures::StreamExt;
use serde_json::Value;
use tokio::time::Instant;
use uuid::Uuid;

use crate::tools::{error_envelope, ToolDispatcher};

use super::domain::{AgentEvent, AgentStream, AgentStreamSender, Message};
use super::error::safe_user_message;
use super::llm::{CompletionRequest, FinishReason, LlmProvider, ToolCallAccumulator, ToolChoice};

/// Budgets bounding one chat run
#[derive(Debug, Clone, Copy)]
pub struct RunBudgets {
    /// Model invocations allowed per run
    pub max_steps: u32,
    /// Wall-clock ceiling on the whole run, tool time included
    pub run_timeout: Duration,
}

impl RunBudgets {
    pub fn new(max_steps: u32, run_timeout_secs: u64) -> Self {
        Self {
            max_steps,
            run_timeout: Duration::from_secs(run_timeout_secs),
        }
    }
}

impl Default for RunBudgets {
    fn default() -> Self {
        Self::new(5, 30)
    }
}

/// Runs chat turns against the model and the tool registry
pub struct ChatSession {
    llm: Arc<dyn LlmProvider>,
    tools: Arc<dyn ToolDispatcher>,
    budgets: RunBudgets,
}

impl ChatSession {
    pub fn new(llm: Arc<dyn LlmProvider>, tools: Arc<dyn ToolDispatcher>) -> Self {
        Self {
            llm,
            tools,
            budgets: RunBudgets::default(),
        }
    }

    pub fn with_budgets(mut self, budgets: RunBudgets) -> Self {
        self.budgets = budgets;
        self
    }

    /// Run one chat turn. `messages` holds the system prompt and the mapped
    /// history; `model` overrides the provider default when set.
    pub fn run(&self, model: Option<String>, messages: Vec<Message>) -> AgentStream {
        let (sender, stream) = AgentStream::channel(64);
        let llm = self.llm.clone();
        let tools = self.tools.clone();
        let budgets = self.budgets;

        tokio::spawn(async move {
            let deadline = Instant::now() + budgets.run_timeout;
            let run = Self::run_internal(
                llm,
                tools,
                budgets,
                deadline,
                model,
                messages,
                sender.clone(),
            );

            // The timeout drops the run mid-await: the client keeps what
            // was produced so far and the stream finishes normally.
            if tokio::time::timeout_at(deadline, run).await.is_err() {
                tracing::warn!(
                    timeout_secs = budgets.run_timeout.as_secs(),
                    "chat run hit its deadline"
                );
            }
            let _ = sender.send(AgentEvent::RunFinished).await;
        });

        stream
    }

    async fn run_internal(
        llm: Arc<dyn LlmProvider>,
        tools: Arc<dyn ToolDispatcher>,
        budgets: RunBudgets,
        deadline: Instant,
        model: Option<String>,
        mut messages: Vec<Message>,
        sender: AgentStreamSender,
    ) {
        let run_id = Uuid::new_v4().to_string();
        tracing::debug!(run_id = %run_id, "chat run starting");
        if !sender.send(AgentEvent::RunStarted { run_id }).await {
            return;
        }

        let definitions = tools.definitions();

        for step in 0..budgets.max_steps {
            if Instant::now() >= deadline {
                tracing::debug!(step, "deadline reached before the next model invocation");
                return;
            }

            if !sender.send(AgentEvent::StepStarted { step }).await {
                return;
            }

            let request = CompletionRequest {
                messages: messages.clone(),
                model: model.clone(),
                tools: if definitions.is_empty() {
                    None
                } else {
                    Some(definitions.clone())
                },
                tool_choice: Some(ToolChoice::Auto),
                stream: true,
                ..Default::default()
            };

            let mut stream = llm.complete_stream(request);
            let mut content = String::new();
            let mut accumulator = ToolCallAccumulator::new();
            let mut announced: Vec<bool> = Vec::new();
            let mut finish_reason = None;

            while let Some(result) = stream.next().await {
                let chunk = match result {
                    Ok(chunk) => chunk,
                    Err(err) => {
                        tracing::error!(error = %err, step, "model stream failed");
                        let _ = sender
                            .send(AgentEvent::run_error(safe_user_message(&err.to_string())))
                            .await;
                        return;
                    }
                };

                if !chunk.content.is_empty() {
                    content.push_str(&chunk.content);
                    if !sender.send(AgentEvent::text(&chunk.content)).await {
                        return;
                    }
                }
                if !chunk.reasoning.is_empty()
                    && !sender.send(AgentEvent::reasoning(&chunk.reasoning)).await
                {
                    return;
                }
                for url in &chunk.citations {
                    if !sender.send(AgentEvent::source(url)).await {
                        return;
                    }
                }

                for delta in &chunk.tool_calls {
                    accumulator.apply_delta(delta);
                    while announced.len() <= delta.index {
                        announced.push(false);
                    }
                    // Announce the call once both its id and name are known.
                    if !announced[delta.index] {
                        if let (Some(id), Some(name)) =
                            (accumulator.id_at(delta.index), accumulator.name_at(delta.index))
                        {
                            announced[delta.index] = true;
                            let started = AgentEvent::ToolInputStart {
                                id: id.to_string(),
                                name: name.to_string(),
                            };
                            if !sender.send(started).await {
                                return;
                            }
                        }
                    }
                    if announced[delta.index] {
                        if let Some(args) = delta.arguments.as_deref().filter(|a| !a.is_empty()) {
                            if let Some(id) = accumulator.id_at(delta.index) {
                                let event = AgentEvent::ToolInputDelta {
                                    id: id.to_string(),
                                    delta: args.to_string(),
                                };
                                if !sender.send(event).await {
                                    return;
                                }
                            }
                        }
                    }
                }

                if let Some(reason) = chunk.finish_reason {
                    finish_reason = Some(reason);
                }
            }

            let tool_calls = accumulator.build();

            if tool_calls.is_empty() || finish_reason == Some(FinishReason::Stop) {
                let _ = sender.send(AgentEvent::StepFinished { step }).await;
                return;
            }

            for call in &tool_calls {
                let event = AgentEvent::ToolInputAvailable {
                    id: call.id.clone(),
                    name: call.name.clone(),
                    input: call.parsed_arguments().unwrap_or(Value::Null),
                };
                if !sender.send(event).await {
                    return;
                }
            }

            messages.push(Message::assistant_with_tools(content, tool_calls.clone()));

            // Dispatch concurrently; join_all preserves request order.
            let outcomes = join_all(tool_calls.iter().map(|call| {
                let tools = tools.clone();
                async move { tools.dispatch(&call.name, &call.arguments).await }
            }))
            .await;

            for (call, outcome) in tool_calls.iter().zip(outcomes) {
                let feedback = match outcome {
                    Ok(output) => {
                        let event = AgentEvent::ToolOutputAvailable {
                            id: call.id.clone(),
                            output: output.clone(),
                        };
                        if !sender.send(event).await {
                            return;
                        }
                        output
                    }
                    Err(err) => {
                        let event = AgentEvent::ToolOutputError {
                            id: call.id.clone(),
                            message: err.user_message().to_string(),
                        };
                        if !sender.send(event).await {
                            return;
                        }
                        error_envelope(&err)
                    }
                };
                messages.push(Message::tool_result(&call.id, &feedback));
            }

            if !sender.send(AgentEvent::StepFinished { step }).await {
                return;
            }
        }

        tracing::debug!(max_steps = budgets.max_steps, "step budget exhausted");
    }
}
