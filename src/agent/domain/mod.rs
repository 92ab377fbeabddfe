//! Core domain types for the conversation agent

mod events;
mod message;
mod tool_call;

pub use events::{AgentEvent, AgentStream, AgentStreamSender};
pub use message::{Message, Role};
pub use tool_call::{ToolCall, ToolDefinition};
