//! Conversational agent layer
//!
//! Everything between the HTTP surface and the model gateway:
//! - `domain/` - Core types (Message, ToolCall, AgentEvent)
//! - `llm/` - Streaming gateway client and chunk accumulation
//! - `session` - The bounded tool loop driving one chat turn
//!
//! The layer is wire-agnostic: it emits [`domain::AgentEvent`] values and
//! leaves the UI stream encoding to the protocol module.

pub mod domain;
pub mod error;
pub mod llm;
mod session;

pub use domain::*;
pub use error::LlmError;
pub use llm::GatewayProvider;
pub use session::{ChatSession, RunBudgets};
