//! UI message stream protocol (AI SDK v6 compatible)
//!
//! Wire events and the stateful encoder turning agent events into them.
//! SSE framing itself (the `data:` lines and terminator) lives with the
//! HTTP handler.

mod encoder;
mod events;

pub use encoder::StreamEncoder;
pub use events::{UiStreamEvent, DONE_MARKER};
