//! Agent event to UI stream event encoding
//!
//! Stateful translation of [`AgentEvent`] values into the wire events of the
//! UI message stream. Text and reasoning blocks are opened lazily on their
//! first delta and closed on block boundaries (tool activity, step end, run
//! end), so `*-start` and `*-end` events are always paired.

use crate::agent::AgentEvent;

use super::events::UiStreamEvent;

/// Encodes one chat run. Create a fresh encoder per response stream.
#[derive(Debug, Default)]
pub struct StreamEncoder {
    text_open: bool,
    text_counter: u32,
    reasoning_open: bool,
    reasoning_counter: u32,
    source_counter: u32,
    finished: bool,
}

impl StreamEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `finish` has been emitted.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn text_id(&self) -> String {
        format!("txt-{}", self.text_counter)
    }

    fn reasoning_id(&self) -> String {
        format!("rsn-{}", self.reasoning_counter)
    }

    /// Close whichever text/reasoning blocks are open, bumping their
    /// counters so the next block gets a fresh id.
    fn close_open_blocks(&mut self, events: &mut Vec<UiStreamEvent>) {
        if self.text_open {
            events.push(UiStreamEvent::text_end(self.text_id()));
            self.text_open = false;
            self.text_counter += 1;
        }
        if self.reasoning_open {
            events.push(UiStreamEvent::reasoning_end(self.reasoning_id()));
            self.reasoning_open = false;
            self.reasoning_counter += 1;
        }
    }

    /// Translate one agent event. Events arriving after the run finished
    /// are dropped.
    pub fn encode(&mut self, event: &AgentEvent) -> Vec<UiStreamEvent> {
        if self.finished {
            return Vec::new();
        }

        match event {
            AgentEvent::RunStarted { run_id } => {
                let prefix = run_id.get(..8).unwrap_or(run_id);
                vec![UiStreamEvent::start(format!("msg-{prefix}"))]
            }
            AgentEvent::StepStarted { .. } => vec![UiStreamEvent::StartStep],

            AgentEvent::TextDelta { delta } => {
                let mut events = Vec::new();
                if !self.text_open {
                    self.text_open = true;
                    events.push(UiStreamEvent::text_start(self.text_id()));
                }
                events.push(UiStreamEvent::text_delta(self.text_id(), delta));
                events
            }
            AgentEvent::ReasoningDelta { delta } => {
                let mut events = Vec::new();
                if !self.reasoning_open {
                    self.reasoning_open = true;
                    events.push(UiStreamEvent::reasoning_start(self.reasoning_id()));
                }
                events.push(UiStreamEvent::reasoning_delta(self.reasoning_id(), delta));
                events
            }
            AgentEvent::Source { url } => {
                let id = format!("src-{}", self.source_counter);
                self.source_counter += 1;
                vec![UiStreamEvent::source_url(id, url)]
            }

            AgentEvent::ToolInputStart { id, name } => {
                let mut events = Vec::new();
                self.close_open_blocks(&mut events);
                events.push(UiStreamEvent::tool_input_start(id, name));
                events
            }
            AgentEvent::ToolInputDelta { id, delta } => {
                vec![UiStreamEvent::tool_input_delta(id, delta)]
            }
            AgentEvent::ToolInputAvailable { id, name, input } => {
                let mut events = Vec::new();
                self.close_open_blocks(&mut events);
                events.push(UiStreamEvent::tool_input_available(id, name, input.clone()));
                events
            }
            AgentEvent::ToolOutputAvailable { id, output } => {
                vec![UiStreamEvent::tool_output_available(id, output.clone())]
            }
            AgentEvent::ToolOutputError { id, message } => {
                vec![UiStreamEvent::tool_output_error(id, message)]
            }

            AgentEvent::StepFinished { .. } => {
                let mut events = Vec::new();
                self.close_open_blocks(&mut events);
                events.push(UiStreamEvent::FinishStep);
                events
            }
            AgentEvent::RunError { message } => {
                let mut events = Vec::new();
                self.close_open_blocks(&mut events);
                events.push(UiStreamEvent::error(message));
                events
            }
            AgentEvent::RunFinished => {
                self.finished = true;
                let mut events = Vec::new();
                self.close_open_blocks(&mut events);
                events.push(UiStreamEvent::Finish);
                events
            }
        }
    }

    /// Close the stream if the run ended without `RunFinished`. Returns the
    /// trailing events to emit, empty when `finish` already went out.
    pub fn finalize(&mut self) -> Vec<UiStreamEvent> {
        if self.finished {
            return Vec::new();
        }
        self.finished = true;
        let mut events = Vec::new();
        self.close_open_blocks(&mut events);
        events.push(UiStreamEvent::Finish);
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn type_tag(event: &UiStreamEvent) -> String {
        serde_json::to_value(event).unwrap()["type"]
            .as_str()
            .unwrap()
            .to_string()
    }

    fn encode_all(events: &[AgentEvent]) -> Vec<UiStreamEvent> {
        let mut encoder = StreamEncoder::new();
        events.iter().flat_map(|e| encoder.encode(e)).collect()
    }

    #[test]
    fn test_plain_text_run() {
        let out = encode_all(&[
            AgentEvent::RunStarted {
                run_id: "3f2e1d0c-aaaa-bbbb-cccc-000000000000".into(),
            },
            AgentEvent::StepStarted { step: 0 },
            AgentEvent::text("Bonjour"),
            AgentEvent::text(" !"),
            AgentEvent::StepFinished { step: 0 },
            AgentEvent::RunFinished,
        ]);

        let tags: Vec<String> = out.iter().map(type_tag).collect();
        assert_eq!(
            tags,
            vec![
                "start",
                "start-step",
                "text-start",
                "text-delta",
                "text-delta",
                "text-end",
                "finish-step",
                "finish",
            ]
        );
        assert_eq!(out[0], UiStreamEvent::start("msg-3f2e1d0c"));
        // Both deltas belong to the block opened lazily.
        assert_eq!(out[2], UiStreamEvent::text_start("txt-0"));
        assert_eq!(out[4], UiStreamEvent::text_delta("txt-0", " !"));
        assert_eq!(out[5], UiStreamEvent::text_end("txt-0"));
    }

    #[test]
    fn test_tool_activity_closes_the_text_block() {
        let out = encode_all(&[
            AgentEvent::text("Je vérifie"),
            AgentEvent::ToolInputStart {
                id: "call_1".into(),
                name: "getClaimStatus".into(),
            },
            AgentEvent::ToolInputDelta {
                id: "call_1".into(),
                delta: "{\"numSinistre\"".into(),
            },
            AgentEvent::text("Voici"),
        ]);

        let tags: Vec<String> = out.iter().map(type_tag).collect();
        assert_eq!(
            tags,
            vec![
                "text-start",
                "text-delta",
                "text-end",
                "tool-input-start",
                "tool-input-delta",
                "text-start",
                "text-delta",
            ]
        );
        // The block reopened after the tool call gets a fresh id.
        assert_eq!(out[5], UiStreamEvent::text_start("txt-1"));
    }

    #[test]
    fn test_reasoning_and_text_blocks_are_independent() {
        let out = encode_all(&[
            AgentEvent::reasoning("Le client demande"),
            AgentEvent::text("Bonjour"),
            AgentEvent::StepFinished { step: 0 },
        ]);

        assert_eq!(out[0], UiStreamEvent::reasoning_start("rsn-0"));
        assert_eq!(out[2], UiStreamEvent::text_start("txt-0"));
        // Step end closes both before finish-step.
        let tags: Vec<String> = out.iter().map(type_tag).collect();
        assert_eq!(
            &tags[4..],
            ["text-end", "reasoning-end", "finish-step"]
        );
    }

    #[test]
    fn test_sources_get_sequential_ids() {
        let out = encode_all(&[
            AgentEvent::source("https://example.com/a"),
            AgentEvent::source("https://example.com/b"),
        ]);
        assert_eq!(out[0], UiStreamEvent::source_url("src-0", "https://example.com/a"));
        assert_eq!(out[1], UiStreamEvent::source_url("src-1", "https://example.com/b"));
    }

    #[test]
    fn test_error_run_still_finishes_once() {
        let out = encode_all(&[
            AgentEvent::text("Un inst"),
            AgentEvent::run_error("Une erreur s'est produite lors du traitement de votre demande. Veuillez réessayer."),
            AgentEvent::RunFinished,
        ]);

        let tags: Vec<String> = out.iter().map(type_tag).collect();
        assert_eq!(
            tags,
            vec!["text-start", "text-delta", "text-end", "error", "finish"]
        );
        assert_eq!(tags.iter().filter(|t| *t == "finish").count(), 1);
    }

    #[test]
    fn test_finalize_covers_abnormal_termination() {
        let mut encoder = StreamEncoder::new();
        encoder.encode(&AgentEvent::text("coup"));

        let trailing = encoder.finalize();
        let tags: Vec<String> = trailing.iter().map(type_tag).collect();
        assert_eq!(tags, vec!["text-end", "finish"]);
        assert!(encoder.finalize().is_empty());
    }

    #[test]
    fn test_events_after_finish_are_dropped() {
        let mut encoder = StreamEncoder::new();
        encoder.encode(&AgentEvent::RunFinished);
        assert!(encoder.encode(&AgentEvent::text("tard")).is_empty());
        assert!(encoder
            .encode(&AgentEvent::ToolOutputAvailable {
                id: "call_9".into(),
                output: json!({}),
            })
            .is_empty());
    }
}
