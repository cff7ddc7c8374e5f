//! Streaming run events and the display sink.
//!
//! `RunEvent` is the local projection of the vendor's streamed run
//! lifecycle. A `RunEventSink` is instantiated once per run, receives each
//! event as it arrives, and is discarded afterwards — nothing it sees feeds
//! back into later messages.

use serde::{Deserialize, Serialize};

/// Terminal status of a remote run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    Failed,
    Cancelled,
    Expired,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::Expired => "expired",
        };
        write!(f, "{s}")
    }
}

/// Events emitted by the vendor while a run streams.
///
/// - `text_delta`        — partial assistant text
/// - `step_created`      — a run step (e.g. tool invocation) started
/// - `step_delta`        — incremental step detail (code-interpreter input)
/// - `step_completed`    — a run step finished
/// - `message_created`   — the assistant opened a new thread message
/// - `message_completed` — that message is final
/// - `run_completed`     — the run reached a terminal status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEvent {
    /// Partial assistant text.
    TextDelta { value: String },

    /// A run step started.
    StepCreated { id: String, step_type: String },

    /// Incremental detail for a step (code-interpreter input fragments).
    StepDelta {
        id: String,
        code_input: Option<String>,
    },

    /// A run step finished.
    StepCompleted { id: String },

    /// The assistant opened a new message on the thread.
    MessageCreated { id: String },

    /// The assistant's message is final.
    MessageCompleted { id: String },

    /// The run reached a terminal status.
    RunCompleted { run_id: String, status: RunStatus },
}

impl RunEvent {
    /// Wire event name for this event type.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::TextDelta { .. } => "text_delta",
            Self::StepCreated { .. } => "step_created",
            Self::StepDelta { .. } => "step_delta",
            Self::StepCompleted { .. } => "step_completed",
            Self::MessageCreated { .. } => "message_created",
            Self::MessageCompleted { .. } => "message_completed",
            Self::RunCompleted { .. } => "run_completed",
        }
    }
}

/// Named callbacks invoked as run events arrive.
///
/// Every callback defaults to a no-op so sinks only override what they
/// display. One sink per run; the agent builds a fresh one from its factory
/// each time a run starts.
pub trait RunEventSink: Send {
    fn on_text_delta(&mut self, _value: &str) {}
    fn on_step_created(&mut self, _id: &str, _step_type: &str) {}
    fn on_step_delta(&mut self, _id: &str, _code_input: Option<&str>) {}
    fn on_step_completed(&mut self, _id: &str) {}
    fn on_message_created(&mut self, _id: &str) {}
    fn on_message_completed(&mut self, _id: &str) {}
    fn on_run_completed(&mut self, _run_id: &str, _status: RunStatus) {}

    /// Route one event to its named callback.
    fn dispatch(&mut self, event: &RunEvent) {
        match event {
            RunEvent::TextDelta { value } => self.on_text_delta(value),
            RunEvent::StepCreated { id, step_type } => self.on_step_created(id, step_type),
            RunEvent::StepDelta { id, code_input } => {
                self.on_step_delta(id, code_input.as_deref())
            }
            RunEvent::StepCompleted { id } => self.on_step_completed(id),
            RunEvent::MessageCreated { id } => self.on_message_created(id),
            RunEvent::MessageCompleted { id } => self.on_message_completed(id),
            RunEvent::RunCompleted { run_id, status } => self.on_run_completed(run_id, *status),
        }
    }
}

/// Builds a fresh sink for each run.
pub type SinkFactory = std::sync::Arc<dyn Fn() -> Box<dyn RunEventSink> + Send + Sync>;
