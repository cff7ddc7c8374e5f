//! Mapping of named vendor SSE events to `RunEvent`.
//!
//! The run stream interleaves `event: <name>` / `data: <json>` line pairs.
//! Only the event names the sink displays are mapped; everything else
//! (run.queued, step details we don't render) is skipped by the caller.

use attache_core::event::{RunEvent, RunStatus};
use serde::Deserialize;

/// Map one named SSE event to a local `RunEvent`.
///
/// Returns `Ok(None)` for event names we deliberately ignore. A parse
/// failure on a mapped name is an error so the stream reader can log it.
pub(crate) fn map_event(
    name: &str,
    data: &str,
) -> std::result::Result<Option<RunEvent>, serde_json::Error> {
    let event = match name {
        "thread.message.delta" => {
            let payload: MessageDeltaPayload = serde_json::from_str(data)?;
            let mut value = String::new();
            for part in payload.delta.content {
                if part.kind == "text" {
                    if let Some(text) = part.text {
                        if let Some(v) = text.value {
                            value.push_str(&v);
                        }
                    }
                }
            }
            if value.is_empty() {
                return Ok(None);
            }
            Some(RunEvent::TextDelta { value })
        }
        "thread.message.created" => {
            let payload: ObjectPayload = serde_json::from_str(data)?;
            Some(RunEvent::MessageCreated { id: payload.id })
        }
        "thread.message.completed" => {
            let payload: ObjectPayload = serde_json::from_str(data)?;
            Some(RunEvent::MessageCompleted { id: payload.id })
        }
        "thread.run.step.created" => {
            let payload: StepPayload = serde_json::from_str(data)?;
            Some(RunEvent::StepCreated {
                id: payload.id,
                step_type: payload.kind.unwrap_or_default(),
            })
        }
        "thread.run.step.delta" => {
            let payload: StepDeltaPayload = serde_json::from_str(data)?;
            let code_input = payload.delta.step_details.and_then(|details| {
                details.tool_calls.into_iter().find_map(|tc| {
                    tc.code_interpreter.and_then(|ci| ci.input)
                })
            });
            Some(RunEvent::StepDelta {
                id: payload.id,
                code_input,
            })
        }
        "thread.run.step.completed" => {
            let payload: ObjectPayload = serde_json::from_str(data)?;
            Some(RunEvent::StepCompleted { id: payload.id })
        }
        "thread.run.completed" => run_terminal(data, RunStatus::Completed)?,
        "thread.run.failed" => run_terminal(data, RunStatus::Failed)?,
        "thread.run.cancelled" => run_terminal(data, RunStatus::Cancelled)?,
        "thread.run.expired" => run_terminal(data, RunStatus::Expired)?,
        _ => None,
    };
    Ok(event)
}

fn run_terminal(
    data: &str,
    status: RunStatus,
) -> std::result::Result<Option<RunEvent>, serde_json::Error> {
    let payload: ObjectPayload = serde_json::from_str(data)?;
    Ok(Some(RunEvent::RunCompleted {
        run_id: payload.id,
        status,
    }))
}

// --- SSE payload shapes (internal) ---

#[derive(Debug, Deserialize)]
struct ObjectPayload {
    id: String,
}

#[derive(Debug, Deserialize)]
struct MessageDeltaPayload {
    delta: MessageDelta,
}

#[derive(Debug, Deserialize)]
struct MessageDelta {
    #[serde(default)]
    content: Vec<DeltaContent>,
}

#[derive(Debug, Deserialize)]
struct DeltaContent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<DeltaText>,
}

#[derive(Debug, Deserialize)]
struct DeltaText {
    #[serde(default)]
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StepPayload {
    id: String,
    #[serde(rename = "type", default)]
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StepDeltaPayload {
    id: String,
    delta: StepDelta,
}

#[derive(Debug, Deserialize)]
struct StepDelta {
    #[serde(default)]
    step_details: Option<StepDetails>,
}

#[derive(Debug, Deserialize)]
struct StepDetails {
    #[serde(default)]
    tool_calls: Vec<ToolCallDetail>,
}

#[derive(Debug, Deserialize)]
struct ToolCallDetail {
    #[serde(default)]
    code_interpreter: Option<CodeInterpreterDetail>,
}

#[derive(Debug, Deserialize)]
struct CodeInterpreterDetail {
    #[serde(default)]
    input: Option<String>,
}
