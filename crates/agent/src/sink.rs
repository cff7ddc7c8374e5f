//! Console display sink for streamed run events.

use std::io::Write;

use attache_core::event::{RunEventSink, RunStatus};

/// Prints run events as they arrive. Display only; nothing here feeds back
/// into the agent.
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl ConsoleSink {
    pub fn new() -> Self {
        Self
    }
}

impl RunEventSink for ConsoleSink {
    fn on_text_delta(&mut self, value: &str) {
        print!("{value}");
        let _ = std::io::stdout().flush();
    }

    fn on_step_created(&mut self, id: &str, step_type: &str) {
        println!("\n[step {id} started: {step_type}]");
    }

    fn on_step_delta(&mut self, _id: &str, code_input: Option<&str>) {
        if let Some(code) = code_input {
            print!("{code}");
            let _ = std::io::stdout().flush();
        }
    }

    fn on_step_completed(&mut self, id: &str) {
        println!("\n[step {id} completed]");
    }

    fn on_message_created(&mut self, id: &str) {
        println!("\n[message {id} created]");
    }

    fn on_message_completed(&mut self, id: &str) {
        println!("\n[message {id} completed]");
    }

    fn on_run_completed(&mut self, run_id: &str, status: RunStatus) {
        println!("\n[run {run_id} {status}]");
    }
}
