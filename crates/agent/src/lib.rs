//! # Attaché Agent
//!
//! The actor that fronts a hosted assistant: four inbound message shapes,
//! a handful of sequential vendor calls per message, streamed run events
//! fed to a display sink, and uniform cancellation across every handler.
//!
//! Pair it with `attache_client::AssistantsClient` for the real vendor
//! surface, or any other `AssistantsApi` implementation.

pub mod actor;
pub mod runtime;
pub mod sink;

pub use actor::{Actor, AssistantAgent};
pub use runtime::{ActorRuntime, AgentHandle, AgentKey};
pub use sink::ConsoleSink;
