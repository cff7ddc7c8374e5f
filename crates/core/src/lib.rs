//! # Attaché Core
//!
//! Domain types, the vendor-API trait, and error definitions for the
//! Attaché assistant wrapper. This crate defines the model the other
//! crates implement against: the HTTP client in `attache-client`, the
//! actor in `attache-agent`.
//!
//! All durable state (threads, messages, files, vector stores, runs)
//! lives in the remote vendor service; the types here are either inbound
//! message shapes or opaque back-references to that remote state.

pub mod api;
pub mod error;
pub mod event;
pub mod message;

// Re-export key types at crate root for ergonomics
pub use api::{
    AssistantsApi, BatchStatus, DeletionStatus, FileObject, FilePurpose, ListOrder, MessageContent,
    MessagePage, PageRequest, ThreadMessage, ToolResources, VectorStoreFileBatch,
};
pub use error::{ApiError, Error, Result};
pub use event::{RunEvent, RunEventSink, RunStatus, SinkFactory};
pub use message::{
    AgentMessage, AssistantId, Reset, TextMessage, ThreadId, UploadForCodeInterpreter,
    UploadForFileSearch, VectorStoreId,
};
