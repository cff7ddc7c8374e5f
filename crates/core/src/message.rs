//! Inbound message shapes and remote-state identifiers.
//!
//! These are the value objects a runtime delivers to an agent:
//! User intent arrives as one of four shapes → Agent dispatches on the shape →
//! at most one reply comes back. All four are immutable, built by the caller,
//! consumed once.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Opaque back-reference to a thread owned by the vendor service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ThreadId(pub String);

impl ThreadId {
    pub fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for ThreadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque back-reference to a remote assistant definition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssistantId(pub String);

impl AssistantId {
    pub fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for AssistantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque back-reference to a remote vector store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VectorStoreId(pub String);

impl VectorStoreId {
    pub fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for VectorStoreId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A chat turn: text plus the identifier of whoever produced it.
///
/// Replies from the agent always carry the agent's own name as `source`,
/// never the caller's.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextMessage {
    /// The text content
    pub content: String,

    /// Who produced this message (agent name or caller identifier)
    pub source: String,
}

impl TextMessage {
    pub fn new(content: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            source: source.into(),
        }
    }
}

/// Marker: wipe the remote conversation thread.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reset;

/// Upload a local file and attach it to the thread's code-interpreter
/// tool resources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadForCodeInterpreter {
    /// Path to a local file, read fully in binary mode before upload
    pub file_path: PathBuf,
}

/// Upload a local file into a named remote vector store for file search,
/// waiting for indexing to finish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadForFileSearch {
    /// Path to a local file, read fully in binary mode before upload
    pub file_path: PathBuf,

    /// The vector store the file is indexed into
    pub vector_store_id: VectorStoreId,
}

/// Everything an agent can receive, dispatched by shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentMessage {
    Text(TextMessage),
    Reset(Reset),
    UploadForCodeInterpreter(UploadForCodeInterpreter),
    UploadForFileSearch(UploadForFileSearch),
}

impl From<TextMessage> for AgentMessage {
    fn from(m: TextMessage) -> Self {
        Self::Text(m)
    }
}

impl From<Reset> for AgentMessage {
    fn from(m: Reset) -> Self {
        Self::Reset(m)
    }
}

impl From<UploadForCodeInterpreter> for AgentMessage {
    fn from(m: UploadForCodeInterpreter) -> Self {
        Self::UploadForCodeInterpreter(m)
    }
}

impl From<UploadForFileSearch> for AgentMessage {
    fn from(m: UploadForFileSearch) -> Self {
        Self::UploadForFileSearch(m)
    }
}
