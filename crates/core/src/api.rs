//! The vendor-API trait — the abstraction over the hosted assistant service.
//!
//! The agent calls these operations without knowing whether it is talking
//! to the real HTTP surface or a test double. The reqwest implementation
//! lives in `attache-client`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::event::RunEvent;
use crate::message::{AssistantId, ThreadId, VectorStoreId};

/// Sort order for paged listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListOrder {
    /// Oldest first
    Asc,
    /// Newest first
    Desc,
}

impl ListOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// One page request in a cursor-based listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageRequest {
    pub order: ListOrder,

    /// Cursor: the id of the last item on the previous page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl PageRequest {
    /// First page, oldest first.
    pub fn oldest_first() -> Self {
        Self {
            order: ListOrder::Asc,
            after: None,
            limit: None,
        }
    }

    /// Single newest item.
    pub fn newest() -> Self {
        Self {
            order: ListOrder::Desc,
            after: None,
            limit: Some(1),
        }
    }

    pub fn with_after(mut self, after: impl Into<String>) -> Self {
        self.after = Some(after.into());
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// One content part inside a thread message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContent {
    Text { text: TextContent },
    ImageFile { image_file: ImageFileContent },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextContent {
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageFileContent {
    pub file_id: String,
}

/// A message stored on a remote thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadMessage {
    pub id: String,
    pub role: String,
    pub content: Vec<MessageContent>,
}

impl ThreadMessage {
    /// The first text-typed content part, if any.
    pub fn first_text(&self) -> Option<&str> {
        self.content.iter().find_map(|part| match part {
            MessageContent::Text { text } => Some(text.value.as_str()),
            MessageContent::ImageFile { .. } => None,
        })
    }
}

/// One page of thread messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagePage {
    pub data: Vec<ThreadMessage>,

    /// Cursor for the next page
    #[serde(default)]
    pub last_id: Option<String>,

    /// Whether another page exists
    #[serde(default)]
    pub has_more: bool,
}

/// Vendor acknowledgement of a deletion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletionStatus {
    pub id: String,
    pub deleted: bool,
}

/// A file stored in the vendor file store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileObject {
    pub id: String,
    pub filename: String,
    #[serde(default)]
    pub bytes: u64,
}

/// Why a file is being uploaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilePurpose {
    Assistants,
}

impl FilePurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Assistants => "assistants",
        }
    }
}

/// Tool resources attached to a thread.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResources {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_interpreter: Option<CodeInterpreterResources>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_search: Option<FileSearchResources>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeInterpreterResources {
    #[serde(default)]
    pub file_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSearchResources {
    #[serde(default)]
    pub vector_store_ids: Vec<String>,
}

/// Indexing state of a vector-store file batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    InProgress,
    Completed,
    Failed,
    Cancelled,
}

impl BatchStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::InProgress)
    }
}

impl std::fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

/// A batch of files being indexed into a vector store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorStoreFileBatch {
    pub id: String,
    pub status: BatchStatus,
}

/// The vendor assistant-platform surface the agent depends on.
///
/// One method per remote operation the handlers need. Implementations:
/// the HTTP client in `attache-client`, mocks in tests.
#[async_trait]
pub trait AssistantsApi: Send + Sync {
    /// Append a message to a thread.
    async fn create_message(
        &self,
        thread_id: &ThreadId,
        role: &str,
        content: &str,
    ) -> std::result::Result<ThreadMessage, ApiError>;

    /// List one page of thread messages.
    async fn list_messages(
        &self,
        thread_id: &ThreadId,
        page: PageRequest,
    ) -> std::result::Result<MessagePage, ApiError>;

    /// Delete a thread message by id.
    async fn delete_message(
        &self,
        thread_id: &ThreadId,
        message_id: &str,
    ) -> std::result::Result<DeletionStatus, ApiError>;

    /// Start a streaming run and return its event channel.
    ///
    /// The channel closes when the vendor ends the stream; a terminal
    /// `RunEvent::RunCompleted` arrives before closure on a clean end.
    async fn stream_run(
        &self,
        thread_id: &ThreadId,
        assistant_id: &AssistantId,
    ) -> std::result::Result<
        tokio::sync::mpsc::Receiver<std::result::Result<RunEvent, ApiError>>,
        ApiError,
    >;

    /// Upload a fully-buffered file to the vendor file store.
    async fn upload_file(
        &self,
        filename: &str,
        bytes: Vec<u8>,
        purpose: FilePurpose,
    ) -> std::result::Result<FileObject, ApiError>;

    /// Read a thread's current tool resources.
    async fn thread_tool_resources(
        &self,
        thread_id: &ThreadId,
    ) -> std::result::Result<Option<ToolResources>, ApiError>;

    /// Replace a thread's tool resources.
    async fn update_thread_tool_resources(
        &self,
        thread_id: &ThreadId,
        resources: ToolResources,
    ) -> std::result::Result<(), ApiError>;

    /// Start indexing uploaded files into a vector store.
    async fn create_file_batch(
        &self,
        store_id: &VectorStoreId,
        file_ids: Vec<String>,
    ) -> std::result::Result<VectorStoreFileBatch, ApiError>;

    /// Poll the indexing state of a file batch.
    async fn get_file_batch(
        &self,
        store_id: &VectorStoreId,
        batch_id: &str,
    ) -> std::result::Result<VectorStoreFileBatch, ApiError>;
}
