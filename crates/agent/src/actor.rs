//! The assistant agent — dispatch and the four message handlers.
//!
//! Each handler performs a short sequence of remote calls against the
//! vendor service. Calls are sequential; there is no local mutable state
//! shared between messages, so the only coordination is the runtime's
//! one-message-at-a-time delivery. Every remote await is raced against the
//! caller's cancellation token: cancellation aborts the pending call and
//! the handler exits without compensating for whatever the vendor already
//! committed.

use std::sync::Arc;

use async_trait::async_trait;
use attache_core::api::{
    AssistantsApi, BatchStatus, CodeInterpreterResources, FilePurpose, PageRequest, ToolResources,
};
use attache_core::error::{Error, Result};
use attache_core::event::{RunEvent, RunStatus, SinkFactory};
use attache_core::message::{
    AgentMessage, AssistantId, TextMessage, ThreadId, UploadForCodeInterpreter,
    UploadForFileSearch,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// How long to wait between vector-store indexing polls.
const BATCH_POLL_INTERVAL: std::time::Duration = std::time::Duration::from_secs(1);

/// Race a future against the cancellation token.
///
/// Surfaces `Error::Cancelled` — never a vendor value — when the token
/// fires first.
async fn cancellable<T>(
    cancel: &CancellationToken,
    fut: impl std::future::Future<Output = T>,
) -> Result<T> {
    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled),
        value = fut => Ok(value),
    }
}

/// Anything a runtime can deliver messages to.
#[async_trait]
pub trait Actor: Send + 'static {
    /// Process one message; at most one reply comes back.
    async fn handle(
        &mut self,
        message: AgentMessage,
        cancel: &CancellationToken,
    ) -> Result<Option<TextMessage>>;
}

/// An agent backed entirely by remote vendor state.
///
/// Holds only opaque back-references (assistant id, thread id); the thread
/// contents, uploaded files, and run execution all live in the vendor
/// service.
pub struct AssistantAgent {
    name: String,
    description: String,
    api: Arc<dyn AssistantsApi>,
    assistant_id: AssistantId,
    thread_id: ThreadId,
    sink_factory: SinkFactory,
}

impl AssistantAgent {
    pub fn new(
        name: impl Into<String>,
        api: Arc<dyn AssistantsApi>,
        assistant_id: AssistantId,
        thread_id: ThreadId,
        sink_factory: SinkFactory,
    ) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            api,
            assistant_id,
            thread_id,
            sink_factory,
        }
    }

    /// Set a human-readable description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Append the user's text to the thread, run the assistant with a fresh
    /// event sink, then fetch and return the newest thread message.
    pub async fn handle_text(
        &self,
        message: TextMessage,
        cancel: &CancellationToken,
    ) -> Result<TextMessage> {
        info!(agent = %self.name, thread = %self.thread_id, "Handling text message");

        cancellable(
            cancel,
            self.api
                .create_message(&self.thread_id, "user", &message.content),
        )
        .await??;

        let mut events = cancellable(
            cancel,
            self.api.stream_run(&self.thread_id, &self.assistant_id),
        )
        .await??;

        let mut sink = (self.sink_factory)();
        let mut terminal: Option<(String, RunStatus)> = None;

        loop {
            let next = cancellable(cancel, events.recv()).await?;
            let Some(item) = next else { break };
            let event = item?;
            if let RunEvent::RunCompleted { run_id, status } = &event {
                terminal = Some((run_id.clone(), *status));
            }
            sink.dispatch(&event);
        }

        if let Some((run_id, status)) = terminal {
            if status != RunStatus::Completed {
                return Err(Error::RunEnded {
                    run_id,
                    status: status.to_string(),
                });
            }
        }

        let page = cancellable(
            cancel,
            self.api.list_messages(&self.thread_id, PageRequest::newest()),
        )
        .await??;

        let newest = page.data.into_iter().next().ok_or_else(|| Error::EmptyThread {
            thread_id: self.thread_id.to_string(),
        })?;

        let content = newest
            .first_text()
            .ok_or_else(|| Error::NoTextContent {
                message_id: newest.id.clone(),
            })?
            .to_string();

        Ok(TextMessage::new(content, &self.name))
    }

    /// Delete every message on the remote thread, oldest first.
    pub async fn handle_reset(&self, cancel: &CancellationToken) -> Result<()> {
        info!(agent = %self.name, thread = %self.thread_id, "Resetting thread");

        // Collect all ids first, then delete; deleting while paging would
        // invalidate the cursor.
        let mut ids = Vec::new();
        let mut page = PageRequest::oldest_first();
        loop {
            let listing =
                cancellable(cancel, self.api.list_messages(&self.thread_id, page)).await??;
            ids.extend(listing.data.into_iter().map(|m| m.id));
            if !listing.has_more {
                break;
            }
            let Some(cursor) = listing.last_id else { break };
            page = PageRequest::oldest_first().with_after(cursor);
        }

        debug!(count = ids.len(), "Deleting thread messages");

        for id in ids {
            let status =
                cancellable(cancel, self.api.delete_message(&self.thread_id, &id)).await??;
            if !status.deleted {
                return Err(Error::DeleteRejected { message_id: id });
            }
        }

        Ok(())
    }

    /// Upload a local file and link it into the thread's code-interpreter
    /// resources.
    pub async fn handle_upload_for_code_interpreter(
        &self,
        message: UploadForCodeInterpreter,
        cancel: &CancellationToken,
    ) -> Result<()> {
        info!(agent = %self.name, path = %message.file_path.display(), "Uploading for code interpreter");

        let bytes = cancellable(cancel, tokio::fs::read(&message.file_path)).await??;
        let filename = file_name_of(&message.file_path);

        let file = cancellable(
            cancel,
            self.api
                .upload_file(&filename, bytes, FilePurpose::Assistants),
        )
        .await??;

        // Read-modify-write with no compare-and-swap; concurrent uploads to
        // the same thread can lose updates.
        let resources =
            cancellable(cancel, self.api.thread_tool_resources(&self.thread_id)).await??;

        let existing = resources
            .and_then(|r| r.code_interpreter)
            .map(|ci| ci.file_ids)
            .filter(|ids| !ids.is_empty());

        // When the thread already carries interpreter files, that list is
        // written back unchanged and the fresh upload is not linked. This
        // matches the behavior callers have always observed; appending
        // instead would be a behavior change, not a cleanup.
        let file_ids = existing.unwrap_or_else(|| vec![file.id.clone()]);

        cancellable(
            cancel,
            self.api.update_thread_tool_resources(
                &self.thread_id,
                ToolResources {
                    code_interpreter: Some(CodeInterpreterResources { file_ids }),
                    file_search: None,
                },
            ),
        )
        .await??;

        Ok(())
    }

    /// Upload a local file into a vector store and wait for indexing.
    pub async fn handle_upload_for_file_search(
        &self,
        message: UploadForFileSearch,
        cancel: &CancellationToken,
    ) -> Result<()> {
        info!(
            agent = %self.name,
            path = %message.file_path.display(),
            store = %message.vector_store_id,
            "Uploading for file search"
        );

        let bytes = cancellable(cancel, tokio::fs::read(&message.file_path)).await??;
        let filename = file_name_of(&message.file_path);

        let file = cancellable(
            cancel,
            self.api
                .upload_file(&filename, bytes, FilePurpose::Assistants),
        )
        .await??;

        let mut batch = cancellable(
            cancel,
            self.api
                .create_file_batch(&message.vector_store_id, vec![file.id]),
        )
        .await??;

        while !batch.status.is_terminal() {
            cancellable(cancel, tokio::time::sleep(BATCH_POLL_INTERVAL)).await?;
            batch = cancellable(
                cancel,
                self.api
                    .get_file_batch(&message.vector_store_id, &batch.id),
            )
            .await??;
        }

        if batch.status != BatchStatus::Completed {
            return Err(Error::IndexingFailed {
                batch_id: batch.id,
                status: batch.status.to_string(),
            });
        }

        debug!(batch = %batch.id, "Indexing complete");
        Ok(())
    }
}

#[async_trait]
impl Actor for AssistantAgent {
    async fn handle(
        &mut self,
        message: AgentMessage,
        cancel: &CancellationToken,
    ) -> Result<Option<TextMessage>> {
        match message {
            AgentMessage::Text(m) => Ok(Some(self.handle_text(m, cancel).await?)),
            AgentMessage::Reset(_) => {
                self.handle_reset(cancel).await?;
                Ok(None)
            }
            AgentMessage::UploadForCodeInterpreter(m) => {
                self.handle_upload_for_code_interpreter(m, cancel).await?;
                Ok(None)
            }
            AgentMessage::UploadForFileSearch(m) => {
                self.handle_upload_for_file_search(m, cancel).await?;
                Ok(None)
            }
        }
    }
}

fn file_name_of(path: &std::path::Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use attache_core::api::{
        DeletionStatus, FileObject, ListOrder, MessageContent, MessagePage, TextContent,
        ThreadMessage, VectorStoreFileBatch,
    };
    use attache_core::error::ApiError;
    use attache_core::event::RunEventSink;
    use attache_core::message::VectorStoreId;
    use std::io::Write as _;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn text_message(id: &str, role: &str, text: &str) -> ThreadMessage {
        ThreadMessage {
            id: id.into(),
            role: role.into(),
            content: vec![MessageContent::Text {
                text: TextContent { value: text.into() },
            }],
        }
    }

    /// A scripted vendor service holding one in-memory thread.
    struct MockApi {
        page_size: usize,
        messages: Mutex<Vec<ThreadMessage>>,
        run_reply: Mutex<Option<ThreadMessage>>,
        run_events: Mutex<Vec<RunEvent>>,
        resources: Mutex<Option<ToolResources>>,
        updated_resources: Mutex<Option<ToolResources>>,
        reject_delete: bool,
        polls_until_done: usize,
        final_batch_status: BatchStatus,
        stall_create: bool,
        list_calls: AtomicUsize,
        delete_calls: AtomicUsize,
        poll_calls: AtomicUsize,
        uploads: Mutex<Vec<String>>,
    }

    impl Default for MockApi {
        fn default() -> Self {
            Self {
                page_size: 20,
                messages: Mutex::new(Vec::new()),
                run_reply: Mutex::new(None),
                run_events: Mutex::new(Vec::new()),
                resources: Mutex::new(None),
                updated_resources: Mutex::new(None),
                reject_delete: false,
                polls_until_done: 0,
                final_batch_status: BatchStatus::Completed,
                stall_create: false,
                list_calls: AtomicUsize::new(0),
                delete_calls: AtomicUsize::new(0),
                poll_calls: AtomicUsize::new(0),
                uploads: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl AssistantsApi for MockApi {
        async fn create_message(
            &self,
            _thread_id: &ThreadId,
            role: &str,
            content: &str,
        ) -> std::result::Result<ThreadMessage, ApiError> {
            if self.stall_create {
                std::future::pending::<()>().await;
            }
            let mut messages = self.messages.lock().unwrap();
            let msg = text_message(&format!("msg_{}", messages.len() + 1), role, content);
            messages.push(msg.clone());
            Ok(msg)
        }

        async fn list_messages(
            &self,
            _thread_id: &ThreadId,
            page: PageRequest,
        ) -> std::result::Result<MessagePage, ApiError> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            let messages = self.messages.lock().unwrap();
            let ordered: Vec<ThreadMessage> = match page.order {
                ListOrder::Asc => messages.clone(),
                ListOrder::Desc => messages.iter().rev().cloned().collect(),
            };
            let start = match &page.after {
                Some(cursor) => ordered
                    .iter()
                    .position(|m| &m.id == cursor)
                    .map(|i| i + 1)
                    .unwrap_or(0),
                None => 0,
            };
            let limit = page.limit.map(|l| l as usize).unwrap_or(self.page_size);
            let total = ordered.len();
            let data: Vec<ThreadMessage> =
                ordered.into_iter().skip(start).take(limit).collect();
            let last_id = data.last().map(|m| m.id.clone());
            let has_more = start + data.len() < total;
            Ok(MessagePage {
                data,
                last_id,
                has_more,
            })
        }

        async fn delete_message(
            &self,
            _thread_id: &ThreadId,
            message_id: &str,
        ) -> std::result::Result<DeletionStatus, ApiError> {
            self.delete_calls.fetch_add(1, Ordering::SeqCst);
            if self.reject_delete {
                return Ok(DeletionStatus {
                    id: message_id.into(),
                    deleted: false,
                });
            }
            let mut messages = self.messages.lock().unwrap();
            messages.retain(|m| m.id != message_id);
            Ok(DeletionStatus {
                id: message_id.into(),
                deleted: true,
            })
        }

        async fn stream_run(
            &self,
            _thread_id: &ThreadId,
            _assistant_id: &AssistantId,
        ) -> std::result::Result<
            tokio::sync::mpsc::Receiver<std::result::Result<RunEvent, ApiError>>,
            ApiError,
        > {
            if let Some(reply) = self.run_reply.lock().unwrap().take() {
                self.messages.lock().unwrap().push(reply);
            }
            let events = self.run_events.lock().unwrap().clone();
            let (tx, rx) = tokio::sync::mpsc::channel(events.len().max(1));
            for event in events {
                tx.try_send(Ok(event)).unwrap();
            }
            Ok(rx)
        }

        async fn upload_file(
            &self,
            filename: &str,
            _bytes: Vec<u8>,
            _purpose: FilePurpose,
        ) -> std::result::Result<FileObject, ApiError> {
            self.uploads.lock().unwrap().push(filename.to_string());
            Ok(FileObject {
                id: "file_new".into(),
                filename: filename.into(),
                bytes: 0,
            })
        }

        async fn thread_tool_resources(
            &self,
            _thread_id: &ThreadId,
        ) -> std::result::Result<Option<ToolResources>, ApiError> {
            Ok(self.resources.lock().unwrap().clone())
        }

        async fn update_thread_tool_resources(
            &self,
            _thread_id: &ThreadId,
            resources: ToolResources,
        ) -> std::result::Result<(), ApiError> {
            *self.updated_resources.lock().unwrap() = Some(resources);
            Ok(())
        }

        async fn create_file_batch(
            &self,
            _store_id: &VectorStoreId,
            _file_ids: Vec<String>,
        ) -> std::result::Result<VectorStoreFileBatch, ApiError> {
            Ok(VectorStoreFileBatch {
                id: "batch_1".into(),
                status: if self.polls_until_done == 0 {
                    self.final_batch_status
                } else {
                    BatchStatus::InProgress
                },
            })
        }

        async fn get_file_batch(
            &self,
            _store_id: &VectorStoreId,
            batch_id: &str,
        ) -> std::result::Result<VectorStoreFileBatch, ApiError> {
            let polls = self.poll_calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(VectorStoreFileBatch {
                id: batch_id.into(),
                status: if polls >= self.polls_until_done {
                    self.final_batch_status
                } else {
                    BatchStatus::InProgress
                },
            })
        }
    }

    /// Collects text deltas so tests can assert the sink saw the stream.
    #[derive(Default)]
    struct RecordingSink {
        text: Arc<Mutex<String>>,
    }

    impl RunEventSink for RecordingSink {
        fn on_text_delta(&mut self, value: &str) {
            self.text.lock().unwrap().push_str(value);
        }
    }

    fn noop_sinks() -> SinkFactory {
        Arc::new(|| Box::new(crate::sink::ConsoleSink::new()) as Box<dyn RunEventSink>)
    }

    fn agent(api: Arc<MockApi>, sinks: SinkFactory) -> AssistantAgent {
        AssistantAgent::new(
            "assistant",
            api,
            AssistantId::from("asst_1"),
            ThreadId::from("thread_1"),
            sinks,
        )
        .with_description("test agent")
    }

    fn temp_file(contents: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents).unwrap();
        file
    }

    #[tokio::test]
    async fn text_reply_carries_agent_name_as_source() {
        let api = Arc::new(MockApi::default());
        *api.run_reply.lock().unwrap() =
            Some(text_message("msg_reply", "assistant", "The answer is 4."));
        *api.run_events.lock().unwrap() = vec![
            RunEvent::TextDelta {
                value: "The answer ".into(),
            },
            RunEvent::TextDelta {
                value: "is 4.".into(),
            },
            RunEvent::RunCompleted {
                run_id: "run_1".into(),
                status: RunStatus::Completed,
            },
        ];

        let seen = Arc::new(Mutex::new(String::new()));
        let sink_text = seen.clone();
        let sinks: SinkFactory = Arc::new(move || {
            Box::new(RecordingSink {
                text: sink_text.clone(),
            }) as Box<dyn RunEventSink>
        });

        let agent = agent(api, sinks);
        let reply = agent
            .handle_text(
                TextMessage::new("What is 2 + 2?", "user"),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(reply.source, "assistant");
        assert_eq!(reply.content, "The answer is 4.");
        assert_eq!(*seen.lock().unwrap(), "The answer is 4.");
    }

    #[tokio::test]
    async fn text_reply_without_text_part_fails() {
        let api = Arc::new(MockApi::default());
        *api.run_reply.lock().unwrap() = Some(ThreadMessage {
            id: "msg_img".into(),
            role: "assistant".into(),
            content: vec![MessageContent::ImageFile {
                image_file: attache_core::api::ImageFileContent {
                    file_id: "file_1".into(),
                },
            }],
        });
        *api.run_events.lock().unwrap() = vec![RunEvent::RunCompleted {
            run_id: "run_1".into(),
            status: RunStatus::Completed,
        }];

        let agent = agent(api, noop_sinks());
        let err = agent
            .handle_text(TextMessage::new("hi", "user"), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::NoTextContent { message_id } if message_id == "msg_img"));
    }

    #[tokio::test]
    async fn failed_run_is_an_error() {
        let api = Arc::new(MockApi::default());
        *api.run_events.lock().unwrap() = vec![RunEvent::RunCompleted {
            run_id: "run_1".into(),
            status: RunStatus::Failed,
        }];

        let agent = agent(api, noop_sinks());
        let err = agent
            .handle_text(TextMessage::new("hi", "user"), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::RunEnded { status, .. } if status == "failed"));
    }

    #[tokio::test]
    async fn reset_pages_and_deletes_everything() {
        let api = Arc::new(MockApi {
            page_size: 2,
            ..Default::default()
        });
        for i in 1..=5 {
            api.messages
                .lock()
                .unwrap()
                .push(text_message(&format!("msg_{i}"), "user", "x"));
        }

        let agent = agent(api.clone(), noop_sinks());
        agent.handle_reset(&CancellationToken::new()).await.unwrap();

        // 5 messages at page size 2: ceil(5/2) = 3 list calls, 5 deletes
        assert_eq!(api.list_calls.load(Ordering::SeqCst), 3);
        assert_eq!(api.delete_calls.load(Ordering::SeqCst), 5);
        assert!(api.messages.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn reset_aborts_when_vendor_rejects_delete() {
        let api = Arc::new(MockApi {
            reject_delete: true,
            ..Default::default()
        });
        api.messages
            .lock()
            .unwrap()
            .push(text_message("msg_1", "user", "x"));

        let agent = agent(api, noop_sinks());
        let err = agent
            .handle_reset(&CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::DeleteRejected { message_id } if message_id == "msg_1"));
    }

    #[tokio::test]
    async fn upload_links_new_file_when_thread_has_none() {
        let api = Arc::new(MockApi::default());
        let file = temp_file(b"print(2 + 2)\n");

        let agent = agent(api.clone(), noop_sinks());
        agent
            .handle_upload_for_code_interpreter(
                UploadForCodeInterpreter {
                    file_path: file.path().to_path_buf(),
                },
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        let updated = api.updated_resources.lock().unwrap().clone().unwrap();
        assert_eq!(
            updated.code_interpreter.unwrap().file_ids,
            vec!["file_new".to_string()]
        );
        assert_eq!(api.uploads.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn upload_keeps_existing_file_ids_unchanged() {
        let api = Arc::new(MockApi::default());
        *api.resources.lock().unwrap() = Some(ToolResources {
            code_interpreter: Some(CodeInterpreterResources {
                file_ids: vec!["file_a".into(), "file_b".into()],
            }),
            file_search: None,
        });
        let file = temp_file(b"data");

        let agent = agent(api.clone(), noop_sinks());
        agent
            .handle_upload_for_code_interpreter(
                UploadForCodeInterpreter {
                    file_path: file.path().to_path_buf(),
                },
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        // Existing list wins; the fresh upload's id is not appended
        let updated = api.updated_resources.lock().unwrap().clone().unwrap();
        assert_eq!(
            updated.code_interpreter.unwrap().file_ids,
            vec!["file_a".to_string(), "file_b".to_string()]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn file_search_upload_waits_for_indexing() {
        let api = Arc::new(MockApi {
            polls_until_done: 3,
            ..Default::default()
        });
        let file = temp_file(b"searchable text");

        let agent = agent(api.clone(), noop_sinks());
        agent
            .handle_upload_for_file_search(
                UploadForFileSearch {
                    file_path: file.path().to_path_buf(),
                    vector_store_id: VectorStoreId::from("vs_1"),
                },
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(api.poll_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn file_search_upload_fails_on_failed_batch() {
        let api = Arc::new(MockApi {
            polls_until_done: 1,
            final_batch_status: BatchStatus::Failed,
            ..Default::default()
        });
        let file = temp_file(b"data");

        let agent = agent(api, noop_sinks());
        let err = agent
            .handle_upload_for_file_search(
                UploadForFileSearch {
                    file_path: file.path().to_path_buf(),
                    vector_store_id: VectorStoreId::from("vs_1"),
                },
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, Error::IndexingFailed { status, .. } if status == "failed"));
    }

    #[tokio::test]
    async fn dispatch_routes_by_message_shape() {
        let api = Arc::new(MockApi::default());
        *api.run_reply.lock().unwrap() =
            Some(text_message("msg_reply", "assistant", "hello back"));
        *api.run_events.lock().unwrap() = vec![RunEvent::RunCompleted {
            run_id: "run_1".into(),
            status: RunStatus::Completed,
        }];

        let mut agent = agent(api.clone(), noop_sinks());
        let cancel = CancellationToken::new();

        let reply = agent
            .handle(TextMessage::new("hello", "user").into(), &cancel)
            .await
            .unwrap();
        assert_eq!(reply.unwrap().content, "hello back");

        // Reset produces no reply
        let reply = agent
            .handle(attache_core::message::Reset.into(), &cancel)
            .await
            .unwrap();
        assert!(reply.is_none());
        assert!(api.messages.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn pre_cancelled_token_short_circuits() {
        let api = Arc::new(MockApi::default());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let agent = agent(api.clone(), noop_sinks());
        let err = agent.handle_reset(&cancel).await.unwrap_err();

        assert!(matches!(err, Error::Cancelled));
        assert_eq!(api.list_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_mid_call_surfaces_cancelled() {
        let api = Arc::new(MockApi {
            stall_create: true,
            ..Default::default()
        });
        let cancel = CancellationToken::new();

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            canceller.cancel();
        });

        let agent = agent(api, noop_sinks());
        let err = agent
            .handle_text(TextMessage::new("hi", "user"), &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Cancelled));
    }
}
