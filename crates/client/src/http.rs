//! HTTP implementation of the vendor assistant-platform API.
//!
//! Talks to an OpenAI-Assistants-v2-shaped surface:
//! - Thread messages: create / list (cursor paging) / delete
//! - Runs: create with SSE streaming
//! - Files: multipart upload
//! - Threads: tool-resource read / update
//! - Vector stores: file batch create / poll

use async_trait::async_trait;
use attache_core::api::*;
use attache_core::error::ApiError;
use attache_core::event::RunEvent;
use attache_core::message::{AssistantId, ThreadId, VectorStoreId};
use futures::StreamExt;
use serde::Deserialize;
use tracing::{debug, trace, warn};

use crate::sse::map_event;

/// The hosted assistant service, over HTTP.
pub struct AssistantsClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl AssistantsClient {
    /// Create a client against an arbitrary base URL.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        }
    }

    /// Create a client against the OpenAI platform (convenience constructor).
    pub fn openai(api_key: impl Into<String>) -> Self {
        Self::new("https://api.openai.com/v1", api_key)
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("OpenAI-Beta", "assistants=v2")
    }

    async fn send(builder: reqwest::RequestBuilder) -> Result<reqwest::Response, ApiError> {
        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                ApiError::Timeout(e.to_string())
            } else {
                ApiError::Network(e.to_string())
            }
        })?;
        Self::ensure_ok(response).await
    }

    async fn ensure_ok(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status().as_u16();

        if status == 429 {
            return Err(ApiError::RateLimited {
                retry_after_secs: 5,
            });
        }

        if status == 401 || status == 403 {
            return Err(ApiError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ));
        }

        if !(200..300).contains(&status) {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Vendor returned error");
            return Err(ApiError::Api {
                status_code: status,
                message: error_body,
            });
        }

        Ok(response)
    }

    async fn parse<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        response.json().await.map_err(|e| ApiError::Api {
            status_code: 200,
            message: format!("Failed to parse response: {e}"),
        })
    }
}

#[async_trait]
impl AssistantsApi for AssistantsClient {
    async fn create_message(
        &self,
        thread_id: &ThreadId,
        role: &str,
        content: &str,
    ) -> Result<ThreadMessage, ApiError> {
        debug!(thread = %thread_id, role, "Creating thread message");

        let body = serde_json::json!({ "role": role, "content": content });
        let response = Self::send(
            self.request(reqwest::Method::POST, &format!("/threads/{thread_id}/messages"))
                .json(&body),
        )
        .await?;

        Self::parse(response).await
    }

    async fn list_messages(
        &self,
        thread_id: &ThreadId,
        page: PageRequest,
    ) -> Result<MessagePage, ApiError> {
        let mut query: Vec<(&str, String)> = vec![("order", page.order.as_str().to_string())];
        if let Some(after) = &page.after {
            query.push(("after", after.clone()));
        }
        if let Some(limit) = page.limit {
            query.push(("limit", limit.to_string()));
        }

        let response = Self::send(
            self.request(reqwest::Method::GET, &format!("/threads/{thread_id}/messages"))
                .query(&query),
        )
        .await?;

        Self::parse(response).await
    }

    async fn delete_message(
        &self,
        thread_id: &ThreadId,
        message_id: &str,
    ) -> Result<DeletionStatus, ApiError> {
        debug!(thread = %thread_id, message = %message_id, "Deleting thread message");

        let response = Self::send(self.request(
            reqwest::Method::DELETE,
            &format!("/threads/{thread_id}/messages/{message_id}"),
        ))
        .await?;

        Self::parse(response).await
    }

    async fn stream_run(
        &self,
        thread_id: &ThreadId,
        assistant_id: &AssistantId,
    ) -> Result<
        tokio::sync::mpsc::Receiver<Result<RunEvent, ApiError>>,
        ApiError,
    > {
        debug!(thread = %thread_id, assistant = %assistant_id, "Starting streaming run");

        let body = serde_json::json!({
            "assistant_id": assistant_id.0,
            "stream": true,
        });

        let response = Self::send(
            self.request(reqwest::Method::POST, &format!("/threads/{thread_id}/runs"))
                .header("Accept", "text/event-stream")
                .json(&body),
        )
        .await?;

        let (tx, rx) = tokio::sync::mpsc::channel(64);

        // Read the SSE byte stream and forward mapped events
        tokio::spawn(async move {
            let mut byte_stream = response.bytes_stream();
            let mut buffer = String::new();
            let mut event_name: Option<String> = None;

            while let Some(chunk_result) = byte_stream.next().await {
                let bytes = match chunk_result {
                    Ok(b) => b,
                    Err(e) => {
                        let _ = tx
                            .send(Err(ApiError::StreamInterrupted(e.to_string())))
                            .await;
                        return;
                    }
                };

                buffer.push_str(&String::from_utf8_lossy(&bytes));

                // Process complete lines
                while let Some(line_end) = buffer.find('\n') {
                    let line = buffer[..line_end].trim_end_matches('\r').to_string();
                    buffer = buffer[line_end + 1..].to_string();

                    // Blank lines separate SSE records; comments start with ':'
                    if line.is_empty() || line.starts_with(':') {
                        continue;
                    }

                    if let Some(name) = line.strip_prefix("event: ") {
                        event_name = Some(name.trim().to_string());
                        continue;
                    }

                    if let Some(data) = line.strip_prefix("data: ") {
                        let data = data.trim();

                        if data == "[DONE]" {
                            return;
                        }

                        let Some(name) = event_name.take() else {
                            trace!(data = %data, "Data line without event name, skipping");
                            continue;
                        };

                        match map_event(&name, data) {
                            Ok(Some(event)) => {
                                if tx.send(Ok(event)).await.is_err() {
                                    return; // receiver dropped
                                }
                            }
                            Ok(None) => {}
                            Err(e) => {
                                trace!(
                                    event = %name,
                                    data = %data,
                                    error = %e,
                                    "Ignoring unparseable SSE chunk"
                                );
                            }
                        }
                    }
                }
            }
        });

        Ok(rx)
    }

    async fn upload_file(
        &self,
        filename: &str,
        bytes: Vec<u8>,
        purpose: FilePurpose,
    ) -> Result<FileObject, ApiError> {
        debug!(filename, size = bytes.len(), purpose = purpose.as_str(), "Uploading file");

        let part = reqwest::multipart::Part::bytes(bytes).file_name(filename.to_string());
        let form = reqwest::multipart::Form::new()
            .text("purpose", purpose.as_str())
            .part("file", part);

        let response = Self::send(
            self.request(reqwest::Method::POST, "/files")
                .multipart(form),
        )
        .await?;

        Self::parse(response).await
    }

    async fn thread_tool_resources(
        &self,
        thread_id: &ThreadId,
    ) -> Result<Option<ToolResources>, ApiError> {
        let response =
            Self::send(self.request(reqwest::Method::GET, &format!("/threads/{thread_id}")))
                .await?;

        let thread: ThreadPayload = Self::parse(response).await?;
        Ok(thread.tool_resources)
    }

    async fn update_thread_tool_resources(
        &self,
        thread_id: &ThreadId,
        resources: ToolResources,
    ) -> Result<(), ApiError> {
        debug!(thread = %thread_id, "Updating thread tool resources");

        let body = serde_json::json!({ "tool_resources": resources });
        Self::send(
            self.request(reqwest::Method::POST, &format!("/threads/{thread_id}"))
                .json(&body),
        )
        .await?;

        Ok(())
    }

    async fn create_file_batch(
        &self,
        store_id: &VectorStoreId,
        file_ids: Vec<String>,
    ) -> Result<VectorStoreFileBatch, ApiError> {
        debug!(store = %store_id, files = file_ids.len(), "Creating vector store file batch");

        let body = serde_json::json!({ "file_ids": file_ids });
        let response = Self::send(
            self.request(
                reqwest::Method::POST,
                &format!("/vector_stores/{store_id}/file_batches"),
            )
            .json(&body),
        )
        .await?;

        Self::parse(response).await
    }

    async fn get_file_batch(
        &self,
        store_id: &VectorStoreId,
        batch_id: &str,
    ) -> Result<VectorStoreFileBatch, ApiError> {
        let response = Self::send(self.request(
            reqwest::Method::GET,
            &format!("/vector_stores/{store_id}/file_batches/{batch_id}"),
        ))
        .await?;

        Self::parse(response).await
    }
}

#[derive(Debug, Deserialize)]
struct ThreadPayload {
    #[serde(default)]
    tool_resources: Option<ToolResources>,
}
