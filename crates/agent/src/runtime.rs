//! Minimal in-process runtime: registers actors by (name, key) and
//! serializes message delivery per actor.
//!
//! Each registered actor owns a mailbox task; the single consumer loop is
//! what guarantees one-message-at-a-time processing. Replies travel back
//! over a oneshot channel.

use std::collections::HashMap;
use std::sync::Mutex;

use attache_core::error::{Error, Result};
use attache_core::message::{AgentMessage, TextMessage};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::actor::Actor;

/// Address of a registered agent instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AgentKey {
    pub name: String,
    pub key: String,
}

impl AgentKey {
    pub fn new(name: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key: key.into(),
        }
    }

    /// The conventional single-instance key.
    pub fn default_instance(name: impl Into<String>) -> Self {
        Self::new(name, "default")
    }
}

impl std::fmt::Display for AgentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.name, self.key)
    }
}

struct Envelope {
    message: AgentMessage,
    cancel: CancellationToken,
    reply: oneshot::Sender<Result<Option<TextMessage>>>,
}

/// A handle for delivering messages to one registered actor.
#[derive(Clone)]
pub struct AgentHandle {
    tx: mpsc::Sender<Envelope>,
}

impl AgentHandle {
    /// Deliver one message and await the actor's reply.
    pub async fn send(
        &self,
        message: impl Into<AgentMessage>,
        cancel: CancellationToken,
    ) -> Result<Option<TextMessage>> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let envelope = Envelope {
            message: message.into(),
            cancel,
            reply: reply_tx,
        };
        self.tx
            .send(envelope)
            .await
            .map_err(|_| Error::MailboxClosed)?;
        reply_rx.await.map_err(|_| Error::MailboxClosed)?
    }
}

/// Registry of running actors.
#[derive(Default)]
pub struct ActorRuntime {
    agents: Mutex<HashMap<AgentKey, AgentHandle>>,
}

impl ActorRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an actor and spawn its mailbox task.
    pub fn register(&self, key: AgentKey, mut actor: impl Actor) -> AgentHandle {
        let (tx, mut rx) = mpsc::channel::<Envelope>(16);

        tokio::spawn(async move {
            // Single consumer: messages to this actor are processed strictly
            // one at a time.
            while let Some(envelope) = rx.recv().await {
                let result = actor.handle(envelope.message, &envelope.cancel).await;
                let _ = envelope.reply.send(result);
            }
        });

        info!(agent = %key, "Registered agent");

        let handle = AgentHandle { tx };
        self.agents
            .lock()
            .expect("agent registry poisoned")
            .insert(key, handle.clone());
        handle
    }

    /// Look up a registered actor's handle.
    pub fn handle(&self, key: &AgentKey) -> Option<AgentHandle> {
        self.agents
            .lock()
            .expect("agent registry poisoned")
            .get(key)
            .cloned()
    }

    /// Deliver one message to the actor registered under `key`.
    pub async fn send(
        &self,
        key: &AgentKey,
        message: impl Into<AgentMessage>,
        cancel: CancellationToken,
    ) -> Result<Option<TextMessage>> {
        let handle = self.handle(key).ok_or_else(|| Error::UnknownAgent {
            name: key.name.clone(),
            key: key.key.clone(),
        })?;
        handle.send(message, cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    /// Echoes text messages back with its own name as source.
    struct EchoActor {
        name: String,
    }

    #[async_trait]
    impl Actor for EchoActor {
        async fn handle(
            &mut self,
            message: AgentMessage,
            _cancel: &CancellationToken,
        ) -> Result<Option<TextMessage>> {
            match message {
                AgentMessage::Text(m) => {
                    Ok(Some(TextMessage::new(m.content, self.name.clone())))
                }
                _ => Ok(None),
            }
        }
    }

    #[tokio::test]
    async fn send_reaches_registered_actor() {
        let runtime = ActorRuntime::new();
        let key = AgentKey::default_instance("echo");
        runtime.register(key.clone(), EchoActor { name: "echo".into() });

        let reply = runtime
            .send(&key, TextMessage::new("hi", "user"), CancellationToken::new())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(reply.content, "hi");
        assert_eq!(reply.source, "echo");
    }

    #[tokio::test]
    async fn unknown_agent_is_an_error() {
        let runtime = ActorRuntime::new();
        let key = AgentKey::new("ghost", "default");

        let err = runtime
            .send(&key, attache_core::message::Reset, CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::UnknownAgent { .. }));
    }

    #[tokio::test]
    async fn delivery_is_serialized_per_actor() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        struct SlowActor {
            in_flight: Arc<AtomicUsize>,
            max_seen: Arc<AtomicUsize>,
        }

        #[async_trait]
        impl Actor for SlowActor {
            async fn handle(
                &mut self,
                _message: AgentMessage,
                _cancel: &CancellationToken,
            ) -> Result<Option<TextMessage>> {
                let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                self.max_seen.fetch_max(now, Ordering::SeqCst);
                tokio::task::yield_now().await;
                self.in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok(None)
            }
        }

        let in_flight = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let runtime = ActorRuntime::new();
        let key = AgentKey::default_instance("slow");
        let handle = runtime.register(
            key,
            SlowActor {
                in_flight: in_flight.clone(),
                max_seen: max_seen.clone(),
            },
        );

        let mut joins = Vec::new();
        for _ in 0..8 {
            let handle = handle.clone();
            joins.push(tokio::spawn(async move {
                handle
                    .send(attache_core::message::Reset, CancellationToken::new())
                    .await
            }));
        }
        for join in joins {
            join.await.unwrap().unwrap();
        }

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }
}
