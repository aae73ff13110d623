//! Editor sessions: a client replica wired to a transport.
//!
//! A session owns the optimistic replica for one document, exposes the
//! editing surface, and pumps the protocol when asked: `sync` drains
//! incoming broadcasts and submits the next batch when the wire is free.
//! Session events go out on a broadcast channel; there is no implicit
//! listener registration.

use crate::client::{Client, ReceiveOutcome};
use crate::config::SessionConfig;
use crate::error::{Result, SdkError};
use crate::transport::CollabTransport;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{broadcast, mpsc};
use tracing::debug;
use vellum_collab::{Annotation, AnnotationId, ClientId, ClientMessage, Selection, ServerMessage};
use vellum_doc::{DocId, Document, Mark};
use vellum_schema::Schema;

/// Events emitted by a session.
#[derive(Clone, Debug)]
pub enum SessionEvent {
    /// Our own batch was accepted; the replica is caught up to `version`.
    Acknowledged { version: u64 },
    /// Another client's batch was applied.
    RemoteChange { version: u64, client: ClientId },
    /// Our batch was rejected and rolled back.
    Rejected { reason: String },
    /// The replica was replaced by a fresh snapshot.
    Resynced { version: u64 },
}

/// A collaborative editing session for one document.
pub struct EditorSession<T: CollabTransport> {
    doc_id: DocId,
    client_id: ClientId,
    transport: Arc<T>,
    config: SessionConfig,
    client: Mutex<Client>,
    incoming: Mutex<mpsc::UnboundedReceiver<ServerMessage>>,
    events: broadcast::Sender<SessionEvent>,
    last_heartbeat: Mutex<Instant>,
}

impl<T: CollabTransport> EditorSession<T> {
    /// Join a document with default configuration.
    pub async fn join(
        transport: Arc<T>,
        schema: Arc<Schema>,
        doc_id: DocId,
        client_id: ClientId,
    ) -> Result<Self> {
        Self::join_with_config(transport, schema, doc_id, client_id, SessionConfig::default())
            .await
    }

    /// Join a document: connect, take the snapshot, start a replica.
    pub async fn join_with_config(
        transport: Arc<T>,
        schema: Arc<Schema>,
        doc_id: DocId,
        client_id: ClientId,
        config: SessionConfig,
    ) -> Result<Self> {
        let (snapshot, rx) = transport.connect(&doc_id, client_id.clone()).await?;
        let doc = match snapshot {
            ServerMessage::Snapshot { version, doc } => doc.at_version(version),
            _ => return Err(SdkError::NotConnected),
        };
        debug!(doc = %doc_id, client = %client_id, version = doc.version(), "joined session");
        let (events, _) = broadcast::channel(64);
        Ok(Self {
            doc_id,
            client_id: client_id.clone(),
            transport,
            config,
            client: Mutex::new(Client::new(client_id, schema, doc)),
            incoming: Mutex::new(rx),
            events,
            last_heartbeat: Mutex::new(Instant::now()),
        })
    }

    pub fn doc_id(&self) -> &DocId {
        &self.doc_id
    }

    pub fn client_id(&self) -> &ClientId {
        &self.client_id
    }

    /// Subscribe to session events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    // === Editing surface ===

    pub fn insert_text(&self, at: usize, text: impl Into<String>) -> Result<()> {
        self.client.lock().insert_text(at, text)
    }

    pub fn delete_range(&self, from: usize, to: usize) -> Result<()> {
        self.client.lock().delete_range(from, to)
    }

    pub fn replace_range(&self, from: usize, to: usize, text: impl Into<String>) -> Result<()> {
        self.client.lock().replace_range(from, to, text)
    }

    pub fn add_mark(&self, from: usize, to: usize, mark: Mark) -> Result<()> {
        self.client.lock().add_mark(from, to, mark)
    }

    pub fn remove_mark(&self, from: usize, to: usize, mark: Mark) -> Result<()> {
        self.client.lock().remove_mark(from, to, mark)
    }

    pub fn add_annotation(&self, annotation: Annotation) -> AnnotationId {
        self.client.lock().add_annotation(annotation)
    }

    pub fn annotations(&self) -> Vec<Annotation> {
        self.client.lock().overlay().annotations().cloned().collect()
    }

    pub fn set_selection(&self, anchor: usize, head: usize) {
        self.client.lock().set_selection(anchor, head)
    }

    pub fn selection(&self) -> Option<Selection> {
        self.client
            .lock()
            .overlay()
            .selection(&self.client_id)
            .cloned()
    }

    /// The optimistic local tree.
    pub fn document(&self) -> Document {
        self.client.lock().local().clone()
    }

    pub fn text(&self) -> String {
        self.client.lock().local().text()
    }

    /// The canonical version this replica has caught up to.
    pub fn version(&self) -> u64 {
        self.client.lock().version()
    }

    pub fn is_synced(&self) -> bool {
        self.client.lock().is_synced()
    }

    // === Protocol pump ===

    /// Submit the next batch if the wire is free. Returns whether a batch
    /// went out.
    pub async fn flush(&self) -> Result<bool> {
        let message = self.client.lock().sendable();
        match message {
            Some(message) => {
                self.transport.send(&self.doc_id, message).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Drain and apply every queued broadcast. Returns how many messages
    /// were applied.
    pub async fn poll_remote(&self) -> Result<usize> {
        let mut messages = Vec::new();
        {
            let mut incoming = self.incoming.lock();
            while let Ok(message) = incoming.try_recv() {
                messages.push(message);
            }
        }
        let count = messages.len();
        for message in messages {
            let outcome = self.client.lock().receive(message)?;
            let event = match outcome {
                ReceiveOutcome::Acknowledged { version } => {
                    SessionEvent::Acknowledged { version }
                }
                ReceiveOutcome::Applied { version, .. } => SessionEvent::RemoteChange {
                    version,
                    client: self.client_id.clone(),
                },
                ReceiveOutcome::Rejected { reason } => SessionEvent::Rejected {
                    reason: format!("{reason:?}"),
                },
                ReceiveOutcome::Resynced { version } => SessionEvent::Resynced { version },
            };
            let _ = self.events.send(event);
        }
        Ok(count)
    }

    /// One pump cycle: apply queued broadcasts, submit pending work once
    /// it clears the flush threshold, and heartbeat when due.
    pub async fn sync(&self) -> Result<()> {
        self.poll_remote().await?;
        let ready = {
            let client = self.client.lock();
            !client.has_in_flight() && client.buffered_steps() >= self.config.flush_threshold
        };
        if ready {
            self.flush().await?;
        }
        self.poll_remote().await?;

        let due = {
            let last = self.last_heartbeat.lock();
            last.elapsed() >= self.config.heartbeat_interval
        };
        if due {
            self.heartbeat().await?;
        }
        Ok(())
    }

    /// Pump until every local edit is acknowledged.
    pub async fn sync_to_quiescence(&self) -> Result<()> {
        while !self.is_synced() {
            self.flush().await?;
            self.poll_remote().await?;
        }
        Ok(())
    }

    /// Keep-alive against the coordinator's inactivity eviction.
    pub async fn heartbeat(&self) -> Result<()> {
        self.transport
            .send(
                &self.doc_id,
                ClientMessage::Heartbeat {
                    client: self.client_id.clone(),
                },
            )
            .await?;
        *self.last_heartbeat.lock() = Instant::now();
        Ok(())
    }

    /// Leave the document. Unacknowledged work is dropped, never
    /// partially applied.
    pub async fn leave(&self) -> Result<()> {
        self.transport.disconnect(&self.doc_id, &self.client_id).await
    }
}
