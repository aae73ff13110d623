//! Transport abstraction between clients and a coordinator.
//!
//! The engine assumes a reliable, ordered message channel per client;
//! everything else about the wire is someone else's problem. The
//! in-memory transport runs against a coordinator in the same process,
//! for tests, simulations, and single-process embedding.

use crate::error::{Result, SdkError};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;
use vellum_collab::{ClientId, ClientMessage, CollabError, Coordinator, ServerMessage};
use vellum_doc::DocId;

/// A reliable, ordered channel to a coordinator.
#[async_trait]
pub trait CollabTransport: Send + Sync + 'static {
    /// Join a document: returns the starting snapshot and the receiver
    /// broadcasts arrive on.
    async fn connect(
        &self,
        doc: &DocId,
        client: ClientId,
    ) -> Result<(ServerMessage, mpsc::UnboundedReceiver<ServerMessage>)>;

    /// Deliver a client message to the coordinator.
    async fn send(&self, doc: &DocId, message: ClientMessage) -> Result<()>;

    /// Leave a document.
    async fn disconnect(&self, doc: &DocId, client: &ClientId) -> Result<()>;
}

/// In-process transport wired straight into a coordinator.
pub struct MemoryTransport {
    coordinator: Arc<Coordinator>,
}

impl MemoryTransport {
    pub fn new(coordinator: Arc<Coordinator>) -> Self {
        Self { coordinator }
    }

    pub fn coordinator(&self) -> &Arc<Coordinator> {
        &self.coordinator
    }
}

#[async_trait]
impl CollabTransport for MemoryTransport {
    async fn connect(
        &self,
        doc: &DocId,
        client: ClientId,
    ) -> Result<(ServerMessage, mpsc::UnboundedReceiver<ServerMessage>)> {
        Ok(self.coordinator.connect(doc, client)?)
    }

    async fn send(&self, doc: &DocId, message: ClientMessage) -> Result<()> {
        match self.coordinator.handle(doc, message) {
            Ok(()) => Ok(()),
            // A schema rejection reaches the submitter through its
            // broadcast channel; the send itself did not fail.
            Err(CollabError::Step(_)) => Ok(()),
            Err(other) => Err(SdkError::Collab(other)),
        }
    }

    async fn disconnect(&self, doc: &DocId, client: &ClientId) -> Result<()> {
        Ok(self.coordinator.disconnect(doc, client)?)
    }
}
