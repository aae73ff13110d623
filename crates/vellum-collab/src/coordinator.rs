//! The collaboration coordinator.
//!
//! One coordinator serves many documents. Each document has its own
//! critical section: the accept operation (rebase, apply, validate,
//! append, bump, broadcast) runs under that document's lock as a single
//! atomic unit, while independent documents proceed in parallel.

use crate::error::{CollabError, Result};
use crate::log::{LogEntry, VersionLog};
use crate::message::{ClientId, ClientMessage, RejectReason, ServerMessage};
use crate::overlay::{Annotation, AnnotationId, Overlay, Selection};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, warn};
use vellum_doc::{DocId, Document};
use vellum_schema::Schema;
use vellum_step::{rebase_batch, Mapping, Step};

/// Configuration for the coordinator.
#[derive(Clone, Debug)]
pub struct CoordinatorConfig {
    /// Inactivity interval after which a client session is evicted.
    pub session_timeout: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            session_timeout: Duration::from_secs(30),
        }
    }
}

/// Server-side bookkeeping for one connected client.
#[derive(Debug)]
pub struct ClientSession {
    pub client: ClientId,
    /// Last version the client told us it has seen.
    pub last_ack: u64,
    last_seen: Instant,
    outbox: mpsc::UnboundedSender<ServerMessage>,
}

/// The outcome of a submission.
#[derive(Clone, Debug, PartialEq)]
pub enum SubmitOutcome {
    /// The batch was appended; these are the steps as actually applied.
    Accepted { version: u64, steps: Vec<Step> },
    /// The batch had already been accepted; nothing was applied again.
    Duplicate { version: u64 },
}

struct DocState {
    doc: Document,
    log: VersionLog,
    overlay: Overlay,
    sessions: HashMap<ClientId, ClientSession>,
    /// Highest accepted request sequence per client. Kept outside the
    /// session so resubmission stays idempotent across reconnects.
    request_seqs: HashMap<ClientId, u64>,
}

/// The serialization point for collaborative editing.
///
/// The coordinator exclusively owns the canonical tree and version log of
/// every document it serves; all other access goes through read-only
/// snapshots taken at a known version.
pub struct Coordinator {
    schema: Arc<Schema>,
    config: CoordinatorConfig,
    docs: RwLock<HashMap<DocId, Arc<Mutex<DocState>>>>,
}

impl Coordinator {
    pub fn new(schema: Arc<Schema>) -> Self {
        Self::with_config(schema, CoordinatorConfig::default())
    }

    pub fn with_config(schema: Arc<Schema>, config: CoordinatorConfig) -> Self {
        Self {
            schema,
            config,
            docs: RwLock::new(HashMap::new()),
        }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Open a document for collaboration. The tree is validated before it
    /// becomes canonical.
    pub fn create_document(&self, doc: Document) -> Result<()> {
        doc.validate(&self.schema)?;
        let mut docs = self.docs.write();
        if docs.contains_key(doc.id()) {
            return Err(CollabError::DocumentExists(doc.id().to_string()));
        }
        debug!(doc = %doc.id(), "document opened");
        docs.insert(
            doc.id().clone(),
            Arc::new(Mutex::new(DocState {
                doc,
                log: VersionLog::new(),
                overlay: Overlay::new(),
                sessions: HashMap::new(),
                request_seqs: HashMap::new(),
            })),
        );
        Ok(())
    }

    pub fn open_documents(&self) -> Vec<DocId> {
        self.docs.read().keys().cloned().collect()
    }

    fn state(&self, doc_id: &DocId) -> Result<Arc<Mutex<DocState>>> {
        self.docs
            .read()
            .get(doc_id)
            .cloned()
            .ok_or_else(|| CollabError::UnknownDocument(doc_id.to_string()))
    }

    /// Connect a client: registers a session and returns the snapshot it
    /// should start from plus the receiver its broadcasts arrive on.
    pub fn connect(
        &self,
        doc_id: &DocId,
        client: ClientId,
    ) -> Result<(ServerMessage, mpsc::UnboundedReceiver<ServerMessage>)> {
        let state = self.state(doc_id)?;
        let mut state = state.lock();
        let (tx, rx) = mpsc::unbounded_channel();
        let snapshot = ServerMessage::Snapshot {
            version: state.doc.version(),
            doc: state.doc.clone(),
        };
        debug!(doc = %doc_id, client = %client, version = state.doc.version(), "client connected");
        let last_ack = state.doc.version();
        state.sessions.insert(
            client.clone(),
            ClientSession {
                client,
                last_ack,
                last_seen: Instant::now(),
                outbox: tx,
            },
        );
        Ok((snapshot, rx))
    }

    /// Disconnect a client. Its unacknowledged work was never applied and
    /// is simply gone; accepted history is untouched.
    pub fn disconnect(&self, doc_id: &DocId, client: &ClientId) -> Result<()> {
        let state = self.state(doc_id)?;
        let mut state = state.lock();
        state
            .sessions
            .remove(client)
            .ok_or_else(|| CollabError::UnknownClient(client.to_string()))?;
        state.overlay.remove_selection(client);
        debug!(doc = %doc_id, client = %client, "client disconnected");
        Ok(())
    }

    /// Record client liveness.
    pub fn heartbeat(&self, doc_id: &DocId, client: &ClientId) -> Result<()> {
        let state = self.state(doc_id)?;
        let mut state = state.lock();
        let session = state
            .sessions
            .get_mut(client)
            .ok_or_else(|| CollabError::UnknownClient(client.to_string()))?;
        session.last_seen = Instant::now();
        Ok(())
    }

    /// Evict every session idle past the configured timeout, returning
    /// the evicted client ids.
    pub fn evict_idle(&self, doc_id: &DocId) -> Result<Vec<ClientId>> {
        let timeout = self.config.session_timeout;
        let state = self.state(doc_id)?;
        let mut state = state.lock();
        let now = Instant::now();
        let evicted: Vec<ClientId> = state
            .sessions
            .values()
            .filter(|s| now.duration_since(s.last_seen) >= timeout)
            .map(|s| s.client.clone())
            .collect();
        for client in &evicted {
            state.sessions.remove(client);
            state.overlay.remove_selection(client);
            warn!(doc = %doc_id, client = %client, "session evicted after inactivity");
        }
        Ok(evicted)
    }

    /// A read-only snapshot at the current version.
    pub fn snapshot(&self, doc_id: &DocId) -> Result<Document> {
        Ok(self.state(doc_id)?.lock().doc.clone())
    }

    pub fn version(&self, doc_id: &DocId) -> Result<u64> {
        Ok(self.state(doc_id)?.lock().doc.version())
    }

    /// The full accepted history, for audit or replay.
    pub fn history(&self, doc_id: &DocId) -> Result<VersionLog> {
        Ok(self.state(doc_id)?.lock().log.clone())
    }

    /// Connected clients for a document.
    pub fn connected_clients(&self, doc_id: &DocId) -> Result<Vec<ClientId>> {
        Ok(self
            .state(doc_id)?
            .lock()
            .sessions
            .keys()
            .cloned()
            .collect())
    }

    /// Handle a client message.
    pub fn handle(&self, doc_id: &DocId, message: ClientMessage) -> Result<()> {
        match message {
            ClientMessage::SubmitSteps {
                client,
                base_version,
                request_seq,
                steps,
            } => self
                .submit(doc_id, client, base_version, request_seq, steps)
                .map(|_| ()),
            ClientMessage::Heartbeat { client } => self.heartbeat(doc_id, &client),
        }
    }

    /// Accept a step batch.
    ///
    /// If the base version is stale the batch is rebased through every log
    /// entry the client has not seen. The whole operation is atomic under
    /// the document lock: on a schema violation nothing is applied and
    /// only the submitter is told. On success the accepted form is
    /// broadcast to every connected client, submitter included.
    pub fn submit(
        &self,
        doc_id: &DocId,
        client: ClientId,
        base_version: u64,
        request_seq: u64,
        steps: Vec<Step>,
    ) -> Result<SubmitOutcome> {
        let state = self.state(doc_id)?;
        let mut state = state.lock();
        let current = state.doc.version();

        if let Some(session) = state.sessions.get_mut(&client) {
            session.last_seen = Instant::now();
        }
        if request_seq <= state.request_seqs.get(&client).copied().unwrap_or(0) {
            debug!(doc = %doc_id, client = %client, request_seq, "duplicate submission ignored");
            return Ok(SubmitOutcome::Duplicate { version: current });
        }
        if base_version > current {
            return Err(CollabError::FutureBaseVersion {
                base: base_version,
                current,
            });
        }

        let foreign = Mapping::from_maps(state.log.maps_since(base_version));
        let rebased = rebase_batch(&self.schema, &state.doc, &foreign, &steps);

        if let Some((index, err)) = rebased.failed.first() {
            debug!(doc = %doc_id, client = %client, step = index, error = %err, "batch rejected");
            if let Some(session) = state.sessions.get(&client) {
                let _ = session.outbox.send(ServerMessage::Rejected {
                    request_seq,
                    reason: RejectReason::Schema(err.to_string()),
                });
            }
            return Err(CollabError::Step(err.clone()));
        }

        let version = current + 1;
        state.doc = rebased.doc.at_version(version);

        // Canonical anchors move with the accepted steps.
        let accepted_maps = rebased.steps.iter().map(Step::step_map).collect();
        state.overlay.map_through(&Mapping::from_maps(accepted_maps));

        state.log.append(LogEntry {
            client: client.clone(),
            request_seq,
            steps: rebased.steps.clone(),
        });
        state.request_seqs.insert(client.clone(), request_seq);
        if let Some(session) = state.sessions.get_mut(&client) {
            session.last_ack = base_version;
        }

        debug!(
            doc = %doc_id,
            client = %client,
            base_version,
            version,
            rebased_through = foreign.maps().len(),
            dropped = rebased.dropped,
            "batch accepted"
        );

        let broadcast = ServerMessage::Accepted {
            version,
            client,
            request_seq,
            steps: rebased.steps.clone(),
        };
        for session in state.sessions.values() {
            let _ = session.outbox.send(broadcast.clone());
        }

        Ok(SubmitOutcome::Accepted {
            version,
            steps: rebased.steps,
        })
    }

    /// Add an annotation to a document's canonical overlay.
    pub fn add_annotation(&self, doc_id: &DocId, annotation: Annotation) -> Result<AnnotationId> {
        let state = self.state(doc_id)?;
        let mut state = state.lock();
        Ok(state.overlay.add_annotation(annotation))
    }

    /// Look up an annotation by id.
    pub fn annotation(&self, doc_id: &DocId, id: &AnnotationId) -> Result<Option<Annotation>> {
        let state = self.state(doc_id)?;
        let state = state.lock();
        Ok(state.overlay.annotation(id).cloned())
    }

    /// All annotations on a document.
    pub fn annotations(&self, doc_id: &DocId) -> Result<Vec<Annotation>> {
        let state = self.state(doc_id)?;
        let state = state.lock();
        Ok(state.overlay.annotations().cloned().collect())
    }

    /// Publish a client's selection.
    pub fn set_selection(&self, doc_id: &DocId, selection: Selection) -> Result<()> {
        let state = self.state(doc_id)?;
        let mut state = state.lock();
        state.overlay.set_selection(selection);
        Ok(())
    }

    /// All published selections on a document.
    pub fn selections(&self, doc_id: &DocId) -> Result<Vec<Selection>> {
        let state = self.state(doc_id)?;
        let state = state.lock();
        Ok(state.overlay.selections().cloned().collect())
    }
}
