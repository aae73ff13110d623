//! The optimistic client replica.
//!
//! A client keeps two trees: the confirmed document (the canonical state
//! as of the last broadcast it applied) and the local document (confirmed
//! plus everything the user has done since). Local edits never wait on
//! the network: they apply immediately, queue in a buffer, and travel to
//! the coordinator one batch at a time. Every broadcast re-derives the
//! local tree and re-maps pending steps and overlay anchors.

use crate::error::{Result, SdkError};
use std::sync::Arc;
use tracing::{debug, warn};
use vellum_collab::{
    Annotation, AnnotationId, ClientId, ClientMessage, Overlay, RejectReason, Selection,
    ServerMessage,
};
use vellum_doc::{Document, Fragment, Mark};
use vellum_schema::Schema;
use vellum_step::{rebase_batch, Mapping, Step};

/// A batch that has been submitted but not yet acknowledged. Steps are
/// kept in local form: rebased forward as foreign broadcasts arrive.
#[derive(Clone, Debug)]
struct InFlight {
    request_seq: u64,
    steps: Vec<Step>,
}

/// What a received server message did to the client state.
#[derive(Clone, Debug, PartialEq)]
pub enum ReceiveOutcome {
    /// Our own batch was accepted at this version.
    Acknowledged { version: u64 },
    /// Foreign steps were applied at this version.
    Applied { version: u64, steps: Vec<Step> },
    /// Our in-flight batch was rejected; its edits were rolled back.
    Rejected { reason: RejectReason },
    /// State was replaced by a snapshot; pending edits were discarded.
    Resynced { version: u64 },
}

/// A client-side replica of one collaborative document.
pub struct Client {
    id: ClientId,
    schema: Arc<Schema>,
    confirmed: Document,
    local: Document,
    in_flight: Option<InFlight>,
    buffer: Vec<Step>,
    next_request_seq: u64,
    overlay: Overlay,
}

impl Client {
    /// A fresh, unique client id for callers that do not bring their own.
    pub fn generate_id() -> ClientId {
        ClientId::new(ulid::Ulid::new().to_string())
    }

    /// Start a replica from the snapshot a coordinator hands out on
    /// connect.
    pub fn new(id: ClientId, schema: Arc<Schema>, snapshot: Document) -> Self {
        Self {
            id,
            schema,
            confirmed: snapshot.clone(),
            local: snapshot,
            in_flight: None,
            buffer: Vec::new(),
            next_request_seq: 1,
            overlay: Overlay::new(),
        }
    }

    pub fn id(&self) -> &ClientId {
        &self.id
    }

    /// The canonical version this replica has caught up to.
    pub fn version(&self) -> u64 {
        self.confirmed.version()
    }

    /// The optimistic local tree: confirmed plus pending edits.
    pub fn local(&self) -> &Document {
        &self.local
    }

    /// The last confirmed canonical tree.
    pub fn confirmed(&self) -> &Document {
        &self.confirmed
    }

    pub fn overlay(&self) -> &Overlay {
        &self.overlay
    }

    /// Steps waiting to be submitted (not counting the in-flight batch).
    pub fn buffered_steps(&self) -> usize {
        self.buffer.len()
    }

    pub fn has_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Whether every local edit has been accepted by the coordinator.
    pub fn is_synced(&self) -> bool {
        self.in_flight.is_none() && self.buffer.is_empty()
    }

    // === Local editing ===

    /// Apply a step to the local tree and queue it for submission.
    pub fn apply_local(&mut self, step: Step) -> Result<()> {
        let next = step.apply(&self.schema, &self.local)?;
        self.overlay
            .map_through(&Mapping::from_maps(vec![step.step_map()]));
        self.local = next;
        self.buffer.push(step);
        Ok(())
    }

    pub fn insert_text(&mut self, at: usize, text: impl Into<String>) -> Result<()> {
        self.apply_local(Step::insert_text(at, text))
    }

    pub fn delete_range(&mut self, from: usize, to: usize) -> Result<()> {
        self.apply_local(Step::Delete { from, to })
    }

    pub fn replace_range(
        &mut self,
        from: usize,
        to: usize,
        text: impl Into<String>,
    ) -> Result<()> {
        self.apply_local(Step::Replace {
            from,
            to,
            content: Fragment::text(text),
        })
    }

    pub fn add_mark(&mut self, from: usize, to: usize, mark: Mark) -> Result<()> {
        self.apply_local(Step::AddMark { from, to, mark })
    }

    pub fn remove_mark(&mut self, from: usize, to: usize, mark: Mark) -> Result<()> {
        self.apply_local(Step::RemoveMark { from, to, mark })
    }

    /// Anchor an annotation on the local tree.
    pub fn add_annotation(&mut self, annotation: Annotation) -> AnnotationId {
        self.overlay.add_annotation(annotation)
    }

    pub fn set_selection(&mut self, anchor: usize, head: usize) {
        self.overlay
            .set_selection(Selection::range(self.id.clone(), anchor, head));
    }

    // === Protocol ===

    /// Move the edit buffer into an in-flight batch and produce the
    /// submission message, if there is anything to send and nothing
    /// already awaiting acknowledgement.
    pub fn sendable(&mut self) -> Option<ClientMessage> {
        if self.in_flight.is_some() || self.buffer.is_empty() {
            return None;
        }
        let steps = std::mem::take(&mut self.buffer);
        let request_seq = self.next_request_seq;
        self.next_request_seq += 1;
        self.in_flight = Some(InFlight {
            request_seq,
            steps: steps.clone(),
        });
        Some(ClientMessage::SubmitSteps {
            client: self.id.clone(),
            base_version: self.confirmed.version(),
            request_seq,
            steps,
        })
    }

    /// Apply a server message to this replica.
    pub fn receive(&mut self, message: ServerMessage) -> Result<ReceiveOutcome> {
        match message {
            ServerMessage::Snapshot { version, doc } => {
                let doc = doc.at_version(version);
                debug!(client = %self.id, version, "resynced from snapshot");
                self.confirmed = doc.clone();
                self.local = doc;
                self.in_flight = None;
                self.buffer.clear();
                self.overlay = Overlay::new();
                Ok(ReceiveOutcome::Resynced { version })
            }
            ServerMessage::Rejected { request_seq, reason } => {
                let ours = self
                    .in_flight
                    .as_ref()
                    .is_some_and(|f| f.request_seq == request_seq);
                if ours {
                    if let Some(in_flight) = self.in_flight.take() {
                        warn!(client = %self.id, request_seq, ?reason, "batch rejected, rolling back");
                        self.rebuild_without(&in_flight.steps);
                    }
                }
                Ok(ReceiveOutcome::Rejected { reason })
            }
            ServerMessage::Accepted {
                version,
                client,
                request_seq,
                steps,
            } => {
                let expected = self.confirmed.version() + 1;
                if version != expected {
                    return Err(SdkError::VersionGap {
                        expected,
                        got: version,
                    });
                }
                let ours = client == self.id
                    && self
                        .in_flight
                        .as_ref()
                        .is_some_and(|f| f.request_seq == request_seq);
                if ours {
                    if let Some(in_flight) = self.in_flight.take() {
                        self.acknowledge(in_flight, version, &steps)?;
                    }
                    Ok(ReceiveOutcome::Acknowledged { version })
                } else {
                    self.apply_foreign(version, &steps)?;
                    Ok(ReceiveOutcome::Applied { version, steps })
                }
            }
        }
    }

    /// Our own batch came back (possibly rebased by the coordinator).
    /// The broadcast form becomes part of the confirmed tree; buffered
    /// steps that assumed our local form move over to it.
    fn acknowledge(&mut self, in_flight: InFlight, version: u64, accepted: &[Step]) -> Result<()> {
        let mut confirmed = self.confirmed.clone();
        for step in accepted {
            confirmed = step.apply(&self.schema, &confirmed)?;
        }
        let confirmed = confirmed.at_version(version);

        // Carry the buffer from (confirmed_old + in_flight) over to the
        // accepted form: unwind our local copy, cross the accepted steps.
        // When the coordinator dropped nothing the two line up step for
        // step; mirror pairs then keep offsets inside in-flight content.
        let n = in_flight.steps.len();
        let mut carry = Mapping::new();
        for step in in_flight.steps.iter().rev() {
            carry.append(step.step_map().invert());
        }
        let aligned = accepted.len() == n;
        for (i, step) in accepted.iter().enumerate() {
            let applied = carry.append(step.step_map());
            if aligned {
                carry.set_mirror(n - 1 - i, applied);
            }
        }

        let rebased = rebase_batch(&self.schema, &confirmed, &carry, &self.buffer);
        if !rebased.failed.is_empty() {
            warn!(client = %self.id, failed = rebased.failed.len(), "buffered steps dropped on ack");
        }
        self.overlay.map_through(&rebased.mapping);
        self.confirmed = confirmed;
        self.local = rebased.doc;
        self.buffer = rebased.steps;
        Ok(())
    }

    /// Another client's batch was accepted first: advance the confirmed
    /// tree and rebase everything pending on top of it.
    fn apply_foreign(&mut self, version: u64, steps: &[Step]) -> Result<()> {
        let mut confirmed = self.confirmed.clone();
        for step in steps {
            confirmed = step.apply(&self.schema, &confirmed)?;
        }
        let confirmed = confirmed.at_version(version);
        let foreign = Mapping::from_maps(steps.iter().map(Step::step_map).collect());

        match self.in_flight.take() {
            Some(mut in_flight) => {
                let first = rebase_batch(&self.schema, &confirmed, &foreign, &in_flight.steps);
                let second = rebase_batch(&self.schema, &first.doc, &first.mapping, &self.buffer);
                if !first.failed.is_empty() || !second.failed.is_empty() {
                    warn!(client = %self.id, "pending steps dropped during rebase");
                }
                self.overlay.map_through(&second.mapping);
                in_flight.steps = first.steps;
                self.in_flight = Some(in_flight);
                self.local = second.doc;
                self.buffer = second.steps;
            }
            None => {
                let rebased = rebase_batch(&self.schema, &confirmed, &foreign, &self.buffer);
                if !rebased.failed.is_empty() {
                    warn!(client = %self.id, "buffered steps dropped during rebase");
                }
                self.overlay.map_through(&rebased.mapping);
                self.local = rebased.doc;
                self.buffer = rebased.steps;
            }
        }
        self.confirmed = confirmed;
        Ok(())
    }

    /// Drop a batch from the local tree (after a rejection): unwind it
    /// and re-derive local state from confirmed plus the buffer.
    fn rebuild_without(&mut self, removed: &[Step]) {
        let mut unwind = Mapping::new();
        for step in removed.iter().rev() {
            unwind.append(step.step_map().invert());
        }
        let rebased = rebase_batch(&self.schema, &self.confirmed, &unwind, &self.buffer);
        self.overlay.map_through(&rebased.mapping);
        self.local = rebased.doc;
        self.buffer = rebased.steps;
    }
}
