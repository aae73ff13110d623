//! Protocol messages exchanged with the transport layer.
//!
//! Shapes are logical: any wire encoding that round-trips serde works.
//! The coordinator emits [`ServerMessage`]s on one channel per connected
//! client; there is no listener registration or other implicit
//! subscription surface.

use serde::{Deserialize, Serialize};
use vellum_doc::Document;
use vellum_step::Step;

/// Unique identifier for a client. Opaque: the engine never interprets
/// it beyond equality.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClientId(pub String);

impl ClientId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Messages from a client to the coordinator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ClientMessage {
    /// Submit a step batch based on the version the client last saw.
    ///
    /// `request_seq` increases by one per submission from this client;
    /// the coordinator uses it to make resubmission idempotent.
    SubmitSteps {
        client: ClientId,
        base_version: u64,
        request_seq: u64,
        steps: Vec<Step>,
    },
    /// Keep-alive; resets the inactivity eviction timer.
    Heartbeat { client: ClientId },
}

/// Why a submission was rejected.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum RejectReason {
    /// The batch would violate the document schema.
    Schema(String),
    /// The document is not open on this coordinator.
    UnknownDocument(String),
}

/// Messages from the coordinator to clients.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ServerMessage {
    /// A batch was accepted: the rebased, final form actually applied,
    /// broadcast to every connected client including the submitter.
    Accepted {
        version: u64,
        client: ClientId,
        request_seq: u64,
        steps: Vec<Step>,
    },
    /// A batch was rejected; sent to the submitter only.
    Rejected {
        request_seq: u64,
        reason: RejectReason,
    },
    /// A consistent starting point for a newly joining client.
    Snapshot { version: u64, doc: Document },
}

#[cfg(test)]
mod tests {
    use super::*;
    use vellum_step::Step;

    #[test]
    fn test_messages_round_trip_serde() {
        let msg = ClientMessage::SubmitSteps {
            client: ClientId::new("alice"),
            base_version: 3,
            request_seq: 7,
            steps: vec![Step::insert_text(0, "hi")],
        };
        let json = serde_json::to_string(&msg).unwrap();
        let back: ClientMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back, msg);
    }
}
