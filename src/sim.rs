//! Multi-client editing simulation.
//!
//! Spins up one coordinator and N sessions over the in-memory transport,
//! lets every client edit concurrently with randomized submission order,
//! then pumps the protocol to quiescence and checks that every replica
//! converged on the identical tree.

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use vellum_sdk::prelude::*;

pub struct SimStats {
    pub clients: usize,
    pub rounds: usize,
    pub final_version: u64,
    pub final_chars: usize,
    pub converged: bool,
    pub elapsed_ms: u128,
}

impl SimStats {
    pub fn print(&self) {
        println!(
            "  clients: {:<3} rounds: {:<4} accepted versions: {:<5} final chars: {:<6} converged: {} ({} ms)",
            self.clients,
            self.rounds,
            self.final_version,
            self.final_chars,
            if self.converged { "yes" } else { "NO" },
            self.elapsed_ms
        );
    }
}

fn seed_document(id: &str) -> Document {
    Document::from_root(
        DocId::from_string(id),
        Node::with_children(
            "doc",
            BTreeMap::new(),
            vec![Node::with_children(
                "paragraph",
                BTreeMap::new(),
                vec![Node::text("Hello world")],
            )],
        ),
    )
}

const WORDS: [&str; 8] = [
    "alpha", "beta", "gamma", "delta", "quick", "brown", "lazy", "vellum",
];

/// Run a randomized concurrent editing session and report convergence.
pub async fn simulate_concurrent_editing(clients: usize, rounds: usize, seed: u64) -> SimStats {
    let start = Instant::now();
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);

    let schema = Arc::new(Schema::hypertext());
    let coordinator = Arc::new(Coordinator::new(schema.clone()));
    let doc_id = DocId::from_string("sim");
    coordinator.create_document(seed_document("sim")).unwrap();
    let transport = Arc::new(MemoryTransport::new(coordinator.clone()));

    let mut sessions = Vec::new();
    for i in 0..clients {
        let session = EditorSession::join(
            transport.clone(),
            schema.clone(),
            doc_id.clone(),
            ClientId::new(format!("client-{i}")),
        )
        .await
        .unwrap();
        sessions.push(session);
    }

    for _ in 0..rounds {
        // Everyone edits their optimistic replica.
        for session in &sessions {
            let len = session.document().flat_len();
            if rng.gen_bool(0.7) || len < 4 {
                let at = rng.gen_range(0..len);
                let word = WORDS[rng.gen_range(0..WORDS.len())];
                let _ = session.insert_text(at, word);
            } else {
                let from = rng.gen_range(0..len - 2);
                let to = (from + rng.gen_range(1..4)).min(len - 1);
                let _ = session.delete_range(from, to.max(from + 1));
            }
        }
        // Batches race to the coordinator in a random order.
        let mut order: Vec<usize> = (0..sessions.len()).collect();
        order.shuffle(&mut rng);
        for &i in &order {
            sessions[i].sync().await.unwrap();
        }
    }

    // Drain until every replica is caught up.
    loop {
        let mut quiet = true;
        for session in &sessions {
            session.flush().await.unwrap();
            if session.poll_remote().await.unwrap() > 0 {
                quiet = false;
            }
            if !session.is_synced() {
                quiet = false;
            }
        }
        if quiet {
            break;
        }
    }

    let canonical = coordinator.snapshot(&doc_id).unwrap();
    let converged = sessions
        .iter()
        .all(|s| s.document().root() == canonical.root());

    SimStats {
        clients,
        rounds,
        final_version: coordinator.version(&doc_id).unwrap(),
        final_chars: canonical.text().chars().count(),
        converged,
        elapsed_ms: start.elapsed().as_millis(),
    }
}

/// The canonical walkthrough: two concurrent edits against the same base
/// version, resolved by rebasing in acceptance order.
pub async fn walkthrough() {
    let schema = Arc::new(Schema::hypertext());
    let coordinator = Arc::new(Coordinator::new(schema.clone()));
    let doc_id = DocId::from_string("walkthrough");
    coordinator
        .create_document(seed_document("walkthrough"))
        .unwrap();
    let transport = Arc::new(MemoryTransport::new(coordinator.clone()));

    let alice = EditorSession::join(
        transport.clone(),
        schema.clone(),
        doc_id.clone(),
        ClientId::new("alice"),
    )
    .await
    .unwrap();
    let bob = EditorSession::join(transport, schema, doc_id.clone(), ClientId::new("bob"))
        .await
        .unwrap();

    println!("  start:          {:?}", alice.text());

    alice.delete_range(0, 6).unwrap();
    bob.insert_text(11, "!").unwrap();
    println!("  alice (local):  {:?}", alice.text());
    println!("  bob   (local):  {:?}", bob.text());

    alice.sync_to_quiescence().await.unwrap();
    bob.sync_to_quiescence().await.unwrap();
    alice.poll_remote().await.unwrap();

    println!("  alice (synced): {:?}", alice.text());
    println!("  bob   (synced): {:?}", bob.text());
    let canonical = coordinator.snapshot(&doc_id).unwrap();
    println!(
        "  canonical v{}:   {:?}",
        coordinator.version(&doc_id).unwrap(),
        canonical.text()
    );
    println!("  as html:        {}", vellum_html::serialize_html(&canonical));
}
