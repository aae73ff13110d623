//! Convergence tests for the collaboration coordinator.
//!
//! These exercise the protocol-level guarantees: every client replaying
//! the broadcast log reconstructs the identical tree, versions increase
//! strictly one per accepted batch, resubmission never double-applies,
//! and the concrete rebase scenarios behave exactly as specified.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::BTreeMap;
use std::sync::Arc;
use vellum_collab::{ClientId, Coordinator, SubmitOutcome};
use vellum_doc::{DocId, Document, Node};
use vellum_schema::Schema;
use vellum_step::Step;

fn schema() -> Arc<Schema> {
    Arc::new(Schema::hypertext())
}

fn hello_world(id: &str) -> Document {
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

/// Replay the accepted log on top of a base snapshot, the way a client
/// applies broadcasts in order.
fn replay(coord: &Coordinator, doc_id: &DocId, base: &Document) -> Document {
    let schema = coord.schema().clone();
    let mut doc = base.clone();
    for entry in coord.history(doc_id).unwrap().entries() {
        for step in &entry.steps {
            doc = step.apply(&schema, &doc).unwrap();
        }
    }
    doc
}

#[test]
fn test_concrete_rebase_scenario() {
    // Starting document "Hello world" at version 0. A deletes "Hello ",
    // B (also at version 0) appends "!" after "world"; B's insert at 11
    // must land at 5, producing "world!".
    let coord = Coordinator::new(schema());
    let doc_id = DocId::from_string("scenario");
    coord.create_document(hello_world("scenario")).unwrap();

    let a = coord
        .submit(
            &doc_id,
            ClientId::new("client-a"),
            0,
            1,
            vec![Step::Delete { from: 0, to: 6 }],
        )
        .unwrap();
    assert!(matches!(a, SubmitOutcome::Accepted { version: 1, .. }));
    assert_eq!(coord.snapshot(&doc_id).unwrap().text(), "world");

    let b = coord
        .submit(
            &doc_id,
            ClientId::new("client-b"),
            0,
            1,
            vec![Step::insert_text(11, "!")],
        )
        .unwrap();
    match b {
        SubmitOutcome::Accepted { version, steps } => {
            assert_eq!(version, 2);
            assert_eq!(steps, vec![Step::insert_text(5, "!")]);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(coord.snapshot(&doc_id).unwrap().text(), "world!");

    // C, also at version 0, submits the identical insert: it rebases
    // through both accepted batches the same deterministic way.
    let c = coord
        .submit(
            &doc_id,
            ClientId::new("client-c"),
            0,
            1,
            vec![Step::insert_text(11, "!")],
        )
        .unwrap();
    match c {
        SubmitOutcome::Accepted { version, steps } => {
            assert_eq!(version, 3);
            assert_eq!(steps, vec![Step::insert_text(6, "!")]);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(coord.snapshot(&doc_id).unwrap().text(), "world!!");

    // But a resubmission of an already-accepted batch is a no-op.
    let dup = coord
        .submit(
            &doc_id,
            ClientId::new("client-c"),
            0,
            1,
            vec![Step::insert_text(11, "!")],
        )
        .unwrap();
    assert_eq!(dup, SubmitOutcome::Duplicate { version: 3 });
    assert_eq!(coord.snapshot(&doc_id).unwrap().text(), "world!!");
}

#[test]
fn test_log_replay_reconstructs_canonical_tree() {
    let coord = Coordinator::new(schema());
    let doc_id = DocId::from_string("replay");
    let base = hello_world("replay");
    coord.create_document(base.clone()).unwrap();

    coord
        .submit(
            &doc_id,
            ClientId::new("a"),
            0,
            1,
            vec![Step::Delete { from: 0, to: 6 }],
        )
        .unwrap();
    coord
        .submit(
            &doc_id,
            ClientId::new("b"),
            0,
            1,
            vec![Step::insert_text(11, "!")],
        )
        .unwrap();
    coord
        .submit(
            &doc_id,
            ClientId::new("a"),
            2,
            2,
            vec![Step::insert_text(0, ">> ")],
        )
        .unwrap();

    let replayed = replay(&coord, &doc_id, &base);
    let canonical = coord.snapshot(&doc_id).unwrap();
    assert_eq!(replayed.root(), canonical.root());
    assert_eq!(replayed.text(), ">> world!");
}

#[test]
fn test_permuted_concurrent_submissions_always_converge() {
    // Five clients each prepare one edit against version 0. Whatever the
    // arrival order, every client replaying the log from the snapshot
    // ends with the coordinator's exact tree.
    let edits: Vec<(&str, Step)> = vec![
        ("a", Step::Delete { from: 0, to: 6 }),
        ("b", Step::insert_text(11, "!")),
        ("c", Step::insert_text(0, "Re: ")),
        ("d", Step::Delete { from: 5, to: 11 }),
        ("e", Step::insert_text(6, "big ")),
    ];

    let mut rng = rand::rngs::StdRng::seed_from_u64(42);
    for round in 0..20 {
        let mut order: Vec<usize> = (0..edits.len()).collect();
        order.shuffle(&mut rng);

        let doc_name = format!("perm-{round}");
        let coord = Coordinator::new(schema());
        let doc_id = DocId::from_string(doc_name.clone());
        let base = hello_world(&doc_name);
        coord.create_document(base.clone()).unwrap();

        for &i in &order {
            let (client, step) = &edits[i];
            coord
                .submit(
                    &doc_id,
                    ClientId::new(*client),
                    0,
                    1,
                    vec![step.clone()],
                )
                .unwrap();
        }

        let canonical = coord.snapshot(&doc_id).unwrap();
        // Every replica sees the same log, so every replica converges.
        for _client in 0..edits.len() {
            let replica = replay(&coord, &doc_id, &base);
            assert_eq!(replica.root(), canonical.root(), "order {order:?}");
        }
        assert_eq!(coord.version(&doc_id).unwrap(), edits.len() as u64);
    }
}

#[test]
fn test_version_monotonicity() {
    let coord = Coordinator::new(schema());
    let doc_id = DocId::from_string("mono");
    coord.create_document(hello_world("mono")).unwrap();

    let mut last = 0;
    for seq in 1..=10u64 {
        let outcome = coord
            .submit(
                &doc_id,
                ClientId::new("a"),
                coord.version(&doc_id).unwrap(),
                seq,
                vec![Step::insert_text(0, "x")],
            )
            .unwrap();
        match outcome {
            SubmitOutcome::Accepted { version, .. } => {
                assert_eq!(version, last + 1);
                last = version;
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
    assert_eq!(coord.history(&doc_id).unwrap().version(), 10);
}

#[test]
fn test_independent_documents_do_not_interfere() {
    let coord = Coordinator::new(schema());
    coord.create_document(hello_world("one")).unwrap();
    coord.create_document(hello_world("two")).unwrap();
    let one = DocId::from_string("one");
    let two = DocId::from_string("two");

    coord
        .submit(
            &one,
            ClientId::new("a"),
            0,
            1,
            vec![Step::Delete { from: 0, to: 6 }],
        )
        .unwrap();

    assert_eq!(coord.snapshot(&one).unwrap().text(), "world");
    assert_eq!(coord.snapshot(&two).unwrap().text(), "Hello world");
    assert_eq!(coord.version(&one).unwrap(), 1);
    assert_eq!(coord.version(&two).unwrap(), 0);
}

#[test]
fn test_version_log_serializes_for_audit() {
    let coord = Coordinator::new(schema());
    let doc_id = DocId::from_string("audit");
    coord.create_document(hello_world("audit")).unwrap();
    coord
        .submit(
            &doc_id,
            ClientId::new("a"),
            0,
            1,
            vec![Step::Delete { from: 0, to: 6 }],
        )
        .unwrap();

    let log = coord.history(&doc_id).unwrap();
    let json = serde_json::to_string(&log).unwrap();
    let back: vellum_collab::VersionLog = serde_json::from_str(&json).unwrap();
    assert_eq!(back, log);
}
