//! Concurrency tests for the pending counter and quiescence wait.

use std::sync::mpsc;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use rstest::{fixture, rstest};

use crate::{KeySpaceNode, Outcome, OutcomeKind};

const STILL_WAITING: Duration = Duration::from_millis(150);
const COMPLETION_DEADLINE: Duration = Duration::from_secs(5);

#[fixture]
fn root() -> Arc<KeySpaceNode> {
    KeySpaceNode::root()
}

#[rstest]
fn concurrent_disjoint_sets_are_never_lost(root: Arc<KeySpaceNode>) {
    const WRITERS: usize = 16;
    const PER_WRITER: usize = 25;

    thread::scope(|scope| {
        for writer in 0..WRITERS {
            let tree = &root;
            scope.spawn(move || {
                for item in 0..PER_WRITER {
                    let outcome = tree.handle_request(&format!("set w{writer}-{item}"));
                    assert_eq!(outcome.kind(), OutcomeKind::Ok);
                }
            });
        }
    });

    assert_eq!(root.child_count(), WRITERS * PER_WRITER);
    assert_eq!(root.pending(), 0);
}

#[rstest]
fn clear_waits_for_in_flight_sets(root: Arc<KeySpaceNode>) {
    const SETTERS: usize = 4;

    let entered = Barrier::new(SETTERS + 1);
    let proceed = Barrier::new(SETTERS + 1);
    let (done_tx, done_rx) = mpsc::channel::<Outcome>();

    thread::scope(|scope| {
        let mut setters = Vec::new();
        for setter in 0..SETTERS {
            let (tree, inside, release) = (&root, &entered, &proceed);
            setters.push(scope.spawn(move || {
                let _in_flight = tree.enter();
                inside.wait();
                release.wait();
                tree.handle_request(&format!("set s{setter}"))
            }));
        }
        entered.wait();

        let clearer = &root;
        scope.spawn(move || {
            let outcome = clearer.handle_request("clear");
            done_tx.send(outcome).expect("send clear outcome");
        });
        assert!(
            done_rx.recv_timeout(STILL_WAITING).is_err(),
            "clear finished while sets were in flight"
        );

        proceed.wait();
        for setter in setters {
            let outcome = setter.join().expect("setter thread");
            assert_eq!(outcome.kind(), OutcomeKind::Ok);
        }
        let cleared = done_rx
            .recv_timeout(COMPLETION_DEADLINE)
            .expect("clear completes once sets finish");
        assert_eq!(cleared.kind(), OutcomeKind::Ok);
    });

    assert_eq!(root.child_count(), 0);
    assert_eq!(root.pending(), 0);
}

#[rstest]
fn remove_waits_for_child_quiescence(root: Arc<KeySpaceNode>) {
    assert_eq!(root.handle_request("set a b").kind(), OutcomeKind::Error);
    assert_eq!(root.handle_request("set a").kind(), OutcomeKind::Ok);
    assert_eq!(root.handle_request("set a b").kind(), OutcomeKind::Ok);
    let child = root.child("a").expect("child a");
    let (done_tx, done_rx) = mpsc::channel::<Outcome>();

    thread::scope(|scope| {
        let pinned = child.enter();
        let remover = &root;
        scope.spawn(move || {
            done_tx
                .send(remover.handle_request("remove a"))
                .expect("send remove outcome");
        });
        assert!(
            done_rx.recv_timeout(STILL_WAITING).is_err(),
            "remove finished while the child was busy"
        );
        assert_eq!(child.child_names(), ["b"]);

        drop(pinned);
        let removed = done_rx
            .recv_timeout(COMPLETION_DEADLINE)
            .expect("remove completes once the child is quiet");
        assert_eq!(removed.kind(), OutcomeKind::Ok);
    });

    assert!(root.child("a").is_none());
    assert_eq!(child.child_count(), 0);
}

#[rstest]
fn clear_of_child_waits_for_its_readers(root: Arc<KeySpaceNode>) {
    assert_eq!(root.handle_request("set a").kind(), OutcomeKind::Ok);
    assert_eq!(root.handle_request("set a x,y").kind(), OutcomeKind::Ok);
    let child = root.child("a").expect("child a");
    let (done_tx, done_rx) = mpsc::channel::<Outcome>();

    thread::scope(|scope| {
        let pinned = child.enter();
        let clearer = &root;
        scope.spawn(move || {
            done_tx
                .send(clearer.handle_request("clear a"))
                .expect("send clear outcome");
        });
        assert!(done_rx.recv_timeout(STILL_WAITING).is_err());
        drop(pinned);
        let cleared = done_rx
            .recv_timeout(COMPLETION_DEADLINE)
            .expect("clear completes");
        assert_eq!(cleared.kind(), OutcomeKind::Ok);
    });

    assert_eq!(child.child_count(), 0);
    assert_eq!(root.child_names(), ["a"]);
}

#[rstest]
fn mixed_load_settles_with_zero_pending(root: Arc<KeySpaceNode>) {
    const WORKERS: usize = 6;
    const ROUNDS: usize = 40;

    thread::scope(|scope| {
        for worker in 0..WORKERS {
            let tree = &root;
            scope.spawn(move || {
                for round in 0..ROUNDS {
                    let requests = [
                        "set shared".to_owned(),
                        format!("set shared n{worker}-{round}"),
                        "tree".to_owned(),
                        "export shared".to_owned(),
                        "get shared".to_owned(),
                        format!("check shared n{worker}-{round}"),
                        if round.is_multiple_of(5) {
                            "clear shared".to_owned()
                        } else {
                            format!("remove shared n{worker}-{round}")
                        },
                        if round.is_multiple_of(7) {
                            "clear".to_owned()
                        } else {
                            "get".to_owned()
                        },
                    ];
                    for request in &requests {
                        let outcome = tree.handle_request(request);
                        assert_ne!(outcome.kind(), OutcomeKind::Info);
                    }
                }
            });
        }
    });

    assert_eq!(root.pending(), 0);
    if let Some(shared) = root.child("shared") {
        assert_eq!(shared.pending(), 0);
    }
}
