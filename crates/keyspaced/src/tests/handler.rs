//! Unit tests for the request handler over a mocked socket layer.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};

use keyspace_net::test_support::MockSockets;
use keyspace_net::{DISCONNECT_TOKEN, FramedConnection, PeerHandler, SocketHandle, decode_text};
use keyspace_tree::KeySpaceNode;
use rstest::{fixture, rstest};

use crate::handler::{GREETING, StoreHandler};

use super::support::{HealthEvent, RecordingHealthReporter};

const SOCKET: SocketHandle = SocketHandle::new(9);

struct Harness {
    handler: StoreHandler,
    root: Arc<KeySpaceNode>,
    reporter: Arc<RecordingHealthReporter>,
    sent: Arc<Mutex<Vec<String>>>,
    connection: FramedConnection,
}

impl Harness {
    fn sent(&self) -> Vec<String> {
        self.sent.lock().expect("sent frames").clone()
    }
}

fn remote() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::LOCALHOST, 7000))
}

/// Records sent frames and expects exactly one shutdown and close.
#[fixture]
fn harness() -> Harness {
    let sent = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&sent);
    let mut sockets = MockSockets::new();
    sockets.expect_send().returning(move |_, bytes| {
        recorded
            .lock()
            .expect("sent frames")
            .push(decode_text(&bytes[8..]));
        Ok(())
    });
    sockets.expect_shutdown().times(1).returning(|_| Ok(()));
    sockets.expect_close().times(1).return_const(());

    let root = KeySpaceNode::root();
    let reporter = Arc::new(RecordingHealthReporter::default());
    let handler = StoreHandler::new(Arc::clone(&root), Arc::clone(&reporter) as _);
    Harness {
        handler,
        root,
        reporter,
        sent,
        connection: FramedConnection::new(Arc::new(sockets), SOCKET, remote()),
    }
}

#[rstest]
fn connecting_peers_are_greeted(mut harness: Harness) {
    harness.handler.on_connect(&mut harness.connection);

    assert_eq!(harness.sent(), vec![GREETING.to_owned()]);
    assert_eq!(
        harness.reporter.events(),
        vec![HealthEvent::PeerConnected(remote())]
    );
}

#[rstest]
fn requests_are_answered_with_the_rendered_outcome(mut harness: Harness) {
    harness
        .handler
        .on_data(b"set a\0", &mut harness.connection);

    assert_eq!(
        harness.sent(),
        vec!["ok: Object 'a' has been successfully set in 'database'.".to_owned()]
    );
    assert_eq!(harness.root.child_names(), vec!["a".to_owned()]);
}

#[rstest]
fn request_timing_is_appended_when_enabled(mut harness: Harness) {
    harness.handler = StoreHandler::new(
        Arc::clone(&harness.root),
        Arc::clone(&harness.reporter) as _,
    )
    .with_request_timing(true);

    harness
        .handler
        .on_data(b"set a\0", &mut harness.connection);

    let sent = harness.sent();
    assert_eq!(sent.len(), 1);
    let (outcome, timing) = sent[0].split_once('\n').expect("timing line");
    assert_eq!(outcome, "ok: Object 'a' has been successfully set in 'database'.");
    let seconds = timing
        .strip_prefix("Request took ")
        .and_then(|rest| rest.strip_suffix(" seconds."))
        .expect("timing sentence");
    assert!(seconds.parse::<f64>().is_ok(), "unparsable duration {seconds}");
}

#[rstest]
fn the_disconnect_token_closes_without_answering(mut harness: Harness) {
    let payload = format!("{DISCONNECT_TOKEN}\0");

    harness
        .handler
        .on_data(payload.as_bytes(), &mut harness.connection);

    assert!(!harness.connection.is_connected());
    assert!(harness.sent().is_empty());
    assert_eq!(harness.root.child_count(), 0);
}

#[rstest]
fn disconnects_are_reported(harness: Harness) {
    harness.handler.on_disconnect(&harness.connection);

    assert_eq!(
        harness.reporter.events(),
        vec![HealthEvent::PeerDisconnected(remote())]
    );
}
