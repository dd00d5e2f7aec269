//! Accept and data-scan loops, each run on its own thread.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;

use keyspace_config::KeepAliveConfig;
use tracing::{debug, info, warn};

use crate::frame::FramedConnection;
use crate::pool::JobPool;
use crate::sockets::{self, SocketHandle, SocketOption};

use super::peer::Peer;
use super::{SERVER_TARGET, Shared};

const ACCEPT_BACKOFF: Duration = Duration::from_millis(25);
const ERROR_BACKOFF: Duration = Duration::from_millis(150);
const SCAN_IDLE: Duration = Duration::from_millis(2);

pub(super) fn run_accept_loop(shared: &Shared, listener: SocketHandle, keep_alive: KeepAliveConfig) {
    debug!(target: SERVER_TARGET, %listener, "accept loop running");
    let mut last_error = None::<io::ErrorKind>;
    while !shared.halted.load(Ordering::SeqCst) {
        match accept_once(shared, listener) {
            Ok(Some((socket, remote))) => {
                last_error = None;
                admit(shared, socket, remote, keep_alive);
            }
            Ok(None) => {}
            Err(error) => {
                let kind = error.kind();
                if last_error != Some(kind) {
                    warn!(
                        target: SERVER_TARGET,
                        error = %error,
                        "socket accept error"
                    );
                }
                last_error = Some(kind);
                thread::sleep(ERROR_BACKOFF);
            }
        }
    }
    debug!(target: SERVER_TARGET, %listener, "accept loop stopped");
}

fn accept_once(
    shared: &Shared,
    listener: SocketHandle,
) -> io::Result<Option<(SocketHandle, SocketAddr)>> {
    if !shared.sockets.poll_readable(listener, ACCEPT_BACKOFF)? {
        return Ok(None);
    }
    let accepted = shared.sockets.accept(listener)?;
    if accepted.is_none() {
        thread::sleep(ACCEPT_BACKOFF);
    }
    Ok(accepted)
}

/// Configures an accepted socket and registers it as a peer.
pub(super) fn admit(
    shared: &Shared,
    socket: SocketHandle,
    remote: SocketAddr,
    keep_alive: KeepAliveConfig,
) -> bool {
    let configured = shared
        .sockets
        .set_option(socket, SocketOption::NonBlocking(true))
        .and_then(|()| {
            shared
                .sockets
                .set_option(socket, SocketOption::KeepAlive(keep_alive))
        });
    if let Err(error) = configured {
        warn!(
            target: SERVER_TARGET,
            %remote,
            error = %error,
            "failed to configure peer socket; dropping it"
        );
        sockets::discard(shared.sockets.as_ref(), socket);
        return false;
    }
    let mut connection = FramedConnection::new(Arc::clone(&shared.sockets), socket, remote);
    shared.handler.on_connect(&mut connection);
    shared.peers.insert(Arc::new(Peer::new(connection)));
    info!(target: SERVER_TARGET, %remote, "peer connected");
    true
}

pub(super) fn run_scan_loop(shared: &Arc<Shared>, pool: &JobPool) {
    debug!(target: SERVER_TARGET, "scan loop running");
    while !shared.halted.load(Ordering::SeqCst) {
        let mut busy = false;
        for peer in shared.peers.snapshot() {
            if peer.is_awaiting_response() {
                continue;
            }
            busy |= scan_peer(shared, pool, &peer);
        }
        if !busy {
            thread::sleep(SCAN_IDLE);
        }
    }
    debug!(target: SERVER_TARGET, "scan loop stopped");
}

/// Returns `true` when work was submitted for `peer`.
fn scan_peer(shared: &Arc<Shared>, pool: &JobPool, peer: &Arc<Peer>) -> bool {
    let mut connection = peer.lock();
    if !connection.is_connected() {
        drop(connection);
        return peer.claim_removal() && schedule_removal(shared, pool, peer);
    }
    let Some(payload) = connection.receive_frame() else {
        return false;
    };
    drop(connection);

    let slot = peer.begin_response();
    let job_shared = Arc::clone(shared);
    pool.add_job(move || {
        let mut answering = slot.peer().lock();
        job_shared.handler.on_data(&payload, &mut answering);
    })
}

fn schedule_removal(shared: &Arc<Shared>, pool: &JobPool, peer: &Arc<Peer>) -> bool {
    let job_shared = Arc::clone(shared);
    let departing = Arc::clone(peer);
    pool.add_job(move || {
        if departing.finish(job_shared.handler.as_ref()) {
            info!(target: SERVER_TARGET, remote = %departing.remote(), "peer disconnected");
        }
        job_shared.peers.remove(&departing);
    })
}
