//! Peer registry entries and the registry itself.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::frame::FramedConnection;

use super::PeerHandler;

/// One connected peer.
///
/// `awaiting_response` keeps the scan loop from reading a second frame while
/// a response is outstanding. `pending_removal` makes sure only one removal
/// job is scheduled, and `reported` makes sure the disconnect callback runs
/// once even when shutdown races a removal job.
pub(crate) struct Peer {
    connection: Mutex<FramedConnection>,
    remote: SocketAddr,
    awaiting_response: AtomicBool,
    pending_removal: AtomicBool,
    reported: AtomicBool,
}

impl Peer {
    pub(crate) const fn new(connection: FramedConnection) -> Self {
        Self {
            remote: connection.remote_addr(),
            connection: Mutex::new(connection),
            awaiting_response: AtomicBool::new(false),
            pending_removal: AtomicBool::new(false),
            reported: AtomicBool::new(false),
        }
    }

    pub(crate) const fn remote(&self) -> SocketAddr {
        self.remote
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, FramedConnection> {
        self.connection
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn is_awaiting_response(&self) -> bool {
        self.awaiting_response.load(Ordering::SeqCst)
    }

    /// Marks a request in flight until the returned slot drops.
    pub(crate) fn begin_response(self: &Arc<Self>) -> ResponseSlot {
        self.awaiting_response.store(true, Ordering::SeqCst);
        ResponseSlot {
            peer: Arc::clone(self),
        }
    }

    /// Claims the peer for removal. Returns `true` only for the first caller.
    pub(crate) fn claim_removal(&self) -> bool {
        !self.pending_removal.swap(true, Ordering::SeqCst)
    }

    /// Closes the connection and runs the disconnect callback once.
    pub(crate) fn finish(&self, handler: &dyn PeerHandler) -> bool {
        if self.reported.swap(true, Ordering::SeqCst) {
            return false;
        }
        let mut connection = self.lock();
        connection.disconnect();
        handler.on_disconnect(&connection);
        true
    }
}

/// Clears `awaiting_response` on drop, including during unwinding and when
/// the job carrying it is discarded unstarted.
pub(crate) struct ResponseSlot {
    peer: Arc<Peer>,
}

impl ResponseSlot {
    pub(crate) fn peer(&self) -> &Peer {
        &self.peer
    }
}

impl Drop for ResponseSlot {
    fn drop(&mut self) {
        self.peer.awaiting_response.store(false, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub(crate) struct PeerRegistry {
    peers: Mutex<Vec<Arc<Peer>>>,
}

impl PeerRegistry {
    fn lock(&self) -> MutexGuard<'_, Vec<Arc<Peer>>> {
        self.peers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn insert(&self, peer: Arc<Peer>) {
        self.lock().push(peer);
    }

    pub(crate) fn remove(&self, peer: &Arc<Peer>) -> bool {
        let mut peers = self.lock();
        let before = peers.len();
        peers.retain(|candidate| !Arc::ptr_eq(candidate, peer));
        peers.len() != before
    }

    pub(crate) fn snapshot(&self) -> Vec<Arc<Peer>> {
        self.lock().clone()
    }

    pub(crate) fn find(&self, remote: SocketAddr) -> Option<Arc<Peer>> {
        self.lock()
            .iter()
            .find(|peer| peer.remote() == remote)
            .cloned()
    }

    pub(crate) fn take_all(&self) -> Vec<Arc<Peer>> {
        std::mem::take(&mut *self.lock())
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }
}
