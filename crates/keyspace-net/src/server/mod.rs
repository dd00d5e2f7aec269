//! Connection server: listening socket, peer registry, and dispatch loops.
//!
//! Two dedicated threads drive the server. The accept loop admits peers and
//! the scan loop reads complete frames from them. Request handling and
//! disconnect handling run as jobs on the [`JobPool`], at most one request
//! per peer at a time so responses leave in request order.

mod errors;
mod handler;
mod loops;
mod peer;

use std::net::{IpAddr, SocketAddr, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use keyspace_config::{Config, KeepAliveConfig};
use strum::{Display, IntoStaticStr};
use tracing::{info, warn};

use crate::pool::JobPool;
use crate::sockets::{AddressFamily, SocketCalls, SocketHandle, SocketOption, SystemSockets};

pub use self::errors::StartError;
pub use self::handler::PeerHandler;
use self::peer::PeerRegistry;

pub(crate) const SERVER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::server");

const LISTEN_BACKLOG: i32 = 128;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(1);

/// Lifecycle state of a [`ConnectionServer`].
///
/// The error states are terminal until the next successful start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ServerStatus {
    /// Not listening.
    Closed,
    /// Listening and serving peers.
    Up,
    /// Socket creation, configuration, or loop start-up failed.
    ErrInit,
    /// The address could not be bound.
    ErrBind,
    /// The socket could not listen.
    ErrListen,
}

/// Settings a server is built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerOptions {
    /// Listen address; port `0` picks an ephemeral port.
    pub address: SocketAddr,
    /// Keep-alive tuning for admitted peers.
    pub keep_alive: KeepAliveConfig,
    /// Worker pool size.
    pub threads: usize,
}

impl ServerOptions {
    /// Options taken from the daemon configuration.
    #[must_use]
    pub const fn from_config(config: &Config) -> Self {
        Self {
            address: config.socket_address(),
            keep_alive: config.keep_alive,
            threads: config.threads,
        }
    }
}

/// State shared with the loop threads and pool jobs.
pub(crate) struct Shared {
    sockets: Arc<dyn SocketCalls>,
    handler: Arc<dyn PeerHandler>,
    peers: PeerRegistry,
    halted: AtomicBool,
}

#[derive(Debug)]
struct ServerState {
    status: ServerStatus,
    address: SocketAddr,
    detail: Option<String>,
}

/// TCP server that frames requests for a [`PeerHandler`].
pub struct ConnectionServer {
    options: ServerOptions,
    shared: Arc<Shared>,
    pool: Arc<JobPool>,
    listener: Mutex<Option<SocketHandle>>,
    state: Mutex<ServerState>,
    loops: Mutex<Vec<JoinHandle<()>>>,
}

impl ConnectionServer {
    /// Builds a closed server. The worker pool starts immediately.
    #[must_use]
    pub fn new(
        options: ServerOptions,
        sockets: Arc<dyn SocketCalls>,
        handler: Arc<dyn PeerHandler>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                sockets,
                handler,
                peers: PeerRegistry::default(),
                halted: AtomicBool::new(true),
            }),
            pool: Arc::new(JobPool::new(options.threads)),
            listener: Mutex::new(None),
            state: Mutex::new(ServerState {
                status: ServerStatus::Closed,
                address: options.address,
                detail: None,
            }),
            loops: Mutex::new(Vec::new()),
            options,
        }
    }

    /// Builds a server over operating-system sockets.
    #[must_use]
    pub fn system(options: ServerOptions, handler: Arc<dyn PeerHandler>) -> Self {
        Self::new(options, Arc::new(SystemSockets::new()), handler)
    }

    /// Opens the listening socket and launches the loops.
    ///
    /// A running server is stopped first. On failure the server keeps the
    /// matching error status until the next call.
    ///
    /// # Errors
    ///
    /// Returns [`StartError`] when the socket cannot be created, configured,
    /// bound, or put into listening mode, or when a loop thread cannot be
    /// spawned.
    pub fn start(&self) -> Result<(), StartError> {
        if self.status() == ServerStatus::Up {
            self.stop();
        }
        let result = self.open_listener().and_then(|(listener, address)| {
            self.launch(listener).map(|()| address).inspect_err(|_| {
                self.shared.halted.store(true, Ordering::SeqCst);
                self.join_loop();
                if let Some(registered) = self.lock_listener().take() {
                    self.shared.sockets.close(registered);
                }
            })
        });
        let mut state = self.lock_state();
        match result {
            Ok(address) => {
                *state = ServerState {
                    status: ServerStatus::Up,
                    address,
                    detail: None,
                };
                drop(state);
                info!(
                    target: SERVER_TARGET,
                    %address,
                    threads = self.pool.thread_count(),
                    "server listening"
                );
                Ok(())
            }
            Err(error) => {
                *state = ServerState {
                    status: error.status(),
                    address: self.options.address,
                    detail: Some(error.to_string()),
                };
                drop(state);
                warn!(target: SERVER_TARGET, error = %error, "server failed to start");
                Err(error)
            }
        }
    }

    fn open_listener(&self) -> Result<(SocketHandle, SocketAddr), StartError> {
        let address = self.options.address;
        let sockets = self.shared.sockets.as_ref();
        let listener = sockets
            .new_socket(AddressFamily::of(&address))
            .map_err(|source| StartError::Socket { source })?;
        let prepared = sockets
            .set_option(listener, SocketOption::ReuseAddress)
            .map_err(|source| StartError::ReuseAddress { source })
            .and_then(|()| {
                sockets
                    .set_option(listener, SocketOption::NonBlocking(true))
                    .map_err(|source| StartError::Configure { source })
            })
            .and_then(|()| {
                sockets
                    .bind(listener, address)
                    .map_err(|source| StartError::Bind { address, source })
            })
            .and_then(|()| {
                sockets
                    .listen(listener, LISTEN_BACKLOG)
                    .map_err(|source| StartError::Listen { address, source })
            });
        if let Err(error) = prepared {
            sockets.close(listener);
            return Err(error);
        }
        let bound = sockets.local_addr(listener).unwrap_or(address);
        Ok((listener, bound))
    }

    fn launch(&self, listener: SocketHandle) -> Result<(), StartError> {
        if self.pool.thread_count() == 0 || self.pool.is_halted() {
            self.pool.start(self.options.threads);
        }
        *self.lock_listener() = Some(listener);
        self.shared.halted.store(false, Ordering::SeqCst);

        let accept_shared = Arc::clone(&self.shared);
        let keep_alive = self.options.keep_alive;
        let accept = thread::Builder::new()
            .name("keyspace-accept".to_owned())
            .spawn(move || loops::run_accept_loop(&accept_shared, listener, keep_alive))
            .map_err(|source| StartError::Spawn {
                role: "accept",
                source,
            })?;
        self.lock_loops().push(accept);

        let scan_shared = Arc::clone(&self.shared);
        let pool = Arc::clone(&self.pool);
        let scan = thread::Builder::new()
            .name("keyspace-scan".to_owned())
            .spawn(move || loops::run_scan_loop(&scan_shared, &pool))
            .map_err(|source| StartError::Spawn {
                role: "scan",
                source,
            })?;
        self.lock_loops().push(scan);
        Ok(())
    }

    /// Stops the loops, drops queued work, and disconnects every peer.
    pub fn stop(&self) {
        self.shared.halted.store(true, Ordering::SeqCst);
        self.join_loop();
        self.pool.drop_unstarted_jobs();
        if let Some(listener) = self.lock_listener().take() {
            self.shared.sockets.close(listener);
        }
        let peers = self.shared.peers.take_all();
        let count = peers.len();
        for peer in peers {
            peer.finish(self.shared.handler.as_ref());
        }
        let mut state = self.lock_state();
        if state.status == ServerStatus::Up {
            state.status = ServerStatus::Closed;
            state.address = self.options.address;
            drop(state);
            info!(target: SERVER_TARGET, peers = count, "server stopped");
        }
    }

    /// Asks the loops and the pool to stop without waiting for them.
    pub fn halt(&self) {
        self.shared.halted.store(true, Ordering::SeqCst);
        self.pool.halt();
    }

    /// Waits for the loop threads to exit.
    pub fn join_loop(&self) {
        let loops = std::mem::take(&mut *self.lock_loops());
        for handle in loops {
            if handle.join().is_err() {
                warn!(target: SERVER_TARGET, "server loop thread panicked");
            }
        }
    }

    /// Sends `text` to every connected peer.
    pub fn send_data(&self, text: &str) {
        for peer in self.shared.peers.snapshot() {
            if let Err(error) = peer.lock().send_text(text) {
                warn!(target: SERVER_TARGET, error = %error, "broadcast send failed");
            }
        }
    }

    /// Sends `text` to the peer at `host:port`. Returns `false` when no such
    /// peer is registered or the send fails.
    #[must_use]
    pub fn send_data_by(&self, host: IpAddr, port: u16, text: &str) -> bool {
        let Some(peer) = self.shared.peers.find(SocketAddr::new(host, port)) else {
            return false;
        };
        let sent = peer.lock().send_text(text);
        sent.is_ok()
    }

    /// Closes the connection to `host:port`. The scan loop then reports and
    /// removes the peer. Returns `false` for unknown peers.
    #[must_use]
    pub fn disconnect_by(&self, host: IpAddr, port: u16) -> bool {
        let Some(peer) = self.shared.peers.find(SocketAddr::new(host, port)) else {
            return false;
        };
        peer.lock().disconnect();
        true
    }

    /// Closes every peer connection.
    pub fn disconnect_all(&self) {
        for peer in self.shared.peers.snapshot() {
            peer.lock().disconnect();
        }
    }

    /// Opens an outbound connection and registers it like an accepted peer.
    /// Returns `false` when the host cannot be resolved or reached.
    #[must_use]
    pub fn connect_to(&self, host: &str, port: u16) -> bool {
        let Some(address) = (host, port)
            .to_socket_addrs()
            .ok()
            .and_then(|mut addresses| addresses.next())
        else {
            warn!(target: SERVER_TARGET, host, port, "cannot resolve peer address");
            return false;
        };
        let sockets = self.shared.sockets.as_ref();
        let socket = match sockets.new_socket(AddressFamily::of(&address)) {
            Ok(socket) => socket,
            Err(error) => {
                warn!(target: SERVER_TARGET, %address, error = %error, "cannot create peer socket");
                return false;
            }
        };
        let connected = sockets
            .set_option(socket, SocketOption::ReadTimeout(CONNECT_TIMEOUT))
            .and_then(|()| sockets.connect(socket, address));
        if let Err(error) = connected {
            warn!(target: SERVER_TARGET, %address, error = %error, "cannot connect to peer");
            sockets.close(socket);
            return false;
        }
        loops::admit(&self.shared, socket, address, self.options.keep_alive)
    }

    /// Registered peers, including ones awaiting removal.
    #[must_use]
    pub fn peer_count(&self) -> usize {
        self.shared.peers.len()
    }

    /// Bound address while up, otherwise the configured one.
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.lock_state().address
    }

    /// The worker pool running request and disconnect jobs.
    #[must_use]
    pub fn thread_pool(&self) -> &JobPool {
        &self.pool
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn status(&self) -> ServerStatus {
        self.lock_state().status
    }

    /// Human-readable description of [`ConnectionServer::status`].
    #[must_use]
    pub fn explain_status(&self) -> String {
        let state = self.lock_state();
        let detail = state.detail.as_deref().unwrap_or("unknown error");
        match state.status {
            ServerStatus::Up => format!("Socket is up on {}.", state.address),
            ServerStatus::Closed => "Socket is closed.".to_owned(),
            ServerStatus::ErrInit => format!("Error: couldn't initialize a socket ({detail})."),
            ServerStatus::ErrBind => format!("Error: couldn't bind a socket ({detail})."),
            ServerStatus::ErrListen => format!("Error: couldn't listen on a socket ({detail})."),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, ServerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_listener(&self) -> MutexGuard<'_, Option<SocketHandle>> {
        self.listener.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_loops(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.loops.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for ConnectionServer {
    fn drop(&mut self) {
        if self.status() == ServerStatus::Up {
            self.stop();
        }
    }
}
