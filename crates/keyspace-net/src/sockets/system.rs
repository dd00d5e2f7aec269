//! [`SocketCalls`] backed by operating-system sockets through `socket2`.

use std::collections::HashMap;
use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use keyspace_config::KeepAliveConfig;
use socket2::{Domain, Protocol, SockAddr, Socket, TcpKeepalive, Type};

use super::{AddressFamily, Received, SocketCalls, SocketHandle, SocketOption};

const SEND_WAIT: Duration = Duration::from_millis(50);

/// Longest a single [`SocketCalls::send`] may wait for a peer to drain its
/// receive buffer.
pub const SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Operating-system sockets addressed by [`SocketHandle`].
#[derive(Debug)]
pub struct SystemSockets {
    sockets: Mutex<HashMap<SocketHandle, Arc<Socket>>>,
    next: AtomicU64,
    send_timeout: Duration,
}

impl Default for SystemSockets {
    fn default() -> Self {
        Self::with_send_timeout(SEND_TIMEOUT)
    }
}

impl SystemSockets {
    /// Creates an empty socket table with the default send deadline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty socket table whose sends give up after `timeout`
    /// without progress on a full send buffer.
    #[must_use]
    pub fn with_send_timeout(timeout: Duration) -> Self {
        Self {
            sockets: Mutex::default(),
            next: AtomicU64::new(0),
            send_timeout: timeout,
        }
    }

    fn register(&self, socket: Socket) -> SocketHandle {
        let handle = SocketHandle::new(self.next.fetch_add(1, Ordering::Relaxed));
        self.lock().insert(handle, Arc::new(socket));
        handle
    }

    fn get(&self, handle: SocketHandle) -> io::Result<Arc<Socket>> {
        self.lock().get(&handle).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("unknown socket handle {handle}"),
            )
        })
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<SocketHandle, Arc<Socket>>> {
        self.sockets.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SocketCalls for SystemSockets {
    fn new_socket(&self, family: AddressFamily) -> io::Result<SocketHandle> {
        let domain = match family {
            AddressFamily::V4 => Domain::IPV4,
            AddressFamily::V6 => Domain::IPV6,
        };
        let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;
        Ok(self.register(socket))
    }

    fn set_option(&self, socket: SocketHandle, option: SocketOption) -> io::Result<()> {
        let target = self.get(socket)?;
        match option {
            SocketOption::ReuseAddress => target.set_reuse_address(true),
            SocketOption::NonBlocking(enabled) => target.set_nonblocking(enabled),
            SocketOption::KeepAlive(config) => {
                target.set_keepalive(true)?;
                target.set_tcp_keepalive(&keepalive_params(config))
            }
            SocketOption::ReadTimeout(timeout) => target.set_read_timeout(Some(timeout)),
        }
    }

    fn bind(&self, socket: SocketHandle, address: SocketAddr) -> io::Result<()> {
        self.get(socket)?.bind(&SockAddr::from(address))
    }

    fn listen(&self, socket: SocketHandle, backlog: i32) -> io::Result<()> {
        self.get(socket)?.listen(backlog)
    }

    fn accept(&self, socket: SocketHandle) -> io::Result<Option<(SocketHandle, SocketAddr)>> {
        let listener = self.get(socket)?;
        match listener.accept() {
            Ok((accepted, address)) => {
                let remote = address.as_socket().ok_or_else(|| {
                    io::Error::new(io::ErrorKind::InvalidData, "accepted a non-IP peer")
                })?;
                Ok(Some((self.register(accepted), remote)))
            }
            Err(error)
                if matches!(
                    error.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
                ) =>
            {
                Ok(None)
            }
            Err(error) => Err(error),
        }
    }

    fn connect(&self, socket: SocketHandle, address: SocketAddr) -> io::Result<()> {
        self.get(socket)?.connect(&SockAddr::from(address))
    }

    fn send(&self, socket: SocketHandle, bytes: &[u8]) -> io::Result<()> {
        let target = self.get(socket)?;
        let deadline = Instant::now() + self.send_timeout;
        let mut remaining = bytes;
        while !remaining.is_empty() {
            match (&*target).write(remaining) {
                Ok(0) => return Err(io::ErrorKind::WriteZero.into()),
                Ok(written) => remaining = remaining.get(written..).unwrap_or_default(),
                Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
                Err(error) if error.kind() == io::ErrorKind::WouldBlock => {
                    let left = deadline.saturating_duration_since(Instant::now());
                    if left.is_zero() {
                        return Err(io::Error::new(
                            io::ErrorKind::TimedOut,
                            "peer stopped draining its receive buffer",
                        ));
                    }
                    wait_writable(&target, left.min(SEND_WAIT))?;
                }
                Err(error) => return Err(error),
            }
        }
        Ok(())
    }

    fn receive(&self, socket: SocketHandle, max: usize, nonblocking: bool) -> Received {
        let Ok(source) = self.get(socket) else {
            return Received::Disconnected;
        };
        if source.set_nonblocking(nonblocking).is_err() {
            return Received::Disconnected;
        }
        let mut buffer = vec![0_u8; max];
        match (&*source).read(&mut buffer) {
            Ok(0) => Received::Disconnected,
            Ok(read) => {
                buffer.truncate(read);
                Received::Data(buffer)
            }
            Err(error)
                if matches!(
                    error.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
                ) =>
            {
                Received::Again
            }
            Err(_) => Received::Disconnected,
        }
    }

    fn shutdown(&self, socket: SocketHandle) -> io::Result<()> {
        self.get(socket)?.shutdown(Shutdown::Both)
    }

    fn close(&self, socket: SocketHandle) {
        self.lock().remove(&socket);
    }

    fn poll_readable(&self, socket: SocketHandle, timeout: Duration) -> io::Result<bool> {
        let target = self.get(socket)?;
        poll(&target, Interest::Read, timeout)
    }

    fn local_addr(&self, socket: SocketHandle) -> io::Result<SocketAddr> {
        ip_address(&self.get(socket)?.local_addr()?)
    }

    fn peer_addr(&self, socket: SocketHandle) -> io::Result<SocketAddr> {
        ip_address(&self.get(socket)?.peer_addr()?)
    }
}

fn ip_address(address: &SockAddr) -> io::Result<SocketAddr> {
    address
        .as_socket()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "not an IP socket address"))
}

#[cfg(any(
    target_os = "linux",
    target_os = "android",
    target_os = "freebsd",
    target_os = "macos"
))]
fn keepalive_params(config: KeepAliveConfig) -> TcpKeepalive {
    TcpKeepalive::new()
        .with_time(config.idle())
        .with_interval(config.interval())
        .with_retries(config.count)
}

#[cfg(not(any(
    target_os = "linux",
    target_os = "android",
    target_os = "freebsd",
    target_os = "macos"
)))]
fn keepalive_params(config: KeepAliveConfig) -> TcpKeepalive {
    TcpKeepalive::new().with_time(config.idle())
}

fn wait_writable(socket: &Socket, timeout: Duration) -> io::Result<()> {
    poll(socket, Interest::Write, timeout).map(|_| ())
}

#[derive(Clone, Copy)]
enum Interest {
    Read,
    Write,
}

#[cfg(unix)]
fn poll(socket: &Socket, interest: Interest, timeout: Duration) -> io::Result<bool> {
    use std::os::fd::AsRawFd;

    let events = match interest {
        Interest::Read => libc::POLLIN,
        Interest::Write => libc::POLLOUT,
    };
    let mut descriptor = libc::pollfd {
        fd: socket.as_raw_fd(),
        events,
        revents: 0,
    };
    let millis = libc::c_int::try_from(timeout.as_millis()).unwrap_or(libc::c_int::MAX);
    let ready = unsafe { libc::poll(&mut descriptor, 1, millis) };
    match ready {
        -1 => {
            let error = io::Error::last_os_error();
            if error.kind() == io::ErrorKind::Interrupted {
                Ok(false)
            } else {
                Err(error)
            }
        }
        0 => Ok(false),
        _ => Ok(descriptor.revents != 0),
    }
}

#[cfg(not(unix))]
fn poll(_socket: &Socket, _interest: Interest, timeout: Duration) -> io::Result<bool> {
    std::thread::sleep(timeout.min(Duration::from_millis(5)));
    Ok(true)
}
