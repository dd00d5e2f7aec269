//! Scriptable socket layer for tests that drive [`SocketCalls`] directly.
//!
//! Enabled for this crate's own tests and, for downstream crates, through
//! the `test-support` feature.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use mockall::mock;

use crate::sockets::{AddressFamily, Received, SocketCalls, SocketHandle, SocketOption};

mock! {
    /// Mock [`SocketCalls`] implementation; script each call with the
    /// generated `expect_*` methods.
    pub Sockets {}
    impl SocketCalls for Sockets {
        fn new_socket(&self, family: AddressFamily) -> io::Result<SocketHandle>;
        fn set_option(&self, socket: SocketHandle, option: SocketOption) -> io::Result<()>;
        fn bind(&self, socket: SocketHandle, address: SocketAddr) -> io::Result<()>;
        fn listen(&self, socket: SocketHandle, backlog: i32) -> io::Result<()>;
        fn accept(&self, socket: SocketHandle) -> io::Result<Option<(SocketHandle, SocketAddr)>>;
        fn connect(&self, socket: SocketHandle, address: SocketAddr) -> io::Result<()>;
        fn send(&self, socket: SocketHandle, bytes: &[u8]) -> io::Result<()>;
        fn receive(&self, socket: SocketHandle, max: usize, nonblocking: bool) -> Received;
        fn shutdown(&self, socket: SocketHandle) -> io::Result<()>;
        fn close(&self, socket: SocketHandle);
        fn poll_readable(&self, socket: SocketHandle, timeout: Duration) -> io::Result<bool>;
        fn local_addr(&self, socket: SocketHandle) -> io::Result<SocketAddr>;
        fn peer_addr(&self, socket: SocketHandle) -> io::Result<SocketAddr>;
    }
}
