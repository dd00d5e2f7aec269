//! Framed connection to a key-space server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use keyspace_net::{
    AddressFamily, DISCONNECT_TOKEN, FramedConnection, SocketCalls, SystemSockets,
};

use crate::AppError;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// One client connection. Responses are read in blocking fashion.
pub struct Session {
    sockets: Arc<dyn SocketCalls>,
    connection: FramedConnection,
}

impl Session {
    /// Connects to `address` through operating-system sockets.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Connect`] when the server cannot be reached.
    pub fn connect(address: SocketAddr) -> Result<Self, AppError> {
        Self::connect_with(Arc::new(SystemSockets::new()), address)
    }

    /// Connects through `sockets`. The socket is released if the connection
    /// cannot be established.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Connect`] when socket creation or the connect call
    /// fails.
    pub fn connect_with(
        sockets: Arc<dyn SocketCalls>,
        address: SocketAddr,
    ) -> Result<Self, AppError> {
        let socket = sockets
            .new_socket(AddressFamily::of(&address))
            .map_err(|source| AppError::Connect { address, source })?;
        if let Err(source) = sockets.connect(socket, address) {
            sockets.close(socket);
            return Err(AppError::Connect { address, source });
        }
        let connection = FramedConnection::new(Arc::clone(&sockets), socket, address);
        Ok(Self {
            sockets,
            connection,
        })
    }

    /// True until either side disconnects.
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    /// Waits for the next frame. Returns `None` once the server has closed
    /// the connection.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Receive`] when polling the socket fails.
    pub fn next_text(&mut self) -> Result<Option<String>, AppError> {
        loop {
            if let Some(text) = self.connection.receive_text() {
                return Ok(Some(text));
            }
            if !self.connection.is_connected() {
                return Ok(None);
            }
            self.sockets
                .poll_readable(self.connection.socket(), POLL_INTERVAL)
                .map_err(AppError::Receive)?;
        }
    }

    /// Sends one request frame.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Send`] when the frame cannot be written.
    pub fn send(&mut self, text: &str) -> Result<(), AppError> {
        self.connection.send_text(text)?;
        Ok(())
    }

    /// Sends the disconnect token and closes the connection.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Send`] when the token cannot be written. The
    /// connection is closed either way.
    pub fn close(&mut self) -> Result<(), AppError> {
        let sent = self.connection.send_text(DISCONNECT_TOKEN);
        self.connection.disconnect();
        sent.map_err(AppError::from)
    }
}
