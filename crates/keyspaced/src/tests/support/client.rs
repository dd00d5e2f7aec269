//! Blocking framed client used by end-to-end scenarios.

use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

use keyspace_net::{decode_text, encode_frame};

const PREFIX_BYTES: usize = 8;

pub struct StoreClient {
    stream: TcpStream,
}

impl StoreClient {
    pub fn connect(address: SocketAddr) -> Self {
        let stream = TcpStream::connect(address).expect("connect to daemon");
        stream
            .set_read_timeout(Some(Duration::from_secs(2)))
            .expect("set read timeout");
        Self { stream }
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.stream.local_addr().expect("client address")
    }

    pub fn send(&mut self, text: &str) {
        self.stream
            .write_all(&encode_frame(text))
            .expect("write request frame");
    }

    #[expect(clippy::little_endian_bytes, reason = "wire format is little-endian")]
    pub fn read(&mut self) -> String {
        let mut prefix = [0_u8; PREFIX_BYTES];
        self.stream
            .read_exact(&mut prefix)
            .expect("read frame prefix");
        let length = usize::try_from(u64::from_le_bytes(prefix)).expect("frame length");
        let mut payload = vec![0_u8; length];
        self.stream
            .read_exact(&mut payload)
            .expect("read frame payload");
        decode_text(&payload)
    }

    /// Sends `text` and returns the single response frame.
    pub fn request(&mut self, text: &str) -> String {
        self.send(text);
        self.read()
    }

    /// True once the server has closed the connection.
    pub fn is_closed(&mut self) -> bool {
        let mut byte = [0_u8; 1];
        match self.stream.read(&mut byte) {
            Ok(read) => read == 0,
            Err(error) => error.kind() == io::ErrorKind::ConnectionReset,
        }
    }
}
