//! Test doubles shared by the networking unit tests.

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crate::frame::{FramedConnection, PREFIX_BYTES, decode_text, encode_frame};
use crate::server::PeerHandler;

/// Handler that greets, echoes each frame, and closes on `bye`.
#[derive(Default)]
pub(crate) struct EchoHandler {
    pub(crate) connects: AtomicUsize,
    pub(crate) disconnects: AtomicUsize,
    pub(crate) received: Mutex<Vec<String>>,
}

impl EchoHandler {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn received(&self) -> Vec<String> {
        self.received.lock().expect("received log").clone()
    }
}

impl PeerHandler for EchoHandler {
    fn on_connect(&self, peer: &mut FramedConnection) {
        self.connects.fetch_add(1, Ordering::SeqCst);
        peer.send_text("hello").expect("send greeting");
    }

    fn on_data(&self, payload: &[u8], peer: &mut FramedConnection) {
        let text = decode_text(payload);
        self.received.lock().expect("received log").push(text.clone());
        if text == "bye" {
            peer.disconnect();
            return;
        }
        if text == "slow" {
            thread::sleep(Duration::from_millis(100));
        }
        peer.send_text(&format!("echo: {text}")).expect("send echo");
    }

    fn on_disconnect(&self, _peer: &FramedConnection) {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
    }
}

pub(crate) fn wait_for_count(count: &AtomicUsize, expected: usize) -> bool {
    wait_until(|| count.load(Ordering::SeqCst) >= expected)
}

pub(crate) fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    false
}

/// Blocking client used to talk to a running server.
pub(crate) struct TestClient {
    stream: TcpStream,
}

impl TestClient {
    pub(crate) fn connect(address: SocketAddr) -> Self {
        let stream = TcpStream::connect(address).expect("connect to server");
        stream
            .set_read_timeout(Some(Duration::from_secs(2)))
            .expect("set read timeout");
        Self { stream }
    }

    pub(crate) fn send(&mut self, text: &str) {
        self.stream
            .write_all(&encode_frame(text))
            .expect("write frame");
    }

    #[expect(clippy::little_endian_bytes, reason = "wire format is little-endian")]
    pub(crate) fn read(&mut self) -> String {
        let mut prefix = [0_u8; PREFIX_BYTES];
        self.stream.read_exact(&mut prefix).expect("read prefix");
        let length = usize::try_from(u64::from_le_bytes(prefix)).expect("frame length");
        let mut payload = vec![0_u8; length];
        self.stream.read_exact(&mut payload).expect("read payload");
        decode_text(&payload)
    }

    pub(crate) fn local_addr(&self) -> SocketAddr {
        self.stream.local_addr().expect("client address")
    }
}
