//! Single-connection TCP server speaking the frame protocol.

use std::io::{Read, Write};
use std::net::{Ipv4Addr, SocketAddr, TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use keyspace_net::{DISCONNECT_TOKEN, decode_text, encode_frame};

const PREFIX_BYTES: usize = 8;

/// Accepts one client, greets it, and answers each frame with
/// `echo: <text>` until the disconnect token or end of stream.
pub struct FakeServer {
    address: SocketAddr,
    received: Arc<Mutex<Vec<String>>>,
    handle: Option<JoinHandle<()>>,
}

impl FakeServer {
    pub fn greeting(greeting: &'static str) -> Self {
        Self::spawn(Some(greeting))
    }

    /// Accepts and immediately closes the connection.
    pub fn hanging_up() -> Self {
        Self::spawn(None)
    }

    fn spawn(greeting: Option<&'static str>) -> Self {
        let listener =
            TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).expect("bind fake server");
        let address = listener.local_addr().expect("fake server address");
        let received = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&received);
        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().expect("accept client");
            if let Some(text) = greeting {
                serve(stream, text, &log);
            }
        });
        Self {
            address,
            received,
            handle: Some(handle),
        }
    }

    pub fn address(&self) -> SocketAddr {
        self.address
    }

    pub fn port_argument(&self) -> String {
        self.address.port().to_string()
    }

    /// Waits for the connection to finish and returns every received frame.
    pub fn finish(mut self) -> Vec<String> {
        if let Some(handle) = self.handle.take() {
            handle.join().expect("fake server thread");
        }
        self.received.lock().expect("received frames").clone()
    }
}

fn serve(mut stream: TcpStream, greeting: &str, received: &Mutex<Vec<String>>) {
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .expect("set read timeout");
    write_frame(&mut stream, greeting);
    while let Some(text) = read_frame(&mut stream) {
        received.lock().expect("received frames").push(text.clone());
        if text == DISCONNECT_TOKEN {
            break;
        }
        write_frame(&mut stream, &format!("echo: {text}"));
    }
}

fn write_frame(stream: &mut TcpStream, text: &str) {
    stream
        .write_all(&encode_frame(text))
        .expect("write frame to client");
}

#[expect(clippy::little_endian_bytes, reason = "wire format is little-endian")]
fn read_frame(stream: &mut TcpStream) -> Option<String> {
    let mut prefix = [0_u8; PREFIX_BYTES];
    stream.read_exact(&mut prefix).ok()?;
    let length = usize::try_from(u64::from_le_bytes(prefix)).ok()?;
    let mut payload = vec![0_u8; length];
    stream.read_exact(&mut payload).ok()?;
    Some(decode_text(&payload))
}

/// A loopback address with nothing listening on it.
pub fn unused_address() -> SocketAddr {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).expect("reserve a port");
    listener.local_addr().expect("reserved address")
}
