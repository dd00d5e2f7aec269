//! Doubles for the client test suites.

mod fake_server;

pub use fake_server::{FakeServer, unused_address};
