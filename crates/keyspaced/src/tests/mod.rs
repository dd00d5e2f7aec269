//! Test suites for the key-space daemon.

mod handler;
mod support;
