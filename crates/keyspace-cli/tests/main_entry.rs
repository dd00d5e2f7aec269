//! Integration tests for the `keyspace` binary entry point.

use std::net::{Ipv4Addr, TcpListener};

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::str::contains;

#[test]
fn help_lists_the_connection_flags() {
    let mut command = cargo_bin_cmd!("keyspace");
    command.arg("--help");
    command
        .assert()
        .success()
        .stdout(contains("--host"))
        .stdout(contains("--port"));
}

#[test]
fn unreachable_server_exits_with_failure() {
    let port = TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
        .and_then(|listener| listener.local_addr())
        .expect("reserve a port")
        .port();
    let mut command = cargo_bin_cmd!("keyspace");
    command
        .args(["--host", "127.0.0.1", "--port", &port.to_string()])
        .write_stdin("get\n");
    command
        .assert()
        .failure()
        .stderr(contains("couldn't connect to the server"));
}
