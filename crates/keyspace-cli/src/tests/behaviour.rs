//! Behaviour scenarios for interactive client sessions.

use std::cell::RefCell;
use std::io::Cursor;
use std::net::SocketAddr;
use std::process::ExitCode;

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

use crate::run;

use super::support::{FakeServer, unused_address};

#[derive(Default)]
struct ClientWorld {
    server: Option<FakeServer>,
    address: Option<SocketAddr>,
    exit: Option<ExitCode>,
    stdout: String,
    stderr: String,
    received: Vec<String>,
}

#[fixture]
fn world() -> RefCell<ClientWorld> {
    RefCell::new(ClientWorld::default())
}

/// Input scripts use `;` between lines.
fn script_lines(script: &str) -> String {
    script.split(';').map(|line| format!("{line}\n")).collect()
}

fn run_client(world: &RefCell<ClientWorld>, script: &str) {
    let mut state = world.borrow_mut();
    let address = state.address.expect("a server address should be chosen");
    let port = address.port().to_string();
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let exit = run(
        ["keyspace", "--host", "127.0.0.1", "--port", port.as_str()],
        Cursor::new(script.to_owned()),
        &mut stdout,
        &mut stderr,
        false,
    );
    state.exit = Some(exit);
    state.stdout = String::from_utf8(stdout).expect("utf-8 stdout");
    state.stderr = String::from_utf8(stderr).expect("utf-8 stderr");
    if let Some(server) = state.server.take() {
        state.received = server.finish();
    }
}

#[given("a key-space server that echoes requests")]
fn given_echo_server(world: &RefCell<ClientWorld>) {
    let server = FakeServer::greeting("info: Welcome!");
    let mut state = world.borrow_mut();
    state.address = Some(server.address());
    state.server = Some(server);
}

#[given("no key-space server is listening")]
fn given_no_server(world: &RefCell<ClientWorld>) {
    world.borrow_mut().address = Some(unused_address());
}

#[when("the client runs with input \"{script}\"")]
fn when_client_runs(world: &RefCell<ClientWorld>, script: String) {
    run_client(world, &script_lines(&script));
}

#[when("the client runs with no input")]
fn when_client_runs_without_input(world: &RefCell<ClientWorld>) {
    run_client(world, "");
}

#[then("the client exits successfully")]
fn then_client_succeeds(world: &RefCell<ClientWorld>) {
    assert_eq!(world.borrow().exit, Some(ExitCode::SUCCESS));
}

#[then("the client exits with a failure")]
fn then_client_fails(world: &RefCell<ClientWorld>) {
    assert_eq!(world.borrow().exit, Some(ExitCode::FAILURE));
}

#[then("the output contains \"{fragment}\"")]
fn then_output_contains(world: &RefCell<ClientWorld>, fragment: String) {
    let state = world.borrow();
    assert!(
        state.stdout.contains(&fragment),
        "expected '{fragment}' in:\n{}",
        state.stdout
    );
}

#[then("the errors contain \"{fragment}\"")]
fn then_errors_contain(world: &RefCell<ClientWorld>, fragment: String) {
    let state = world.borrow();
    assert!(
        state.stderr.contains(&fragment),
        "expected '{fragment}' in:\n{}",
        state.stderr
    );
}

#[then("the server received \"{frames}\"")]
fn then_server_received(world: &RefCell<ClientWorld>, frames: String) {
    let expected: Vec<&str> = frames.split(';').collect();
    assert_eq!(world.borrow().received, expected);
}

#[scenario(
    path = "tests/features/client_session.feature",
    name = "Requests are relayed until the user exits"
)]
fn requests_are_relayed_until_exit(#[from(world)] world: RefCell<ClientWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/client_session.feature",
    name = "End of input disconnects from the server"
)]
fn end_of_input_disconnects(#[from(world)] world: RefCell<ClientWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/client_session.feature",
    name = "An unreachable server is reported"
)]
fn unreachable_server_is_reported(#[from(world)] world: RefCell<ClientWorld>) {
    drop(world);
}
