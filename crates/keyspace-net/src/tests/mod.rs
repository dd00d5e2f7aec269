//! Test suites for the connection engine.
