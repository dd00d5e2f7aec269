//! Test suites for the key-space tree.

mod concurrency;
