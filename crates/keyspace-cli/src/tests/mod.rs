//! Client test suites.

mod behaviour;
mod support;
