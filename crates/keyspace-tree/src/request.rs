//! Request parsing, selector resolution, and batch fan-out.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use strum::IntoEnumIterator;
use tracing::{debug, warn};

use crate::node::{KeySpaceNode, PendingGuard};
use crate::operation::{self, Operation};
use crate::outcome::Outcome;
use crate::{ROOT_NAME, TREE_TARGET};

const HELP_WORDS: [&str; 2] = ["help", "?"];

/// Lists every operation with its description, sorted by name.
#[must_use]
pub fn help_text() -> String {
    let mut operations: Vec<Operation> = Operation::iter().collect();
    operations.sort_by_key(|operation| <&'static str>::from(*operation));
    let mut lines = vec!["Available requests:".to_owned()];
    lines.extend(
        operations
            .into_iter()
            .map(|operation| format!("    {operation} - {}", operation.description())),
    );
    lines.join("\n")
}

/// Returns true when `text` starts with an operation name or is `help`/`?`.
#[must_use]
pub fn is_request(text: &str) -> bool {
    let trimmed = text.trim();
    if is_help(trimmed) {
        return true;
    }
    let command = trimmed.split_whitespace().next().unwrap_or_default();
    command.parse::<Operation>().is_ok()
}

fn is_help(text: &str) -> bool {
    HELP_WORDS
        .iter()
        .any(|word| text.eq_ignore_ascii_case(word))
}

impl KeySpaceNode {
    /// Parses and executes one request against this node.
    ///
    /// Never panics: a fault inside an operation is reported as an
    /// [`OutcomeKind::Error`](crate::OutcomeKind::Error) outcome.
    #[must_use]
    pub fn handle_request(&self, text: &str) -> Outcome {
        let trimmed = text.trim();
        if is_help(trimmed) {
            return Outcome::info(help_text());
        }
        let (command, rest) = trimmed
            .split_once(char::is_whitespace)
            .unwrap_or((trimmed, ""));
        let Ok(operation) = command.parse::<Operation>() else {
            return Outcome::warning(format!(
                "Incorrect request '{command}'. Read 'help' for the list of accepted requests."
            ));
        };
        let selector: Vec<&str> = rest.split_whitespace().collect();

        let started = Instant::now();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            let _entered = self.enter();
            self.resolve(operation, &selector)
        }))
        .unwrap_or_else(|payload| {
            let detail = panic_detail(payload.as_ref());
            warn!(
                target: TREE_TARGET,
                %operation,
                detail = %detail,
                "request panicked"
            );
            Outcome::error(format!("Request '{operation}' failed: {detail}"))
        });
        debug!(
            target: TREE_TARGET,
            %operation,
            kind = %outcome.kind(),
            elapsed_us = started.elapsed().as_micros(),
            "request handled"
        );
        outcome
    }

    /// Descends along `selector`. The caller is counted on `self`.
    fn resolve(&self, operation: Operation, selector: &[&str]) -> Outcome {
        let Some((segment, rest)) = selector.split_first() else {
            return self.fan_out(operation, None);
        };
        if rest.is_empty() {
            return self.fan_out(operation, Some(*segment));
        }
        let Some(child) = self.counted_child(segment) else {
            return Outcome::error(format!("Object '{segment}' not found."));
        };
        let _entered = PendingGuard::adopt(&child);
        child.resolve(operation, rest)
    }

    fn fan_out(&self, operation: Operation, leaves: Option<&str>) -> Outcome {
        let items: Vec<&str> = leaves
            .unwrap_or_default()
            .split(',')
            .filter(|item| !item.is_empty())
            .collect();
        if items.is_empty() {
            return operation.apply(self, "");
        }
        if items.contains(&ROOT_NAME) {
            return operation::reserved_name();
        }
        Outcome::batch(
            items
                .into_iter()
                .map(|item| operation.apply(self, item))
                .collect(),
        )
    }
}

fn panic_detail(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| (*message).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unexpected internal fault".to_owned())
}
