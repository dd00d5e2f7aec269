//! Typed results of tree operations.

use std::fmt;

use strum::{Display, EnumString, IntoStaticStr};

/// Classification attached to every [`Outcome`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum OutcomeKind {
    /// Untagged text.
    None,
    /// The operation succeeded.
    Ok,
    /// The request was understood but had no effect.
    Warning,
    /// The request failed and the tree is unchanged.
    Error,
    /// Informational text such as the help listing.
    Info,
}

impl OutcomeKind {
    const fn severity(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Info => 1,
            Self::Ok => 2,
            Self::Warning => 3,
            Self::Error => 4,
        }
    }

    /// Returns whichever of the two kinds is more severe.
    #[must_use]
    pub const fn most_severe(self, other: Self) -> Self {
        if other.severity() > self.severity() {
            other
        } else {
            self
        }
    }
}

/// Result of a tree operation: a kind plus human-readable text.
///
/// A batch outcome carries the most severe kind of its items but renders
/// bare, because each item line already starts with its own kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    kind: OutcomeKind,
    message: String,
    tagged: bool,
}

impl Outcome {
    /// Builds an outcome from its parts.
    #[must_use]
    pub fn new(kind: OutcomeKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            tagged: true,
        }
    }

    /// An [`OutcomeKind::Ok`] outcome.
    #[must_use]
    pub fn ok(message: impl Into<String>) -> Self {
        Self::new(OutcomeKind::Ok, message)
    }

    /// An [`OutcomeKind::Warning`] outcome.
    #[must_use]
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(OutcomeKind::Warning, message)
    }

    /// An [`OutcomeKind::Error`] outcome.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(OutcomeKind::Error, message)
    }

    /// An [`OutcomeKind::Info`] outcome.
    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(OutcomeKind::Info, message)
    }

    /// Combines the outcomes of a comma-separated batch.
    ///
    /// A single item is returned unchanged. Otherwise the rendered items are
    /// joined one per line, the batch takes the most severe item kind, and
    /// the batch itself renders without a kind prefix.
    #[must_use]
    pub fn batch(mut items: Vec<Self>) -> Self {
        if items.len() == 1 {
            return items.remove(0);
        }
        let most_severe = items
            .iter()
            .fold(OutcomeKind::None, |severest, item| {
                severest.most_severe(item.kind)
            });
        let message = items
            .iter()
            .map(Self::render)
            .collect::<Vec<_>>()
            .join("\n");
        Self {
            kind: most_severe,
            message,
            tagged: false,
        }
    }

    /// Classification of the outcome; for a batch, its most severe item.
    #[must_use]
    pub const fn kind(&self) -> OutcomeKind {
        self.kind
    }

    /// Text without the kind prefix.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Renders the outcome as sent on the wire: `"<kind>: <message>"`, or
    /// the bare message for untagged text and batches.
    #[must_use]
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.tagged || self.kind == OutcomeKind::None {
            return f.write_str(&self.message);
        }
        write!(f, "{}: {}", self.kind, self.message)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(OutcomeKind::Ok, "ok: done")]
    #[case(OutcomeKind::Warning, "warning: done")]
    #[case(OutcomeKind::Error, "error: done")]
    #[case(OutcomeKind::Info, "info: done")]
    #[case(OutcomeKind::None, "done")]
    fn renders_kind_prefix(#[case] kind: OutcomeKind, #[case] expected: &str) {
        assert_eq!(Outcome::new(kind, "done").render(), expected);
    }

    #[test]
    fn batch_takes_most_severe_kind() {
        let combined = Outcome::batch(vec![
            Outcome::ok("first"),
            Outcome::error("second"),
            Outcome::warning("third"),
        ]);
        assert_eq!(combined.kind(), OutcomeKind::Error);
        assert_eq!(
            combined.message(),
            "ok: first\nerror: second\nwarning: third"
        );
    }

    #[test]
    fn batch_renders_without_an_outer_prefix() {
        let combined = Outcome::batch(vec![Outcome::ok("first"), Outcome::warning("second")]);
        assert_eq!(combined.kind(), OutcomeKind::Warning);
        assert_eq!(combined.render(), "ok: first\nwarning: second");
    }

    #[test]
    fn single_item_batch_is_unchanged() {
        let single = Outcome::warning("only");
        assert_eq!(Outcome::batch(vec![single.clone()]), single);
    }

    #[test]
    fn ok_outranks_info() {
        assert_eq!(
            OutcomeKind::Info.most_severe(OutcomeKind::Ok),
            OutcomeKind::Ok
        );
        assert_eq!(
            OutcomeKind::Ok.most_severe(OutcomeKind::Info),
            OutcomeKind::Ok
        );
    }
}
