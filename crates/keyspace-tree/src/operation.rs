//! The seven tree operations and their per-item semantics.

use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::ROOT_NAME;
use crate::node::{KeySpaceNode, PendingGuard};
use crate::outcome::Outcome;

/// Error returned when a command word names no operation.
pub type OperationParseError = strum::ParseError;

const INDENT: &str = "  ";

/// A command understood by [`KeySpaceNode::handle_request`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumString, IntoStaticStr,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Operation {
    /// Creates children.
    Set,
    /// Lists immediate children.
    Get,
    /// Lists a whole subtree, indented by depth.
    Tree,
    /// Prints `set` requests that rebuild a subtree.
    Export,
    /// Tests whether a child exists.
    Check,
    /// Detaches and destroys a child.
    Remove,
    /// Drops every child of the target.
    Clear,
}

impl Operation {
    /// One-line description shown by `help`.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Set => "set [selector] creates objects under the selected object.",
            Self::Get => "get [selector] lists the children of the selected object.",
            Self::Tree => "tree [selector] shows the entire subtree of the selected object.",
            Self::Export => {
                "export [selector] prints the requests that rebuild the selected subtree."
            }
            Self::Check => "check [selector] checks whether the object exists now.",
            Self::Remove => "remove [selector] deletes the object and everything below it.",
            Self::Clear => "clear [selector] removes every child of the selected object.",
        }
    }

    /// Applies the operation to one leaf argument at `node`.
    ///
    /// The calling request must be counted on `node`.
    pub(crate) fn apply(self, node: &KeySpaceNode, argument: &str) -> Outcome {
        match self {
            Self::Set => set(node, argument),
            Self::Get => get(node, argument),
            Self::Tree => tree(node, argument),
            Self::Export => export(node, argument),
            Self::Check => check(node, argument),
            Self::Remove => remove(node, argument),
            Self::Clear => clear(node, argument),
        }
    }
}

pub(crate) fn reserved_name() -> Outcome {
    Outcome::error(format!("You cannot name an object '{ROOT_NAME}'."))
}

fn missing_name() -> Outcome {
    Outcome::error("Please specify the name of the object.")
}

fn not_present(node: &KeySpaceNode, name: &str) -> Outcome {
    Outcome::error(format!(
        "Object '{name}' is not present in '{}'.",
        node.name()
    ))
}

fn set(node: &KeySpaceNode, name: &str) -> Outcome {
    if name.is_empty() {
        return missing_name();
    }
    if name.contains(',') {
        return Outcome::error(format!("Object name cannot contain a comma: '{name}'."));
    }
    if name == ROOT_NAME {
        return reserved_name();
    }
    node.insert_child(name)
}

fn get(node: &KeySpaceNode, name: &str) -> Outcome {
    with_target(node, name, |target| Outcome::ok(list_children(target)))
}

fn tree(node: &KeySpaceNode, name: &str) -> Outcome {
    if name.is_empty() {
        let mut lines = Vec::new();
        write_tree(node, 0, &mut lines);
        return Outcome::ok(lines.join("\n"));
    }
    with_target(node, name, |target| {
        let mut lines = vec![format!("{name}:")];
        write_tree(target, 1, &mut lines);
        Outcome::ok(lines.join("\n"))
    })
}

fn export(node: &KeySpaceNode, name: &str) -> Outcome {
    if name.is_empty() {
        let mut lines = Vec::new();
        write_export(node, "", &mut lines);
        return Outcome::ok(lines.join("\n"));
    }
    with_target(node, name, |target| {
        let mut lines = vec![format!("set {name}")];
        write_export(target, name, &mut lines);
        Outcome::ok(lines.join("\n"))
    })
}

fn check(node: &KeySpaceNode, name: &str) -> Outcome {
    if name.is_empty() {
        return missing_name();
    }
    if node.child(name).is_some() {
        Outcome::ok(format!("Object '{name}' is present in '{}'.", node.name()))
    } else {
        Outcome::warning(format!(
            "Object '{name}' is not present in '{}'.",
            node.name()
        ))
    }
}

fn remove(node: &KeySpaceNode, name: &str) -> Outcome {
    if name.is_empty() {
        return missing_name();
    }
    if node.detach_child(name).is_some() {
        Outcome::ok(format!("Object '{name}' was successfully removed."))
    } else {
        not_present(node, name)
    }
}

fn clear(node: &KeySpaceNode, name: &str) -> Outcome {
    if name.is_empty() {
        node.clear_counted_self();
        return Outcome::ok(format!(
            "Object '{}' was successfully cleared.",
            node.name()
        ));
    }
    if node.clear_child(name) {
        Outcome::ok(format!("Object '{name}' was successfully cleared."))
    } else {
        not_present(node, name)
    }
}

/// Runs `action` on `node` itself for an empty name, otherwise on the
/// counted child `name`.
fn with_target(
    node: &KeySpaceNode,
    name: &str,
    action: impl FnOnce(&KeySpaceNode) -> Outcome,
) -> Outcome {
    if name.is_empty() {
        return action(node);
    }
    let Some(child) = node.counted_child(name) else {
        return not_present(node, name);
    };
    let _entered = PendingGuard::adopt(&child);
    action(&child)
}

fn list_children(node: &KeySpaceNode) -> String {
    let names = node.child_names();
    if names.is_empty() {
        return "Objects: 0\n[]".to_owned();
    }
    let mut lines = Vec::with_capacity(names.len() + 3);
    lines.push(format!("Objects: {}", names.len()));
    lines.push("[".to_owned());
    lines.extend(names.iter().map(|name| format!("   {name},")));
    lines.push("]".to_owned());
    lines.join("\n")
}

fn write_tree(node: &KeySpaceNode, depth: usize, lines: &mut Vec<String>) {
    let children = node.counted_children();
    let _entered: Vec<PendingGuard<'_>> = children
        .iter()
        .map(|child| PendingGuard::adopt(child))
        .collect();
    for child in &children {
        lines.push(format!("{}{}:", INDENT.repeat(depth), child.name()));
        write_tree(child, depth + 1, lines);
    }
}

fn write_export(node: &KeySpaceNode, path: &str, lines: &mut Vec<String>) {
    let children = node.counted_children();
    let _entered: Vec<PendingGuard<'_>> = children
        .iter()
        .map(|child| PendingGuard::adopt(child))
        .collect();
    if children.is_empty() {
        return;
    }
    let names = children
        .iter()
        .map(|child| child.name())
        .collect::<Vec<_>>()
        .join(",");
    if path.is_empty() {
        lines.push(format!("set {names}"));
    } else {
        lines.push(format!("set {path} {names}"));
    }
    for child in &children {
        let child_path = if path.is_empty() {
            child.name().to_owned()
        } else {
            format!("{path} {}", child.name())
        };
        write_export(child, &child_path, lines);
    }
}
