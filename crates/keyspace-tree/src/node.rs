//! Tree nodes, the pending counter, and the quiescence wait.
//!
//! Locking rules:
//!
//! - a node's `children` mutex guards only its own map and is never held
//!   across a descent into a child;
//! - a child's pending counter is incremented while the parent's lock is
//!   held, so a destructive operation holding that lock sees every request
//!   that has already entered the child;
//! - the only place two node locks are held together is `remove`/`clear` of
//!   a child, which takes the child's lock under the parent's after the
//!   child has become quiescent.

use std::collections::BTreeMap;
use std::mem;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, Weak};

use crate::ROOT_NAME;
use crate::outcome::Outcome;

type Children = BTreeMap<String, Arc<KeySpaceNode>>;

/// One entry in the key-space tree.
///
/// Parents own children through [`Arc`]; children refer back through a
/// [`Weak`] handle, so the tree holds no strong cycles.
#[derive(Debug)]
pub struct KeySpaceNode {
    name: String,
    this: Weak<KeySpaceNode>,
    parent: Weak<KeySpaceNode>,
    children: Mutex<Children>,
    pending: AtomicUsize,
    quiet: Mutex<()>,
    quiet_signal: Condvar,
}

impl KeySpaceNode {
    /// Creates the root of a new, empty tree.
    #[must_use]
    pub fn root() -> Arc<Self> {
        Self::with_parent(ROOT_NAME, Weak::new())
    }

    fn with_parent(name: &str, parent: Weak<Self>) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            name: name.to_owned(),
            this: this.clone(),
            parent,
            children: Mutex::new(BTreeMap::new()),
            pending: AtomicUsize::new(0),
            quiet: Mutex::new(()),
            quiet_signal: Condvar::new(),
        })
    }

    /// Name of this node; the root carries [`ROOT_NAME`].
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The owning parent, if it is still alive. The root has none.
    #[must_use]
    pub fn parent(&self) -> Option<Arc<Self>> {
        self.parent.upgrade()
    }

    /// Number of in-flight operations currently counted on this node.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Number of immediate children.
    #[must_use]
    pub fn child_count(&self) -> usize {
        self.lock_children().len()
    }

    /// Names of the immediate children in lexicographic order.
    #[must_use]
    pub fn child_names(&self) -> Vec<String> {
        self.lock_children().keys().cloned().collect()
    }

    /// Looks up an immediate child without counting on it.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<Arc<Self>> {
        self.lock_children().get(name).cloned()
    }

    pub(crate) fn lock_children(&self) -> MutexGuard<'_, Children> {
        self.children
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Counts a request on this node until the returned guard drops.
    pub(crate) fn enter(&self) -> PendingGuard<'_> {
        self.pending.fetch_add(1, Ordering::SeqCst);
        PendingGuard { node: self }
    }

    /// Looks up `name` and counts on the child before releasing this node's
    /// lock. The caller must wrap the result in [`PendingGuard::adopt`].
    pub(crate) fn counted_child(&self, name: &str) -> Option<Arc<Self>> {
        let children = self.lock_children();
        let child = children.get(name)?;
        child.pending.fetch_add(1, Ordering::SeqCst);
        Some(Arc::clone(child))
    }

    /// Snapshots every child, counting on each before the lock is released.
    pub(crate) fn counted_children(&self) -> Vec<Arc<Self>> {
        self.lock_children()
            .values()
            .map(|child| {
                child.pending.fetch_add(1, Ordering::SeqCst);
                Arc::clone(child)
            })
            .collect()
    }

    fn release(&self) {
        let _quiet = self.lock_quiet();
        if self.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.quiet_signal.notify_all();
        }
    }

    fn lock_quiet(&self) -> MutexGuard<'_, ()> {
        self.quiet.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Blocks until no operation is counted on this node.
    pub(crate) fn wait_quiescent(&self) {
        let mut quiet = self.lock_quiet();
        while self.pending.load(Ordering::SeqCst) != 0 {
            quiet = self
                .quiet_signal
                .wait(quiet)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Creates the child `name`. The caller has validated the name.
    pub(crate) fn insert_child(&self, name: &str) -> Outcome {
        let mut children = self.lock_children();
        if children.contains_key(name) {
            return Outcome::warning(format!(
                "Object '{name}' is already in '{}'.",
                self.name
            ));
        }
        let child = Self::with_parent(name, self.this.clone());
        children.insert(name.to_owned(), child);
        Outcome::ok(format!(
            "Object '{name}' has been successfully set in '{}'.",
            self.name
        ))
    }

    /// Detaches `name` once it is quiescent and destroys its subtree.
    ///
    /// Returns `None` when no such child exists.
    pub(crate) fn detach_child(&self, name: &str) -> Option<Arc<Self>> {
        let mut children = self.lock_children();
        let child = Arc::clone(children.get(name)?);
        child.wait_quiescent();
        let descendants = mem::take(&mut *child.lock_children());
        children.remove(name);
        drop(children);
        drop(descendants);
        Some(child)
    }

    /// Drops every child of `name` once it is quiescent.
    ///
    /// Returns `false` when no such child exists.
    pub(crate) fn clear_child(&self, name: &str) -> bool {
        let children = self.lock_children();
        let Some(child) = children.get(name) else {
            return false;
        };
        child.wait_quiescent();
        let descendants = mem::take(&mut *child.lock_children());
        drop(children);
        drop(descendants);
        true
    }

    /// Drops every child of this node while a request is counted on it.
    ///
    /// The calling request steps out of the count, waits for the node to go
    /// quiet, and re-enters under the children lock before clearing.
    pub(crate) fn clear_counted_self(&self) {
        self.release();
        let descendants = loop {
            self.wait_quiescent();
            let mut children = self.lock_children();
            if self.pending.load(Ordering::SeqCst) == 0 {
                self.pending.fetch_add(1, Ordering::SeqCst);
                break mem::take(&mut *children);
            }
        };
        drop(descendants);
    }
}

/// Keeps a request counted on a node for the guard's lifetime.
#[derive(Debug)]
pub(crate) struct PendingGuard<'a> {
    node: &'a KeySpaceNode,
}

impl<'a> PendingGuard<'a> {
    /// Takes ownership of a count that was already added to `node`.
    pub(crate) const fn adopt(node: &'a KeySpaceNode) -> Self {
        Self { node }
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.node.release();
    }
}
