//! One-shot "content fully loaded" gate for ready hooks.

use std::collections::HashSet;
use std::hash::Hash;
use stencil_tree::HandlerSource;
use tracing::debug;

/// A lifecycle hook bound to the host node it runs against
#[derive(Debug, Clone, PartialEq)]
pub struct PendingHook<N> {
    pub node: N,
    pub component: Option<N>,
    /// Position in the hook list of the element or definition that declared it
    pub index: usize,
    pub name: String,
    pub body: HandlerSource,
}

#[derive(Debug)]
pub struct ReadyGate<N> {
    tracking: bool,
    fired: bool,
    queue: Vec<PendingHook<N>>,
    /// (host node, hook index) pairs requested during the current pass
    requested: HashSet<(N, usize)>,
}

impl<N: Copy + Eq + Hash> ReadyGate<N> {
    /// An untracked gate behaves as if the signal had already fired
    pub fn new(tracking: bool) -> Self {
        Self {
            tracking,
            fired: false,
            queue: Vec::new(),
            requested: HashSet::new(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.fired || !self.tracking
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Forget the hooks of a previous pass. Its host nodes are discarded,
    /// so queued hooks for them are dropped; the new pass requests its own.
    pub fn begin_pass(&mut self) {
        if !self.queue.is_empty() {
            debug!(dropped = self.queue.len(), "Dropping ready hooks of a discarded pass");
        }
        self.queue.clear();
        self.requested.clear();
    }

    /// Request a hook. Returns it when it should run right away; `None` when
    /// it was queued or has been requested before.
    pub fn request(&mut self, hook: PendingHook<N>) -> Option<PendingHook<N>> {
        if !self.requested.insert((hook.node, hook.index)) {
            debug!(hook = %hook.name, index = hook.index, "Ready hook already requested");
            return None;
        }
        if self.is_open() {
            return Some(hook);
        }
        self.queue.push(hook);
        None
    }

    /// Fire the signal. Queued hooks come back in request order; later calls
    /// return nothing.
    pub fn fire(&mut self) -> Vec<PendingHook<N>> {
        if self.fired {
            return Vec::new();
        }
        self.fired = true;
        std::mem::take(&mut self.queue)
    }
}
