//! Observation sessions.
//!
//! A session owns the document for as long as it is observed. Live handles
//! share it through `Rc`; the wrapper cache only holds weak references, so
//! dropping every handle to a node releases its wrapper.

use crate::change::Change;
use crate::error::ObserveResult;
use crate::live::{LiveInner, LiveNode};
use std::cell::{Cell, Ref, RefCell};
use std::collections::{HashMap, VecDeque};
use std::rc::{Rc, Weak};
use stencil_tree::{Document, NodeId, Owner};
use tracing::{debug, info};

type ChangeCallback = Box<dyn FnMut(&Change)>;

pub(crate) struct Session {
    pub(crate) document: RefCell<Document>,
    connected: Cell<bool>,
    on_change: RefCell<ChangeCallback>,
    queue: RefCell<VecDeque<Change>>,
    delivering: Cell<bool>,
    wrappers: RefCell<HashMap<Owner, Weak<LiveInner>>>,
}

impl Session {
    pub(crate) fn is_connected(&self) -> bool {
        self.connected.get()
    }

    /// Identity-stable wrapper for an owner
    pub(crate) fn wrap(self: &Rc<Self>, owner: Owner) -> LiveNode {
        let mut wrappers = self.wrappers.borrow_mut();
        if let Some(inner) = wrappers.get(&owner).and_then(Weak::upgrade) {
            return LiveNode::from_inner(inner);
        }

        wrappers.retain(|_, weak| weak.strong_count() > 0);
        let inner = Rc::new(LiveInner {
            session: Rc::clone(self),
            owner,
        });
        wrappers.insert(owner, Rc::downgrade(&inner));
        LiveNode::from_inner(inner)
    }

    /// Bookkeeping for an effective write on a connected session: dirty
    /// flags, version bump and fresh tokens on the node, its nearest
    /// container and the document.
    pub(crate) fn stamp(document: &mut Document, owner: Owner) -> ObserveResult<()> {
        if let Owner::Node(id) = owner {
            document.mark_dirty(id)?;
            document.touch(id)?;
            if let Owner::Node(container) = document.nearest_container(id)? {
                document.touch(container)?;
            }
        }
        let meta = document.meta_mut();
        meta.dirty = true;
        meta.version += 1;
        document.touch_document();
        Ok(())
    }

    /// Queue a change and drain the queue unless a delivery is already
    /// running further up the stack.
    pub(crate) fn notify(&self, change: Change) {
        debug!(path = %change.path, kind = %change.kind, "Recorded change");
        self.queue.borrow_mut().push_back(change);
        if self.delivering.replace(true) {
            return;
        }

        loop {
            if !self.connected.get() {
                self.queue.borrow_mut().clear();
                break;
            }
            let next = self.queue.borrow_mut().pop_front();
            let Some(change) = next else {
                break;
            };
            let mut callback = self.on_change.borrow_mut();
            (*callback)(&change);
        }
        self.delivering.set(false);
    }
}

/// Handle returned by [`observe`]
pub struct Observation {
    session: Rc<Session>,
}

/// Start observing a document. The session takes ownership of it.
pub fn observe(document: Document, on_change: impl FnMut(&Change) + 'static) -> Observation {
    info!(roots = document.roots().len(), "Observing document");
    Observation {
        session: Rc::new(Session {
            document: RefCell::new(document),
            connected: Cell::new(true),
            on_change: RefCell::new(Box::new(on_change)),
            queue: RefCell::new(VecDeque::new()),
            delivering: Cell::new(false),
            wrappers: RefCell::new(HashMap::new()),
        }),
    }
}

impl Observation {
    pub fn live_root(&self) -> LiveNode {
        self.session.wrap(Owner::Document)
    }

    /// Live handle for a node id
    pub fn node(&self, id: NodeId) -> LiveNode {
        self.session.wrap(Owner::Node(id))
    }

    /// Stop dirtying, token refresh and notifications for good.
    /// Writes keep applying to the document.
    pub fn disconnect(&self) {
        if self.session.connected.replace(false) {
            info!("Observation disconnected");
        }
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_connected()
    }

    /// Read-only view of the observed document. Must not be held across
    /// writes through live handles.
    pub fn document(&self) -> Ref<'_, Document> {
        self.session.document.borrow()
    }

    /// Clear dirty flags once a consumer has caught up with the changes
    pub fn mark_clean(&self) {
        self.session.document.borrow_mut().clear_dirty();
    }

    /// Disconnect and take the document out. Live handles that outlive the
    /// observation see an empty document afterwards.
    pub fn into_document(self) -> Document {
        self.disconnect();
        std::mem::take(&mut *self.session.document.borrow_mut())
    }
}
