//! A mount ties an observed document to one render host: first paint on
//! creation, re-render after observed writes, and a snapshot marker kept
//! right before the host.

use crate::config::RenderConfig;
use crate::engine::RenderSession;
use crate::error::RenderResult;
use crate::handler::HandlerRuntime;
use crate::host::HostTree;
use crate::marker::{sync_marker, HostIds};
use std::cell::Cell;
use std::fmt::Debug;
use std::hash::Hash;
use std::rc::Rc;
use stencil_observer::{observe, LiveNode, Observation};
use stencil_snapshot::serialize;
use stencil_tree::Document;
use tracing::{debug, info, instrument};

pub struct Mount<N> {
    observation: Observation,
    session: RenderSession<N>,
    host_node: N,
    identity: String,
    snapshot: String,
    changed: Rc<Cell<bool>>,
}

impl<N: Copy + Eq + Hash + Debug> Mount<N> {
    /// Observe `document`, give the host an identity and paint it.
    ///
    /// Handlers run during a pass must not write through live handles of
    /// this mount; the document is borrowed for the whole pass.
    #[instrument(skip_all, fields(host = ?host_node))]
    pub fn new<H, R>(
        document: Document,
        host: &mut H,
        host_node: N,
        ids: &mut HostIds,
        config: RenderConfig,
        runtime: &mut R,
    ) -> RenderResult<Self>
    where
        H: HostTree<Node = N>,
        R: HandlerRuntime<N>,
    {
        let changed = Rc::new(Cell::new(false));
        let flag = Rc::clone(&changed);
        let observation = observe(document, move |_| flag.set(true));
        let identity = ids.assign(host, host_node, &config.host_id_attr);
        info!(identity = %identity, "Mounting document");

        let mut mount = Self {
            observation,
            session: RenderSession::new(config),
            host_node,
            identity,
            snapshot: String::new(),
            changed,
        };
        mount.paint(host, runtime)?;
        Ok(mount)
    }

    fn paint<H, R>(&mut self, host: &mut H, runtime: &mut R) -> RenderResult<()>
    where
        H: HostTree<Node = N>,
        R: HandlerRuntime<N>,
    {
        self.snapshot = {
            let document = self.observation.document();
            self.session
                .render(&document, host, self.host_node, runtime)?;
            serialize(&document)?
        };
        sync_marker(host, self.host_node, &self.snapshot, self.session.config())?;
        self.observation.mark_clean();
        self.changed.set(false);
        Ok(())
    }

    /// Re-render if an observed write happened since the last paint, then
    /// make sure the marker sits right before the host (which may have
    /// moved). Returns whether a re-render happened.
    pub fn flush<H, R>(&mut self, host: &mut H, runtime: &mut R) -> RenderResult<bool>
    where
        H: HostTree<Node = N>,
        R: HandlerRuntime<N>,
    {
        if self.needs_render() {
            debug!(identity = %self.identity, "Document changed, re-rendering");
            self.paint(host, runtime)?;
            return Ok(true);
        }
        sync_marker(host, self.host_node, &self.snapshot, self.session.config())?;
        Ok(false)
    }

    pub fn needs_render(&self) -> bool {
        self.changed.get() || self.observation.document().meta().dirty
    }

    pub fn live_root(&self) -> LiveNode {
        self.observation.live_root()
    }

    pub fn observation(&self) -> &Observation {
        &self.observation
    }

    pub fn session(&self) -> &RenderSession<N> {
        &self.session
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn host_node(&self) -> N {
        self.host_node
    }

    /// Snapshot written by the last paint
    pub fn snapshot(&self) -> &str {
        &self.snapshot
    }

    pub fn signal_ready<R: HandlerRuntime<N>>(&mut self, runtime: &mut R) -> RenderResult<usize> {
        self.session.signal_ready(runtime)
    }

    /// Stop reacting to writes. The current output and marker stay.
    pub fn disconnect(&self) {
        self.observation.disconnect();
    }
}
