//! Snapshot markers.
//!
//! Every render host gets a stable identity, stored as an attribute on the
//! host. Its snapshot lives in a marker element that is always the host's
//! immediate previous sibling. At most one marker per identity exists
//! anywhere below the host root.

use crate::config::RenderConfig;
use crate::error::{RenderError, RenderResult};
use crate::host::HostTree;
use crc32fast::Hasher;
use stencil_snapshot::{deserialize, ENCODING_NAME};
use stencil_tree::Document;
use tracing::{debug, instrument};

/// Short stable id for a naming scope (a page URL, a file path, ...)
pub fn get_scope_id(scope: &str) -> String {
    let mut hasher = Hasher::new();
    hasher.update(scope.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Allocates host identities of the form `<scope id>-<n>`, `n` from 1.
///
/// Ids stay unique as long as one allocator serves a scope; hosts that
/// already carry an identity keep it.
#[derive(Debug, Clone)]
pub struct HostIds {
    scope_id: String,
    issued: u32,
}

impl HostIds {
    pub fn new(scope: &str) -> Self {
        Self {
            scope_id: get_scope_id(scope),
            issued: 0,
        }
    }

    pub fn scope_id(&self) -> &str {
        &self.scope_id
    }

    /// How many identities have been handed out
    pub fn issued(&self) -> u32 {
        self.issued
    }

    fn allocate(&mut self) -> String {
        self.issued += 1;
        format!("{}-{}", self.scope_id, self.issued)
    }

    /// Identity of a host node, written to `attribute` on first use
    pub fn assign<H: HostTree>(&mut self, host: &mut H, node: H::Node, attribute: &str) -> String {
        match host.get_attribute(node, attribute) {
            Some(existing) => existing,
            None => {
                let id = self.allocate();
                host.set_attribute(node, attribute, &id);
                id
            }
        }
    }
}

fn is_marker<H: HostTree>(host: &H, node: H::Node, identity: &str, config: &RenderConfig) -> bool {
    host.tag(node).as_deref() == Some(config.marker_tag.as_str())
        && host.get_attribute(node, &config.encoding_attr).is_some()
        && host.get_attribute(node, &config.host_id_attr).as_deref() == Some(identity)
}

/// Every marker for `identity` below the host root, in document order
pub fn find_markers<H: HostTree>(host: &H, identity: &str, config: &RenderConfig) -> Vec<H::Node> {
    let mut found = Vec::new();
    let mut stack = vec![host.root()];
    while let Some(node) = stack.pop() {
        if is_marker(host, node, identity, config) {
            found.push(node);
        }
        stack.extend(host.children(node).into_iter().rev());
    }
    found
}

fn previous_sibling<H: HostTree>(host: &H, parent: H::Node, node: H::Node) -> Option<H::Node> {
    let siblings = host.children(parent);
    let index = siblings.iter().position(|sibling| *sibling == node)?;
    index.checked_sub(1).map(|previous| siblings[previous])
}

fn identity_of<H: HostTree>(host: &H, node: H::Node, config: &RenderConfig) -> RenderResult<String> {
    host.get_attribute(node, &config.host_id_attr)
        .ok_or_else(|| RenderError::MissingHostId(config.host_id_attr.clone()))
}

/// Place `snapshot` in the marker right before `node`, creating or moving
/// it as needed and removing every other marker with the same identity.
#[instrument(skip(host, snapshot, config), fields(len = snapshot.len()))]
pub fn sync_marker<H: HostTree>(
    host: &mut H,
    node: H::Node,
    snapshot: &str,
    config: &RenderConfig,
) -> RenderResult<H::Node> {
    let identity = identity_of(host, node, config)?;
    let parent = host.parent(node).ok_or(RenderError::DetachedHost)?;

    let keep = previous_sibling(host, parent, node)
        .filter(|previous| is_marker(host, *previous, &identity, config));

    let mut removed = 0;
    for marker in find_markers(host, &identity, config) {
        if Some(marker) == keep {
            continue;
        }
        if let Some(marker_parent) = host.parent(marker) {
            host.remove_child(marker_parent, marker);
            removed += 1;
        }
    }

    let marker = match keep {
        Some(marker) => marker,
        None => {
            let marker = host.create_element(&config.marker_tag);
            host.set_attribute(marker, &config.host_id_attr, &identity);
            host.set_attribute(marker, &config.encoding_attr, ENCODING_NAME);
            host.insert_before(parent, marker, node);
            marker
        }
    };
    host.set_attribute(marker, &config.snapshot_attr, snapshot);

    debug!(
        identity = %identity,
        created = keep.is_none(),
        removed,
        "Synced snapshot marker"
    );
    Ok(marker)
}

/// Decode the snapshot stored next to a host, if its marker is in place
pub fn read_marker<H: HostTree>(
    host: &H,
    node: H::Node,
    config: &RenderConfig,
) -> RenderResult<Option<Document>> {
    let identity = identity_of(host, node, config)?;
    let Some(parent) = host.parent(node) else {
        return Ok(None);
    };
    let Some(marker) = previous_sibling(host, parent, node)
        .filter(|previous| is_marker(host, *previous, &identity, config))
    else {
        return Ok(None);
    };

    match host.get_attribute(marker, &config.snapshot_attr) {
        Some(snapshot) => Ok(Some(deserialize(&snapshot)?)),
        None => Ok(None),
    }
}
