//! # Stencil Render
//!
//! Renders [`Document`]s into a [`HostTree`].
//!
//! ```
//! use stencil_render::{render, HostTree, MemoryHost};
//! use stencil_tree::{Document, Node};
//!
//! let doc = Document::from_nodes(
//!     vec![
//!         Node::component("my-card")
//!             .with_host_tag("article")
//!             .with_child(Node::element("h2").with_child(Node::slot("title"))),
//!         Node::instance("my-card").with_fill("title", vec![Node::text("Hello")]),
//!     ],
//!     vec![],
//! );
//!
//! let mut host = MemoryHost::new();
//! let target = host.root();
//! render(&doc, &mut host, target).unwrap();
//! assert_eq!(
//!     host.inner_html(target),
//!     "<article data-component=\"my-card\"><h2>Hello</h2></article>"
//! );
//! ```
//!
//! A [`Mount`] keeps a document observed and repaints its host after
//! writes, storing a snapshot in a marker element before the host.
//!
//! [`Document`]: stencil_tree::Document

pub mod config;
pub mod engine;
pub mod error;
pub mod handler;
pub mod host;
pub mod marker;
pub mod mount;
pub mod ready;
pub mod registry;
pub mod slots;

#[cfg(test)]
mod tests_slots;

pub use config::{ConfigError, RenderConfig, DEFAULT_CONFIG_NAME};
pub use engine::{Provenance, RenderSession};
pub use error::{RenderError, RenderResult};
pub use handler::{HandlerError, HandlerRuntime, Invocation, NoopRuntime};
pub use host::{HostNode, HostTree, MemoryHost};
pub use marker::{find_markers, get_scope_id, read_marker, sync_marker, HostIds};
pub use mount::Mount;
pub use ready::{PendingHook, ReadyGate};
pub use registry::{Registered, Registry, RegistryStamp};
pub use slots::{collect_slot_names, expand, Expanded, FillMap, SlotRef};

use stencil_tree::Document;

/// One-off render with the default configuration; handlers are not run
pub fn render<H: HostTree>(document: &Document, host: &mut H, target: H::Node) -> RenderResult<()> {
    RenderSession::new(RenderConfig::default()).render(document, host, target, &mut NoopRuntime)
}
