//! # Stencil Observer
//!
//! Transparent read/write instrumentation over a [`Document`].
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use stencil_observer::observe;
//! use stencil_tree::{Document, Node};
//!
//! let doc = Document::from_nodes(vec![Node::element("div")], vec![]);
//! let seen = Rc::new(RefCell::new(Vec::new()));
//! let sink = Rc::clone(&seen);
//! let observation = observe(doc, move |change| sink.borrow_mut().push(change.path.clone()));
//!
//! let root = observation.live_root();
//! root.set("children.0.attributes.id", "x").unwrap();
//!
//! assert!(observation.document().meta().dirty);
//! assert_eq!(*seen.borrow(), vec!["children.0.attributes.id".to_string()]);
//! ```
//!
//! Writes made while connected mark the written node and the document
//! dirty, bump the document version and refresh update tokens on the node,
//! its nearest container and the document. After
//! [`Observation::disconnect`] writes still apply but leave no trace.
//!
//! [`Document`]: stencil_tree::Document

pub mod change;
pub mod error;
mod fields;
pub mod live;
mod path;
pub mod session;

pub use change::{Change, ChangeKind};
pub use error::{ObserveError, ObserveResult};
pub use live::{LiveNode, Read};
pub use path::CONTAINER_ACCESSOR;
pub use session::{observe, Observation};
