//! # Stencil Tree
//!
//! Data model for Stencil document trees.
//!
//! A document is parsed elsewhere into owned [`Node`]s and then loaded into
//! a [`Document`] arena. The renderer reads the arena, the observer
//! instruments it and the snapshot codec persists it.
//!
//! ## Node kinds
//!
//! - **element**: tag, attributes, children, optional direct text, selector chain
//! - **text** / **raw**: leaves; raw markup bypasses escaping
//! - **definition**: a `component` (host-wrapped) or `template` (substituted)
//! - **instance**: use site of a definition, carrying slot fills
//! - **slot**: placeholder inside a definition's template
//!
//! Clones are always deep: [`Document::extract`] returns an owned subtree
//! that shares nothing with the arena.

pub mod document;
pub mod error;
pub mod node;
pub mod visitor;

pub use document::{Document, DocumentId, DocumentMeta, NodeId, Owner, ParentLink, UpdateToken};
pub use error::{TreeError, TreeResult};
pub use node::{
    Attributes, ChildList, Definition, DefinitionKind, Element, HandlerSource, Hook, Instance,
    Method, Node, NodeKind, Raw, ScriptRule, Slot, Text, DEFAULT_SLOT, SLOT_ATTRIBUTE,
};
pub use visitor::{
    walk_definition, walk_element, walk_instance, walk_node, walk_nodes, walk_slot, Visitor,
};
