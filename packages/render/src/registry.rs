use crate::error::RenderResult;
use std::collections::HashMap;
use std::rc::Rc;
use stencil_tree::{Definition, Document, Instance, Node, NodeId, NodeKind, UpdateToken};
use tracing::{debug, warn};

/// A definition lifted out of the document for one render pass
#[derive(Debug, Clone)]
pub struct Registered {
    pub node: NodeId,
    pub definition: Definition<Node>,
}

/// Changes whenever a definition is added, removed or edited
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryStamp {
    count: usize,
    latest: UpdateToken,
}

/// Lowercase id -> definition, built once per render pass
#[derive(Debug, Clone, Default)]
pub struct Registry {
    definitions: HashMap<String, Rc<Registered>>,
    stamp: RegistryStamp,
}

impl Registry {
    /// Scan the document in order. Duplicate ids: the last one wins.
    pub fn build(document: &Document) -> RenderResult<Self> {
        let mut ids = Vec::new();
        document.walk(|id, kind| {
            if let NodeKind::Definition(_) = kind {
                ids.push(id);
            }
        });

        let mut registry = Registry::default();
        registry.stamp.count = ids.len();
        for id in ids {
            let NodeKind::Definition(definition) = document.extract(id)?.into_kind() else {
                continue;
            };
            registry.stamp.latest = registry.stamp.latest.max(document.subtree_stamp(id)?);
            registry.register(id, definition);
        }

        debug!(definitions = registry.definitions.len(), "Built definition registry");
        Ok(registry)
    }

    pub fn register(&mut self, node: NodeId, definition: Definition<Node>) {
        let key = definition.key();
        let registered = Rc::new(Registered { node, definition });
        if let Some(previous) = self.definitions.insert(key.clone(), registered) {
            warn!(
                id = %key,
                replaced = %previous.node,
                "Duplicate definition id, the later registration wins"
            );
        }
    }

    pub fn get(&self, name: &str) -> Option<&Rc<Registered>> {
        self.definitions.get(&name.to_lowercase())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Reference first, tag second
    pub fn resolve(&self, instance: &Instance<Node>) -> Option<&Rc<Registered>> {
        instance
            .reference
            .as_deref()
            .and_then(|reference| self.get(reference))
            .or_else(|| self.get(&instance.tag))
    }

    pub fn stamp(&self) -> RegistryStamp {
        self.stamp
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}
