//! # Document Arena
//!
//! The live document tree. Nodes live in an arena addressed by [`NodeId`];
//! each entry keeps a non-owning link to its parent so that paths, owning
//! containers and ancestors can be found without a search from the root.
//!
//! Removed nodes stay in the arena, detached. Ids are never reused within a
//! document, which keeps wrapper caches keyed by id sound.
//!
//! Mutating through `Document` directly does not touch update tokens or
//! dirty flags; that bookkeeping belongs to the observer.

use crate::error::{TreeError, TreeResult};
use crate::node::{ChildList, Node, NodeKind, ScriptRule, Text};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Opaque freshness marker.
///
/// Tokens come from a per-document counter and only ever grow, so the
/// largest token in a subtree changes whenever anything in it is touched.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UpdateToken(u64);

impl UpdateToken {
    pub fn value(self) -> u64 {
        self.0
    }
}

static NEXT_DOCUMENT_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one document value.
///
/// Ids, tokens and versions are per-document counters, so two documents can
/// carry identical ones. Anything cached across passes must also key on this.
/// A clone is a separate document and gets a fresh identity.
#[derive(Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(u64);

impl DocumentId {
    fn next() -> Self {
        DocumentId(NEXT_DOCUMENT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::next()
    }
}

impl Clone for DocumentId {
    fn clone(&self) -> Self {
        Self::next()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "doc#{}", self.0)
    }
}

/// Who holds a child list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Owner {
    Document,
    Node(NodeId),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParentLink {
    pub owner: Owner,
    pub list: ChildList,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMeta {
    pub dirty: bool,
    pub version: u64,
    pub token: UpdateToken,
}

#[derive(Debug, Clone)]
struct Entry {
    kind: NodeKind<NodeId>,
    parent: Option<ParentLink>,
    token: UpdateToken,
    dirty: bool,
}

/// Root of one render unit
#[derive(Debug, Clone, Default)]
pub struct Document {
    entries: Vec<Entry>,
    roots: Vec<NodeId>,
    scripts: Vec<ScriptRule>,
    meta: DocumentMeta,
    next_token: u64,
    identity: DocumentId,
}

impl PartialEq for Document {
    /// Structural equality; tokens, dirty flags and versions are ignored
    fn eq(&self, other: &Self) -> bool {
        self.scripts == other.scripts && self.to_nodes() == other.to_nodes()
    }
}

impl Document {
    pub fn new() -> Self {
        let mut doc = Self::default();
        doc.meta.token = doc.fresh_token();
        doc
    }

    pub fn from_nodes(nodes: Vec<Node>, scripts: Vec<ScriptRule>) -> Self {
        let mut doc = Self::new();
        for node in nodes {
            doc.push_root(node);
        }
        doc.scripts = scripts;
        doc
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn scripts(&self) -> &[ScriptRule] {
        &self.scripts
    }

    pub fn scripts_mut(&mut self) -> &mut Vec<ScriptRule> {
        &mut self.scripts
    }

    pub fn identity(&self) -> &DocumentId {
        &self.identity
    }

    pub fn meta(&self) -> &DocumentMeta {
        &self.meta
    }

    pub fn meta_mut(&mut self) -> &mut DocumentMeta {
        &mut self.meta
    }

    pub fn fresh_token(&mut self) -> UpdateToken {
        self.next_token += 1;
        UpdateToken(self.next_token)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id.index() < self.entries.len()
    }

    fn entry(&self, id: NodeId) -> TreeResult<&Entry> {
        self.entries
            .get(id.index())
            .ok_or(TreeError::NodeNotFound(id))
    }

    fn entry_mut(&mut self, id: NodeId) -> TreeResult<&mut Entry> {
        self.entries
            .get_mut(id.index())
            .ok_or(TreeError::NodeNotFound(id))
    }

    pub fn node(&self, id: NodeId) -> TreeResult<&NodeKind<NodeId>> {
        Ok(&self.entry(id)?.kind)
    }

    /// Mutable payload access. Child lists must be edited through
    /// [`Document::insert`], [`Document::remove`] and friends so parent
    /// links stay consistent.
    pub fn node_mut(&mut self, id: NodeId) -> TreeResult<&mut NodeKind<NodeId>> {
        Ok(&mut self.entry_mut(id)?.kind)
    }

    pub fn token(&self, id: NodeId) -> TreeResult<UpdateToken> {
        Ok(self.entry(id)?.token)
    }

    pub fn is_dirty(&self, id: NodeId) -> TreeResult<bool> {
        Ok(self.entry(id)?.dirty)
    }

    pub fn parent(&self, id: NodeId) -> TreeResult<Option<&ParentLink>> {
        Ok(self.entry(id)?.parent.as_ref())
    }

    /// Assign a fresh token to a node
    pub fn touch(&mut self, id: NodeId) -> TreeResult<UpdateToken> {
        let token = self.fresh_token();
        self.entry_mut(id)?.token = token;
        Ok(token)
    }

    pub fn touch_document(&mut self) -> UpdateToken {
        let token = self.fresh_token();
        self.meta.token = token;
        token
    }

    pub fn mark_dirty(&mut self, id: NodeId) -> TreeResult<()> {
        self.entry_mut(id)?.dirty = true;
        self.meta.dirty = true;
        Ok(())
    }

    /// Reset every dirty flag after a consumer caught up
    pub fn clear_dirty(&mut self) {
        self.meta.dirty = false;
        for entry in &mut self.entries {
            entry.dirty = false;
        }
    }

    pub fn list(&self, owner: Owner, list: &ChildList) -> TreeResult<&Vec<NodeId>> {
        match owner {
            Owner::Document if *list == ChildList::Children => Ok(&self.roots),
            Owner::Document => Err(TreeError::NoChildList {
                kind: "document",
                list: list.clone(),
            }),
            Owner::Node(id) => {
                let kind = &self.entry(id)?.kind;
                kind.list(list).ok_or_else(|| TreeError::NoChildList {
                    kind: kind.kind_name(),
                    list: list.clone(),
                })
            }
        }
    }

    fn list_mut(&mut self, owner: Owner, list: &ChildList) -> TreeResult<&mut Vec<NodeId>> {
        match owner {
            Owner::Document if *list == ChildList::Children => Ok(&mut self.roots),
            Owner::Document => Err(TreeError::NoChildList {
                kind: "document",
                list: list.clone(),
            }),
            Owner::Node(id) => {
                let kind = &mut self.entry_mut(id)?.kind;
                let kind_name = kind.kind_name();
                kind.list_mut(list).ok_or_else(|| TreeError::NoChildList {
                    kind: kind_name,
                    list: list.clone(),
                })
            }
        }
    }

    /// Move an owned subtree into the arena, detached unless `parent` is set.
    /// Child links are filled in; the caller places the returned id.
    fn graft(&mut self, node: Node, parent: Option<ParentLink>) -> NodeId {
        let id = NodeId(self.entries.len() as u32);
        let token = self.fresh_token();
        self.entries.push(Entry {
            kind: NodeKind::Text(Text {
                value: String::new(),
            }),
            parent,
            token,
            dirty: false,
        });

        let kind = node.into_kind().map_children(&mut |list, child| {
            self.graft(
                child,
                Some(ParentLink {
                    owner: Owner::Node(id),
                    list: list.clone(),
                }),
            )
        });
        self.entries[id.index()].kind = kind;
        id
    }

    pub fn push_root(&mut self, node: Node) -> NodeId {
        let index = self.roots.len();
        let link = ParentLink {
            owner: Owner::Document,
            list: ChildList::Children,
        };
        let id = self.graft(node, Some(link));
        self.roots.insert(index, id);
        id
    }

    /// Insert an owned subtree at `index` of a child list
    pub fn insert(
        &mut self,
        owner: Owner,
        list: &ChildList,
        index: usize,
        node: Node,
    ) -> TreeResult<NodeId> {
        let len = self.list_mut(owner, list)?.len();
        if index > len {
            return Err(TreeError::IndexOutOfBounds {
                list: list.clone(),
                index,
                len,
            });
        }

        let link = ParentLink {
            owner,
            list: list.clone(),
        };
        let id = self.graft(node, Some(link));
        self.list_mut(owner, list)?.insert(index, id);
        Ok(id)
    }

    /// Where a node sits: its parent link and index
    pub fn position(&self, id: NodeId) -> TreeResult<Option<(ParentLink, usize)>> {
        let Some(link) = self.entry(id)?.parent.clone() else {
            return Ok(None);
        };
        let index = self
            .list(link.owner, &link.list)?
            .iter()
            .position(|child| *child == id);
        Ok(index.map(|index| (link, index)))
    }

    /// Detach a node from its parent and return a deep clone of it
    pub fn remove(&mut self, id: NodeId) -> TreeResult<Node> {
        let (link, index) = self.position(id)?.ok_or(TreeError::Detached(id))?;
        self.list_mut(link.owner, &link.list)?.remove(index);
        self.entry_mut(id)?.parent = None;
        self.extract(id)
    }

    /// Drop a whole named fill from an instance
    pub fn remove_fill(&mut self, id: NodeId, name: &str) -> TreeResult<Vec<Node>> {
        let ids = match &mut self.entry_mut(id)?.kind {
            NodeKind::Instance(instance) => instance.fills.remove(name).unwrap_or_default(),
            other => {
                return Err(TreeError::NoChildList {
                    kind: other.kind_name(),
                    list: ChildList::Fill(name.to_string()),
                })
            }
        };
        ids.into_iter()
            .map(|child| {
                self.entry_mut(child)?.parent = None;
                self.extract(child)
            })
            .collect()
    }

    /// Replace a whole child list, returning the previous content
    pub fn replace_list(
        &mut self,
        owner: Owner,
        list: &ChildList,
        nodes: Vec<Node>,
    ) -> TreeResult<Vec<Node>> {
        let old_ids = std::mem::take(self.list_mut(owner, list)?);
        let mut old = Vec::with_capacity(old_ids.len());
        for child in old_ids {
            self.entry_mut(child)?.parent = None;
            old.push(self.extract(child)?);
        }

        let link = ParentLink {
            owner,
            list: list.clone(),
        };
        let new_ids: Vec<NodeId> = nodes
            .into_iter()
            .map(|node| self.graft(node, Some(link.clone())))
            .collect();
        *self.list_mut(owner, list)? = new_ids;
        Ok(old)
    }

    /// Relocate a node. Fails if the destination lies inside the node.
    pub fn move_node(
        &mut self,
        id: NodeId,
        owner: Owner,
        list: &ChildList,
        index: usize,
    ) -> TreeResult<()> {
        if let Owner::Node(target) = owner {
            if target == id || self.is_ancestor(id, target)? {
                return Err(TreeError::CycleDetected(id));
            }
        }
        self.accepts(owner, list)?;

        let current = self.position(id)?;
        let mut len = self.list(owner, list).map(Vec::len).unwrap_or(0);
        if let Some((link, _)) = &current {
            if link.owner == owner && link.list == *list {
                len -= 1;
            }
        }
        if index > len {
            return Err(TreeError::IndexOutOfBounds {
                list: list.clone(),
                index,
                len,
            });
        }

        if let Some((link, at)) = current {
            self.list_mut(link.owner, &link.list)?.remove(at);
        }
        self.list_mut(owner, list)?.insert(index, id);
        self.entry_mut(id)?.parent = Some(ParentLink {
            owner,
            list: list.clone(),
        });
        Ok(())
    }

    /// Whether an owner can hold the given child list
    fn accepts(&self, owner: Owner, list: &ChildList) -> TreeResult<()> {
        let supported = match (owner, list) {
            (Owner::Document, ChildList::Children) => true,
            (Owner::Document, _) => false,
            (Owner::Node(id), ChildList::Fill(_)) => {
                matches!(self.node(id)?, NodeKind::Instance(_))
            }
            (Owner::Node(id), list) => self.node(id)?.list(list).is_some(),
        };
        if supported {
            return Ok(());
        }
        let kind = match owner {
            Owner::Document => "document",
            Owner::Node(id) => self.node(id)?.kind_name(),
        };
        Err(TreeError::NoChildList {
            kind,
            list: list.clone(),
        })
    }

    /// Whether `ancestor` lies on the parent chain of `id`
    pub fn is_ancestor(&self, ancestor: NodeId, id: NodeId) -> TreeResult<bool> {
        let mut current = self.entry(id)?.parent.as_ref();
        while let Some(link) = current {
            match link.owner {
                Owner::Document => return Ok(false),
                Owner::Node(parent) if parent == ancestor => return Ok(true),
                Owner::Node(parent) => current = self.entry(parent)?.parent.as_ref(),
            }
        }
        Ok(false)
    }

    /// Whether a node is reachable from the document root
    pub fn is_attached(&self, id: NodeId) -> TreeResult<bool> {
        let mut current = id;
        loop {
            match self.position(current)? {
                None => return Ok(false),
                Some((link, _)) => match link.owner {
                    Owner::Document => return Ok(true),
                    Owner::Node(parent) => current = parent,
                },
            }
        }
    }

    /// Dotted path from the document root, e.g. `children.0.fills.header.1`
    pub fn path_of(&self, owner: Owner) -> TreeResult<String> {
        let mut segments = Vec::new();
        let mut current = owner;
        while let Owner::Node(id) = current {
            let (link, index) = self.position(id)?.ok_or(TreeError::Detached(id))?;
            segments.push(format!("{}.{}", link.list, index));
            current = link.owner;
        }
        segments.reverse();
        Ok(segments.join("."))
    }

    /// Closest container strictly above a node (instance, slot or the document)
    pub fn nearest_container(&self, id: NodeId) -> TreeResult<Owner> {
        let mut current = self.entry(id)?.parent.as_ref();
        while let Some(link) = current {
            match link.owner {
                Owner::Document => return Ok(Owner::Document),
                Owner::Node(parent) => {
                    let entry = self.entry(parent)?;
                    if entry.kind.is_container() {
                        return Ok(Owner::Node(parent));
                    }
                    current = entry.parent.as_ref();
                }
            }
        }
        Ok(Owner::Document)
    }

    /// The node itself when it is a container, otherwise its nearest container
    pub fn container_of(&self, owner: Owner) -> TreeResult<Owner> {
        match owner {
            Owner::Document => Ok(Owner::Document),
            Owner::Node(id) if self.node(id)?.is_container() => Ok(owner),
            Owner::Node(id) => self.nearest_container(id),
        }
    }

    /// Pre-order ids of a subtree, the node itself first
    pub fn descendants(&self, id: NodeId) -> TreeResult<Vec<NodeId>> {
        self.entry(id)?;
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            let lists = self.entries[current.index()].kind.lists();
            for (_, children) in lists.into_iter().rev() {
                stack.extend(children.iter().rev().copied());
            }
        }
        Ok(out)
    }

    /// Largest token in a subtree; changes whenever anything below is touched
    pub fn subtree_stamp(&self, id: NodeId) -> TreeResult<UpdateToken> {
        Ok(self
            .descendants(id)?
            .into_iter()
            .map(|node| self.entries[node.index()].token)
            .max()
            .unwrap_or_default())
    }

    /// Visit every attached node in document order
    pub fn walk(&self, mut f: impl FnMut(NodeId, &NodeKind<NodeId>)) {
        for root in &self.roots {
            if let Ok(ids) = self.descendants(*root) {
                for id in ids {
                    f(id, &self.entries[id.index()].kind);
                }
            }
        }
    }

    /// Deep clone out of the arena; the result has no links back
    pub fn extract(&self, id: NodeId) -> TreeResult<Node> {
        self.entry(id)?;
        Ok(self.extract_entry(id))
    }

    fn extract_entry(&self, id: NodeId) -> Node {
        let kind = self.entries[id.index()]
            .kind
            .clone()
            .map_children(&mut |_, child| self.extract_entry(child));
        Node(kind)
    }

    pub fn to_nodes(&self) -> Vec<Node> {
        self.roots.iter().map(|id| self.extract_entry(*id)).collect()
    }
}
