//! Live handles.
//!
//! A [`LiveNode`] stands for one node (or the document) inside an observed
//! session. Reads hand out further live handles for anything node-valued;
//! writes go through the session so they are stamped and reported.

use crate::change::{Change, ChangeKind};
use crate::error::{ObserveError, ObserveResult};
use crate::fields;
use crate::path::{self, Step};
use crate::session::Session;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use stencil_tree::{ChildList, Document, Node, NodeId, NodeKind, Owner, TreeError, UpdateToken};

pub(crate) struct LiveInner {
    pub(crate) session: Rc<Session>,
    pub(crate) owner: Owner,
}

/// Observed reference to a node or to the document root.
///
/// Handles are identity-stable: reading the same node twice yields the same
/// wrapper while any handle to it is alive (see [`LiveNode::same`]).
#[derive(Clone)]
pub struct LiveNode(Rc<LiveInner>);

/// Result of [`LiveNode::get`]
#[derive(Debug, Clone)]
pub enum Read {
    Node(LiveNode),
    Nodes(Vec<LiveNode>),
    Fills(BTreeMap<String, Vec<LiveNode>>),
    Value(Value),
}

impl Read {
    pub fn into_node(self) -> Option<LiveNode> {
        match self {
            Read::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn into_nodes(self) -> Option<Vec<LiveNode>> {
        match self {
            Read::Nodes(nodes) => Some(nodes),
            _ => None,
        }
    }

    pub fn into_value(self) -> Option<Value> {
        match self {
            Read::Value(value) => Some(value),
            _ => None,
        }
    }
}

enum Write {
    Set(Value),
    Delete,
}

impl fmt::Debug for LiveNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.owner {
            Owner::Document => f.write_str("LiveNode(document)"),
            Owner::Node(id) => write!(f, "LiveNode({})", id),
        }
    }
}

impl LiveNode {
    pub(crate) fn from_inner(inner: Rc<LiveInner>) -> Self {
        LiveNode(inner)
    }

    fn session(&self) -> &Rc<Session> {
        &self.0.session
    }

    pub fn owner(&self) -> Owner {
        self.0.owner
    }

    /// `None` for the document root
    pub fn node_id(&self) -> Option<NodeId> {
        match self.0.owner {
            Owner::Document => None,
            Owner::Node(id) => Some(id),
        }
    }

    /// Whether two handles are the same wrapper
    pub fn same(a: &LiveNode, b: &LiveNode) -> bool {
        Rc::ptr_eq(&a.0, &b.0)
    }

    pub fn kind_name(&self) -> ObserveResult<&'static str> {
        fields::owner_kind(&self.session().document.borrow(), self.owner())
    }

    pub fn token(&self) -> ObserveResult<UpdateToken> {
        let document = self.session().document.borrow();
        match self.owner() {
            Owner::Document => Ok(document.meta().token),
            Owner::Node(id) => Ok(document.token(id)?),
        }
    }

    pub fn is_dirty(&self) -> ObserveResult<bool> {
        let document = self.session().document.borrow();
        match self.owner() {
            Owner::Document => Ok(document.meta().dirty),
            Owner::Node(id) => Ok(document.is_dirty(id)?),
        }
    }

    /// Owning container, still observed. Containers return themselves.
    pub fn container(&self) -> ObserveResult<LiveNode> {
        let owner = self
            .session()
            .document
            .borrow()
            .container_of(self.owner())?;
        Ok(self.session().wrap(owner))
    }

    fn child(&self, list: &ChildList, index: usize) -> ObserveResult<LiveNode> {
        let id = {
            let document = self.session().document.borrow();
            let ids = list_ids(&document, self.owner(), list)?;
            ids.get(index)
                .copied()
                .ok_or_else(|| TreeError::IndexOutOfBounds {
                    list: list.clone(),
                    index,
                    len: ids.len(),
                })?
        };
        Ok(self.session().wrap(Owner::Node(id)))
    }

    fn resolve(&self, path: &str) -> ObserveResult<(LiveNode, Step)> {
        let mut steps = path::parse(path)?;
        let last = steps
            .pop()
            .ok_or_else(|| ObserveError::InvalidPath(path.to_string()))?;

        let mut node = self.clone();
        for step in &steps {
            node = match step {
                Step::Container => node.container()?,
                Step::Item(list, index) => node.child(list, *index)?,
                _ => return Err(ObserveError::InvalidPath(path.to_string())),
            };
        }
        Ok((node, last))
    }

    pub fn get(&self, path: &str) -> ObserveResult<Read> {
        let (node, step) = self.resolve(path)?;
        node.read(&step)
    }

    fn read(&self, step: &Step) -> ObserveResult<Read> {
        let session = self.session();
        let owner = self.owner();
        match step {
            Step::Container => Ok(Read::Node(self.container()?)),
            Step::Item(list, index) => Ok(Read::Node(self.child(list, *index)?)),
            Step::Meta(field) => {
                let meta = meta_value(&session.document.borrow(), owner)?;
                if field.is_empty() {
                    return Ok(Read::Value(meta));
                }
                let segments: Vec<String> = field.split('.').map(String::from).collect();
                fields::lookup(&meta, &segments)
                    .cloned()
                    .map(Read::Value)
                    .ok_or_else(|| ObserveError::UnknownField {
                        kind: "meta",
                        field: field.clone(),
                    })
            }
            Step::List(list) => {
                let ids = list_ids(&session.document.borrow(), owner, list)?;
                Ok(Read::Nodes(
                    ids.into_iter()
                        .map(|id| session.wrap(Owner::Node(id)))
                        .collect(),
                ))
            }
            Step::Fills => {
                let fills: Vec<(String, Vec<NodeId>)> = {
                    let document = session.document.borrow();
                    let id = instance_id(&document, owner)?;
                    match document.node(id)? {
                        NodeKind::Instance(instance) => instance
                            .fills
                            .iter()
                            .map(|(name, ids)| (name.clone(), ids.clone()))
                            .collect(),
                        _ => Vec::new(),
                    }
                };
                Ok(Read::Fills(
                    fills
                        .into_iter()
                        .map(|(name, ids)| {
                            let nodes = ids
                                .into_iter()
                                .map(|id| session.wrap(Owner::Node(id)))
                                .collect();
                            (name, nodes)
                        })
                        .collect(),
                ))
            }
            Step::Field(segments) => {
                let document = session.document.borrow();
                fields::check(&document, owner, &segments[0])?;
                let record = fields::record(&document, owner)?;
                Ok(Read::Value(
                    fields::lookup(&record, segments)
                        .cloned()
                        .unwrap_or(Value::Null),
                ))
            }
        }
    }

    /// Write a value. Node-valued paths (`children.N`, `fills.name`, ...)
    /// take the node's JSON form. Returns whether anything changed.
    pub fn set(&self, path: &str, value: impl Into<Value>) -> ObserveResult<bool> {
        self.write(path, Write::Set(value.into()))
    }

    /// Remove a field or child. Removing something absent is a no-op.
    pub fn delete(&self, path: &str) -> ObserveResult<bool> {
        self.write(path, Write::Delete)
    }

    fn write(&self, path: &str, write: Write) -> ObserveResult<bool> {
        let (node, step) = self.resolve(path)?;
        let session = Rc::clone(self.session());
        let owner = node.owner();
        let kind = match write {
            Write::Set(_) => ChangeKind::Set,
            Write::Delete => ChangeKind::Delete,
        };

        let change = {
            let mut document = session.document.borrow_mut();
            let base = if session.is_connected() {
                Some(base_path(&document, owner)?)
            } else {
                None
            };

            let Some((old_value, new_value)) = apply(&mut document, owner, &step, write)? else {
                return Ok(false);
            };
            let Some(base) = base else {
                return Ok(true);
            };

            Session::stamp(&mut document, owner)?;
            let suffix = step.to_string();
            Change {
                kind,
                path: if base.is_empty() {
                    suffix
                } else {
                    format!("{}.{}", base, suffix)
                },
                old_value,
                new_value,
                target: node,
            }
        };

        session.notify(change);
        Ok(true)
    }
}

fn base_path(document: &Document, owner: Owner) -> ObserveResult<String> {
    document.path_of(owner).map_err(|err| match err {
        TreeError::Detached(id) => ObserveError::Detached(id),
        other => other.into(),
    })
}

fn meta_value(document: &Document, owner: Owner) -> ObserveResult<Value> {
    Ok(match owner {
        Owner::Document => {
            let meta = document.meta();
            json!({
                "dirty": meta.dirty,
                "version": meta.version,
                "token": meta.token.value(),
            })
        }
        Owner::Node(id) => json!({
            "dirty": document.is_dirty(id)?,
            "token": document.token(id)?.value(),
        }),
    })
}

/// Child ids of a list; a fill an instance does not carry yet reads as empty
fn list_ids(document: &Document, owner: Owner, list: &ChildList) -> ObserveResult<Vec<NodeId>> {
    match document.list(owner, list) {
        Ok(ids) => Ok(ids.clone()),
        Err(TreeError::NoChildList { .. })
            if matches!(list, ChildList::Fill(_)) && instance_id(document, owner).is_ok() =>
        {
            Ok(Vec::new())
        }
        Err(err) => Err(err.into()),
    }
}

fn instance_id(document: &Document, owner: Owner) -> ObserveResult<NodeId> {
    if let Owner::Node(id) = owner {
        if let NodeKind::Instance(_) = document.node(id)? {
            return Ok(id);
        }
    }
    Err(ObserveError::UnknownField {
        kind: fields::owner_kind(document, owner)?,
        field: "fills".to_string(),
    })
}

fn fill_names(document: &Document, id: NodeId) -> ObserveResult<Vec<String>> {
    Ok(match document.node(id)? {
        NodeKind::Instance(instance) => instance.fills.keys().cloned().collect(),
        _ => Vec::new(),
    })
}

fn list_value(document: &Document, ids: &[NodeId]) -> ObserveResult<Value> {
    let nodes = ids
        .iter()
        .map(|id| document.extract(*id))
        .collect::<Result<Vec<Node>, _>>()?;
    Ok(serde_json::to_value(nodes)?)
}

fn fills_value(document: &Document, id: NodeId) -> ObserveResult<Value> {
    let mut fills = BTreeMap::new();
    for name in fill_names(document, id)? {
        let ids = document.list(Owner::Node(id), &ChildList::Fill(name.clone()))?;
        let nodes = ids
            .iter()
            .map(|child| document.extract(*child))
            .collect::<Result<Vec<Node>, _>>()?;
        fills.insert(name, nodes);
    }
    Ok(serde_json::to_value(fills)?)
}

fn parse_value<T: DeserializeOwned>(value: Value, path: &str) -> ObserveResult<T> {
    serde_json::from_value(value).map_err(|err| ObserveError::InvalidValue {
        path: path.to_string(),
        reason: err.to_string(),
    })
}

/// Apply one write to the document. `None` when the write changed nothing.
fn apply(
    document: &mut Document,
    owner: Owner,
    step: &Step,
    write: Write,
) -> ObserveResult<Option<(Value, Value)>> {
    let path = step.to_string();

    match (step, write) {
        (Step::Container | Step::Meta(_), _) => Err(ObserveError::ReadOnly(path)),

        (Step::Item(list, index), Write::Set(value)) => {
            let node: Node = parse_value(value, &path)?;
            let new = serde_json::to_value(&node)?;
            let ids = list_ids(document, owner, list)?;
            match ids.get(*index) {
                Some(&current) => {
                    let old = serde_json::to_value(document.extract(current)?)?;
                    if old == new {
                        return Ok(None);
                    }
                    document.remove(current)?;
                    document.insert(owner, list, *index, node)?;
                    Ok(Some((old, new)))
                }
                None => {
                    document.insert(owner, list, *index, node)?;
                    Ok(Some((Value::Null, new)))
                }
            }
        }
        (Step::Item(list, index), Write::Delete) => {
            let ids = list_ids(document, owner, list)?;
            let Some(&current) = ids.get(*index) else {
                return Ok(None);
            };
            let old = serde_json::to_value(document.remove(current)?)?;
            Ok(Some((old, Value::Null)))
        }

        (Step::List(list), Write::Set(value)) => {
            let nodes: Vec<Node> = parse_value(value, &path)?;
            let new = serde_json::to_value(&nodes)?;
            let old = list_value(document, &list_ids(document, owner, list)?)?;
            if old == new {
                return Ok(None);
            }
            document.replace_list(owner, list, nodes)?;
            Ok(Some((old, new)))
        }
        (Step::List(ChildList::Fill(name)), Write::Delete) => {
            let id = instance_id(document, owner)?;
            if !fill_names(document, id)?.contains(name) {
                return Ok(None);
            }
            let old = serde_json::to_value(document.remove_fill(id, name)?)?;
            Ok(Some((old, Value::Null)))
        }
        (Step::List(_), Write::Delete) => Err(ObserveError::ReadOnly(path)),

        (Step::Fills, Write::Set(value)) => {
            let id = instance_id(document, owner)?;
            let fills: BTreeMap<String, Vec<Node>> = parse_value(value, &path)?;
            let new = serde_json::to_value(&fills)?;
            let old = fills_value(document, id)?;
            if old == new {
                return Ok(None);
            }
            for name in fill_names(document, id)? {
                if !fills.contains_key(&name) {
                    document.remove_fill(id, &name)?;
                }
            }
            for (name, nodes) in fills {
                document.replace_list(owner, &ChildList::Fill(name), nodes)?;
            }
            Ok(Some((old, new)))
        }
        (Step::Fills, Write::Delete) => {
            let id = instance_id(document, owner)?;
            let names = fill_names(document, id)?;
            if names.is_empty() {
                return Ok(None);
            }
            let old = fills_value(document, id)?;
            for name in names {
                document.remove_fill(id, &name)?;
            }
            Ok(Some((old, Value::Null)))
        }

        (Step::Field(segments), write) => {
            fields::check(document, owner, &segments[0])?;
            let mut record = fields::record(document, owner)?;
            let (old, new) = match write {
                Write::Set(value) => {
                    let old = fields::assign(&mut record, segments, value.clone(), &path)?
                        .unwrap_or(Value::Null);
                    if old == value {
                        return Ok(None);
                    }
                    (old, value)
                }
                Write::Delete => match fields::remove(&mut record, segments) {
                    Some(old) => (old, Value::Null),
                    None => return Ok(None),
                },
            };
            fields::commit(document, owner, record, &path)?;
            Ok(Some((old, new)))
        }
    }
}
