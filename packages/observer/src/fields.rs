//! Scalar field access through a node's JSON record.
//!
//! A record is the node's JSON form with its child lists stripped out. Reads
//! and writes navigate the record; writes are committed by deserializing it
//! back over the arena entry, so every value is checked by the same serde
//! rules as the snapshot codec.

use crate::error::{ObserveError, ObserveResult};
use serde_json::{Map, Value};
use stencil_tree::{Document, NodeId, NodeKind, Owner, ScriptRule};

const LIST_KEYS: [&str; 3] = ["children", "template", "fills"];

/// Discriminant of the tagged JSON form
const TYPE_KEY: &str = "type";

pub(crate) fn writable_fields(kind: &'static str) -> &'static [&'static str] {
    match kind {
        "document" => &["scripts"],
        "element" => &["tag", "attributes", "text", "selector", "hooks"],
        "text" => &["value"],
        "raw" => &["html"],
        "definition" => &["id", "kind", "tag", "methods", "hooks", "props"],
        "instance" => &["ref", "tag", "attributes", "text"],
        "slot" => &["name"],
        _ => &[],
    }
}

pub(crate) fn owner_kind(document: &Document, owner: Owner) -> ObserveResult<&'static str> {
    match owner {
        Owner::Document => Ok("document"),
        Owner::Node(id) => Ok(document.node(id)?.kind_name()),
    }
}

pub(crate) fn check(document: &Document, owner: Owner, field: &str) -> ObserveResult<()> {
    if field == TYPE_KEY {
        return Err(ObserveError::ReadOnly(field.to_string()));
    }
    let kind = owner_kind(document, owner)?;
    if writable_fields(kind).iter().any(|known| *known == field) {
        Ok(())
    } else {
        Err(ObserveError::UnknownField {
            kind,
            field: field.to_string(),
        })
    }
}

pub(crate) fn record(document: &Document, owner: Owner) -> ObserveResult<Value> {
    match owner {
        Owner::Document => {
            let mut map = Map::new();
            map.insert(
                "scripts".to_string(),
                serde_json::to_value(document.scripts())?,
            );
            Ok(Value::Object(map))
        }
        Owner::Node(id) => {
            let mut value = serde_json::to_value(document.node(id)?)?;
            if let Value::Object(map) = &mut value {
                for key in LIST_KEYS {
                    map.remove(key);
                }
            }
            Ok(value)
        }
    }
}

/// Write a modified record back. Child handles are carried over untouched.
pub(crate) fn commit(
    document: &mut Document,
    owner: Owner,
    mut record: Value,
    path: &str,
) -> ObserveResult<()> {
    let invalid = |err: serde_json::Error| ObserveError::InvalidValue {
        path: path.to_string(),
        reason: err.to_string(),
    };

    match owner {
        Owner::Document => {
            let scripts = record
                .get_mut("scripts")
                .map(Value::take)
                .unwrap_or_else(|| Value::Array(Vec::new()));
            let scripts: Vec<ScriptRule> = serde_json::from_value(scripts).map_err(invalid)?;
            *document.scripts_mut() = scripts;
        }
        Owner::Node(id) => {
            restore_lists(document, id, &mut record)?;
            let kind: NodeKind<NodeId> = serde_json::from_value(record).map_err(invalid)?;
            *document.node_mut(id)? = kind;
        }
    }
    Ok(())
}

fn restore_lists(document: &Document, id: NodeId, record: &mut Value) -> ObserveResult<()> {
    let Value::Object(current) = serde_json::to_value(document.node(id)?)? else {
        return Ok(());
    };
    if let Value::Object(map) = record {
        for key in LIST_KEYS {
            if let Some(list) = current.get(key) {
                map.insert(key.to_string(), list.clone());
            }
        }
    }
    Ok(())
}

pub(crate) fn lookup<'a>(value: &'a Value, segments: &[String]) -> Option<&'a Value> {
    segments.iter().try_fold(value, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Set a nested value, creating intermediate objects. Returns the previous value.
pub(crate) fn assign(
    value: &mut Value,
    segments: &[String],
    new: Value,
    path: &str,
) -> ObserveResult<Option<Value>> {
    let Some((last, parents)) = segments.split_last() else {
        return Ok(Some(std::mem::replace(value, new)));
    };

    let mut current = value;
    for segment in parents {
        current = slot(current, segment, path)?;
    }

    if current.is_null() {
        *current = Value::Object(Map::new());
    }
    match current {
        Value::Object(map) => Ok(map.insert(last.clone(), new)),
        Value::Array(items) => {
            let index = parse_index(last, path)?;
            match index.cmp(&items.len()) {
                std::cmp::Ordering::Less => Ok(Some(std::mem::replace(&mut items[index], new))),
                std::cmp::Ordering::Equal => {
                    items.push(new);
                    Ok(None)
                }
                std::cmp::Ordering::Greater => Err(out_of_range(path, index, items.len())),
            }
        }
        _ => Err(not_a_container(path)),
    }
}

/// Remove a nested value; `None` when nothing was there
pub(crate) fn remove(value: &mut Value, segments: &[String]) -> Option<Value> {
    let (last, parents) = segments.split_last()?;
    let mut current = value;
    for segment in parents {
        current = match current {
            Value::Object(map) => map.get_mut(segment)?,
            Value::Array(items) => items.get_mut(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    match current {
        Value::Object(map) => map.remove(last),
        Value::Array(items) => {
            let index = last.parse::<usize>().ok()?;
            (index < items.len()).then(|| items.remove(index))
        }
        _ => None,
    }
}

fn slot<'a>(current: &'a mut Value, segment: &str, path: &str) -> ObserveResult<&'a mut Value> {
    if current.is_null() {
        *current = Value::Object(Map::new());
    }
    match current {
        Value::Object(map) => Ok(map.entry(segment.to_string()).or_insert(Value::Null)),
        Value::Array(items) => {
            let index = parse_index(segment, path)?;
            let len = items.len();
            items
                .get_mut(index)
                .ok_or_else(|| out_of_range(path, index, len))
        }
        _ => Err(not_a_container(path)),
    }
}

fn parse_index(segment: &str, path: &str) -> ObserveResult<usize> {
    segment
        .parse::<usize>()
        .map_err(|_| ObserveError::InvalidPath(path.to_string()))
}

fn out_of_range(path: &str, index: usize, len: usize) -> ObserveError {
    ObserveError::InvalidValue {
        path: path.to_string(),
        reason: format!("index {} out of range (len {})", index, len),
    }
}

fn not_a_container(path: &str) -> ObserveError {
    ObserveError::InvalidValue {
        path: path.to_string(),
        reason: "cannot descend into a scalar".to_string(),
    }
}
