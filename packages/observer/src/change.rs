use crate::live::LiveNode;
use serde::Serialize;
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Set,
    Delete,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeKind::Set => f.write_str("set"),
            ChangeKind::Delete => f.write_str("delete"),
        }
    }
}

/// One effective write, as delivered to the change callback
#[derive(Debug, Clone)]
pub struct Change {
    pub kind: ChangeKind,
    /// Dotted path from the document root
    pub path: String,
    /// `Null` when the field did not exist
    pub old_value: Value,
    /// `Null` for deletions
    pub new_value: Value,
    /// Node (or document) that owns the written field
    pub target: LiveNode,
}
