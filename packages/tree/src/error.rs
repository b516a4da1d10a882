use crate::document::NodeId;
use crate::node::ChildList;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TreeError {
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("A {kind} node has no '{list}' child list")]
    NoChildList { kind: &'static str, list: ChildList },

    #[error("Index {index} out of bounds for '{list}' (len {len})")]
    IndexOutOfBounds {
        list: ChildList,
        index: usize,
        len: usize,
    },

    #[error("Moving {0} there would create a cycle")]
    CycleDetected(NodeId),

    #[error("Node {0} is detached from the document")]
    Detached(NodeId),
}

pub type TreeResult<T> = Result<T, TreeError>;
