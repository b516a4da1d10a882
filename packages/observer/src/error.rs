use stencil_tree::{NodeId, TreeError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ObserveError {
    #[error("Invalid path '{0}'")]
    InvalidPath(String),

    #[error("Unknown field '{field}' on {kind}")]
    UnknownField { kind: &'static str, field: String },

    #[error("Field '{0}' is read-only")]
    ReadOnly(String),

    #[error("Invalid value for '{path}': {reason}")]
    InvalidValue { path: String, reason: String },

    #[error("Node {0} is not attached to the document")]
    Detached(NodeId),

    #[error("Failed to encode value: {0}")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Tree(#[from] TreeError),
}

pub type ObserveResult<T> = Result<T, ObserveError>;
