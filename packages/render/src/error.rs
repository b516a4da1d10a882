use crate::config::ConfigError;
use crate::handler::HandlerError;
use stencil_observer::ObserveError;
use stencil_snapshot::SnapshotError;
use stencil_tree::TreeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Recursive definition detected: {definition}\nCall stack: {}", call_stack.join(" → "))]
    RecursiveDefinition {
        definition: String,
        call_stack: Vec<String>,
    },

    #[error("Render host has no '{0}' attribute")]
    MissingHostId(String),

    #[error("Render host is not attached to a parent")]
    DetachedHost,

    #[error(transparent)]
    Handler(#[from] HandlerError),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error(transparent)]
    Observe(#[from] ObserveError),

    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type RenderResult<T> = Result<T, RenderError>;
