//! Pluggable execution of handler bodies.
//!
//! Method bodies, lifecycle hooks and script-rule bodies are opaque
//! [`HandlerSource`] text. The hosting environment decides how to run them.

use serde_json::Value;
use stencil_tree::HandlerSource;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
#[error("Handler for '{event}' failed: {message}")]
pub struct HandlerError {
    pub event: String,
    pub message: String,
}

/// Context handed to a handler
#[derive(Debug, Clone, Copy)]
pub struct Invocation<'a, N> {
    /// Hook name, method name or event name
    pub event: &'a str,
    /// Host node the handler runs against
    pub node: N,
    /// Nearest enclosing component host
    pub component: Option<N>,
    /// Declared parameter names (methods only)
    pub params: &'a [String],
    pub args: &'a [Value],
}

pub trait HandlerRuntime<N> {
    fn invoke(
        &mut self,
        handler: &HandlerSource,
        invocation: Invocation<'_, N>,
    ) -> Result<(), HandlerError>;
}

/// Runtime that accepts every handler and runs nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRuntime;

impl<N> HandlerRuntime<N> for NoopRuntime {
    fn invoke(&mut self, _handler: &HandlerSource, _invocation: Invocation<'_, N>) -> Result<(), HandlerError> {
        Ok(())
    }
}
