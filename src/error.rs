//! Error types shared by the health and dispatch paths.

use std::any::Any;

use thiserror::Error;

/// Classification of a failed probe or request attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Transport-level failure: the node could not be talked to.
    Communication,
    /// The node did not answer a probe in time.
    NoAnswer,
    /// A request attempt ran out of time.
    Timeout,
    /// The node answered with a well-formed, unsuccessful response.
    Application,
}

impl ErrorKind {
    /// Short label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Communication => "communication",
            ErrorKind::NoAnswer => "no_answer",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Application => "application",
        }
    }
}

/// Outcome of a failed operation against one node.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NodeError {
    /// Connection-level failure, or a fault raised by the operation itself.
    #[error("backend communication error: {0}")]
    Communication(String),

    /// No answer within the probe deadline.
    #[error("no answer from node: {0}")]
    NoAnswer(String),

    /// The attempt hit a hard timeout.
    #[error("timed out: {0}")]
    Timeout(String),

    /// The backend returned an error response.
    #[error("application error: {0}")]
    Application(String),
}

impl NodeError {
    /// The kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            NodeError::Communication(_) => ErrorKind::Communication,
            NodeError::NoAnswer(_) => ErrorKind::NoAnswer,
            NodeError::Timeout(_) => ErrorKind::Timeout,
            NodeError::Application(_) => ErrorKind::Application,
        }
    }
}

/// Terminal failure of a dispatch call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// The selector snapshot held no nodes.
    #[error("no backend available")]
    NoBackendAvailable,

    /// The request deadline elapsed before an attempt could start.
    #[error("timed out after {attempts} attempt(s)")]
    TimedOut { attempts: usize },

    /// The last attempt failed and no further attempt was made.
    #[error("request to {node} failed after {attempts} attempt(s): {source}")]
    Failed {
        node: String,
        attempts: usize,
        #[source]
        source: NodeError,
    },
}

impl DispatchError {
    /// The node error behind a `Failed` result, if any.
    pub fn node_error(&self) -> Option<&NodeError> {
        match self {
            DispatchError::Failed { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Convenience alias for dispatch results.
pub type DispatchResult<R> = std::result::Result<R, DispatchError>;

/// Text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "operation panicked".to_string())
}
