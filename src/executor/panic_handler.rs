//! Panic payload capture for deferred fault propagation.

use crate::error::Error;
use std::any::Any;

/// A fault captured from a panicking task body.
///
/// Faults are recorded at the point of panic and re-raised at the nearest
/// enclosing `sync`, after sibling tasks have run to completion.
#[derive(Debug, Clone)]
pub struct TaskFault {
    pub message: String,
}

impl TaskFault {
    pub fn from_payload(payload: &(dyn Any + Send)) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else if let Some(e) = payload.downcast_ref::<Error>() {
            // A nested scope already wrapped this fault once; keep the
            // original message instead of stacking prefixes.
            match e {
                Error::TaskPanicked(inner) => inner.clone(),
                other => other.to_string(),
            }
        } else {
            "unknown panic payload".to_string()
        };

        Self { message }
    }
}

impl From<TaskFault> for Error {
    fn from(fault: TaskFault) -> Self {
        Error::TaskPanicked(fault.message)
    }
}
