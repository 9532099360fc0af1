//! Fault taxonomy for subscriber invocations.

use std::any::Any;
use thiserror::Error;

/// A failure raised by subscriber code and contained by the dispatch
/// fault boundary.
///
/// Faults are logged and swallowed; nothing propagates to publishers.
/// Subscribers are decoupled from publishers and have no return channel.
#[derive(Debug, Error)]
pub enum HandlerFault {
    /// The handler panicked with a printable payload.
    #[error("{0}")]
    Panicked(String),

    /// The handler panicked with a payload that carries no message.
    #[error("opaque panic payload")]
    Opaque,
}

impl HandlerFault {
    /// Classify a caught panic payload.
    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        if let Some(msg) = payload.downcast_ref::<&'static str>() {
            HandlerFault::Panicked((*msg).to_string())
        } else if let Some(msg) = payload.downcast_ref::<String>() {
            HandlerFault::Panicked(msg.clone())
        } else {
            HandlerFault::Opaque
        }
    }
}
