//! Outcome of processing one inbound message.

use std::fmt;

/// What happened to an inbound message, and whether to acknowledge it.
///
/// Only malformed input is negatively acknowledged. Unregistered and
/// undecodable events are acknowledged so an unroutable message cannot
/// cycle through redelivery forever; they are reported instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Receipt {
    /// Dispatched to every handler registered for the type.
    Handled { succeeded: usize, failed: usize },
    /// No type is registered for `(name, version)`.
    Unregistered { name: String, version: u32 },
    /// The payload does not fit the registered type.
    Undecodable(String),
    /// The bytes are not an envelope.
    Malformed(String),
}

impl Receipt {
    pub fn is_ack(&self) -> bool {
        !matches!(self, Receipt::Malformed(_))
    }

    /// Handlers that ran, successful or not.
    pub fn handlers_invoked(&self) -> usize {
        match self {
            Receipt::Handled { succeeded, failed } => succeeded + failed,
            _ => 0,
        }
    }
}

impl fmt::Display for Receipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Receipt::Handled { succeeded, failed } => {
                write!(f, "handled ({} ok, {} failed)", succeeded, failed)
            }
            Receipt::Unregistered { name, version } => {
                write!(f, "unregistered event type {} v{}", name, version)
            }
            Receipt::Undecodable(reason) => write!(f, "undecodable payload: {}", reason),
            Receipt::Malformed(reason) => write!(f, "malformed envelope: {}", reason),
        }
    }
}
