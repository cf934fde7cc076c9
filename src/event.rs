//! The `Event` marker trait.

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Marks a type as a publishable domain event.
///
/// There are no methods: implementing `Event` is an explicit opt-in that
/// lets the type flow through publishers, the [`TypeRegistry`](crate::TypeRegistry)
/// and receiver handlers. Wire names and versions are assigned at
/// registration time, not on the type.
///
/// ```
/// use serde::{Deserialize, Serialize};
/// use event_relay::Event;
///
/// #[derive(Serialize, Deserialize)]
/// struct OrderPlaced {
///     order_id: String,
/// }
///
/// impl Event for OrderPlaced {}
/// ```
pub trait Event: Serialize + DeserializeOwned + Send + Sync + 'static {}
