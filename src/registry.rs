//! Type registry - maps wire `(name, version)` pairs to Rust event types.
//!
//! Registrations are explicit; nothing is discovered by scanning. The table
//! is an immutable snapshot behind an `ArcSwap`, so lookups never block and
//! re-registration at runtime swaps in a fresh copy.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::{debug, warn};

use crate::envelope::{Envelope, RawEnvelope};
use crate::error::RegistryError;
use crate::event::Event;

/// A single `(name, version) -> type` mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeRegistration {
    /// Wire name as it was registered (original casing).
    pub name: String,
    pub version: u32,
    pub type_id: TypeId,
    pub type_name: &'static str,
}

impl TypeRegistration {
    /// Whether this registration resolves to `T`.
    pub fn is<T: 'static>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RegistryKey {
    folded_name: String,
    version: u32,
}

impl RegistryKey {
    fn new(name: &str, version: u32) -> Self {
        Self {
            folded_name: name.to_lowercase(),
            version,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct RegistrySnapshot {
    by_key: HashMap<RegistryKey, TypeRegistration>,
    by_type: HashMap<TypeId, (String, u32)>,
}

impl RegistrySnapshot {
    fn with_mapping(&self, registration: TypeRegistration) -> Self {
        let mut next = self.clone();
        next.by_type.insert(
            registration.type_id,
            (registration.name.clone(), registration.version),
        );
        let displaced = next.by_key.insert(
            RegistryKey::new(&registration.name, registration.version),
            registration.clone(),
        );

        // A displaced type keeps a reverse entry only if another key still maps to it.
        if let Some(old) = displaced.filter(|old| old.type_id != registration.type_id) {
            let remaining = next
                .by_key
                .values()
                .filter(|r| r.type_id == old.type_id)
                .max_by_key(|r| r.version)
                .map(|r| (r.name.clone(), r.version));
            match remaining {
                Some(entry) => {
                    next.by_type.insert(old.type_id, entry);
                }
                None => {
                    next.by_type.remove(&old.type_id);
                }
            }
        }
        next
    }
}

/// Process-wide lookup between wire names and event types.
///
/// Names compare case-insensitively, versions exactly. Mapping the same
/// `(name, version)` twice replaces the earlier entry and logs a warning.
///
/// ```
/// # use serde::{Deserialize, Serialize};
/// use event_relay::{Event, TypeRegistry};
///
/// #[derive(Serialize, Deserialize)]
/// struct OrderPlaced { order_id: String }
/// impl Event for OrderPlaced {}
///
/// let registry = TypeRegistry::new();
/// registry.map::<OrderPlaced>("OrderPlaced").unwrap();
///
/// let found = registry.try_get_type("orderplaced", 1).unwrap();
/// assert!(found.is::<OrderPlaced>());
/// assert!(registry.try_get_type("OrderPlaced", 2).is_none());
/// ```
#[derive(Debug, Default)]
pub struct TypeRegistry {
    snapshot: ArcSwap<RegistrySnapshot>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `T` under `name` at version 1.
    pub fn map<T: Event>(&self, name: &str) -> Result<&Self, RegistryError> {
        self.map_versioned::<T>(name, 1)
    }

    /// Map `T` under `(name, version)`. Last write wins.
    pub fn map_versioned<T: Event>(&self, name: &str, version: u32) -> Result<&Self, RegistryError> {
        if name.trim().is_empty() {
            return Err(RegistryError::InvalidRegistration(
                "event name must not be empty".into(),
            ));
        }
        if version == 0 {
            return Err(RegistryError::InvalidRegistration(format!(
                "version for {name} must start at 1"
            )));
        }

        let registration = TypeRegistration {
            name: name.to_string(),
            version,
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
        };

        let key = RegistryKey::new(name, version);
        let previous = self.snapshot.rcu(|current| {
            Arc::new(current.with_mapping(registration.clone()))
        });

        match previous.by_key.get(&key) {
            Some(existing) if existing.type_id != registration.type_id => {
                warn!(
                    event_name = name,
                    version,
                    previous = existing.type_name,
                    replacement = registration.type_name,
                    "event type mapping overwritten"
                );
            }
            Some(_) => debug!(event_name = name, version, "event type re-mapped"),
            None => debug!(
                event_name = name,
                version,
                type_name = registration.type_name,
                "event type mapped"
            ),
        }

        Ok(self)
    }

    /// Look up the type registered for `(name, version)`.
    pub fn try_get_type(&self, name: &str, version: u32) -> Option<TypeRegistration> {
        self.snapshot
            .load()
            .by_key
            .get(&RegistryKey::new(name, version))
            .cloned()
    }

    /// The `(name, version)` most recently mapped for `T`, if `T` still owns a key.
    pub fn registration_for<T: 'static>(&self) -> Option<(String, u32)> {
        self.snapshot.load().by_type.get(&TypeId::of::<T>()).cloned()
    }

    /// Like [`registration_for`](Self::registration_for) but fails with
    /// `UnmappedType` when `T` was never mapped.
    pub fn name_of<T: 'static>(&self) -> Result<(String, u32), RegistryError> {
        self.registration_for::<T>()
            .ok_or(RegistryError::UnmappedType(std::any::type_name::<T>()))
    }

    /// Resolve a raw envelope into a typed one.
    pub fn promote<T: Event>(&self, raw: RawEnvelope) -> Result<Envelope<T>, RegistryError> {
        let meta = raw.meta;
        let registration = self.try_get_type(&meta.name, meta.version).ok_or_else(|| {
            RegistryError::UnregisteredEventType {
                name: meta.name.clone(),
                version: meta.version,
            }
        })?;

        if !registration.is::<T>() {
            return Err(RegistryError::TypeMismatch {
                name: meta.name.clone(),
                version: meta.version,
                registered: registration.type_name,
                requested: std::any::type_name::<T>(),
            });
        }

        let data = serde_json::from_value::<T>(raw.data).map_err(|e| {
            RegistryError::PayloadMismatch {
                name: meta.name.clone(),
                version: meta.version,
                reason: e.to_string(),
            }
        })?;

        Ok(Envelope::from_parts(data, meta))
    }

    /// Registered wire names, as `name` for v1 and `name@vN` otherwise.
    pub fn names(&self) -> Vec<String> {
        let snapshot = self.snapshot.load();
        let mut names: Vec<String> = snapshot
            .by_key
            .values()
            .map(|r| {
                if r.version == 1 {
                    r.name.clone()
                } else {
                    format!("{}@v{}", r.name, r.version)
                }
            })
            .collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.snapshot.load().by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
