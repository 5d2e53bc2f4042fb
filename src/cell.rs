//! One-shot registry initialisation.

use std::fmt;
use std::sync::OnceLock;

use tracing::warn;

use crate::error::SchemaError;
use crate::registry::Registry;

/// Observable lifecycle of a [`RegistryCell`].
///
/// A build in progress on another thread reads as `Empty`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegistryState {
    Empty,
    Frozen,
    Failed,
}

/// Holds a registry that is built at most once.
///
/// The first [`get_or_init`](Self::get_or_init) runs the build; every other
/// caller, concurrent or later, sees its outcome. A failed build is terminal:
/// the error is stored and handed to every later caller.
///
/// ```
/// use tag_taxonomy::{Registry, RegistryCell, TagDefinition};
///
/// static TAGS: RegistryCell = RegistryCell::new();
///
/// let registry = TAGS
///     .get_or_init(|| Registry::build([TagDefinition::new("blockchain").unwrap()]))
///     .unwrap();
/// assert!(registry.contains("blockchain"));
/// ```
pub struct RegistryCell {
    slot: OnceLock<Result<Registry, SchemaError>>,
}

impl RegistryCell {
    pub const fn new() -> Self {
        Self {
            slot: OnceLock::new(),
        }
    }

    /// Return the registry, running `build` if no build has happened yet.
    pub fn get_or_init<F>(&self, build: F) -> Result<&Registry, SchemaError>
    where
        F: FnOnce() -> Result<Registry, SchemaError>,
    {
        match self.slot.get_or_init(build) {
            Ok(registry) => Ok(registry),
            Err(err) => {
                warn!(%err, "tag registry previously failed to build");
                Err(err.clone())
            }
        }
    }

    /// The frozen registry, if a build has succeeded.
    pub fn get(&self) -> Option<&Registry> {
        self.slot.get().and_then(|slot| slot.as_ref().ok())
    }

    /// The stored failure, if the build was rejected.
    pub fn error(&self) -> Option<&SchemaError> {
        self.slot.get().and_then(|slot| slot.as_ref().err())
    }

    pub fn state(&self) -> RegistryState {
        match self.slot.get() {
            None => RegistryState::Empty,
            Some(Ok(_)) => RegistryState::Frozen,
            Some(Err(_)) => RegistryState::Failed,
        }
    }
}

impl Default for RegistryCell {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RegistryCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryCell")
            .field("state", &self.state())
            .finish()
    }
}
