//! Profile-to-factory lookup.
//!
//! The daemon only ever calls [`ServiceRegistry::resolve`]; how factories are
//! discovered is up to the embedding binary. [`StaticRegistry`] covers the
//! common case of a fixed set of services compiled into the daemon.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::RegistryError;
use crate::service::Service;

/// Creates fresh service instances for one language profile.
pub trait ServiceFactory: Send + Sync {
    /// Builds a new, not yet activated, service instance.
    fn create(&self) -> Box<dyn Service>;
}

impl<F> ServiceFactory for F
where
    F: Fn() -> Box<dyn Service> + Send + Sync,
{
    fn create(&self) -> Box<dyn Service> {
        self()
    }
}

/// Resolves a language profile identifier to a service factory.
pub trait ServiceRegistry: Send + Sync {
    /// Returns the factory for `profile_id`, or `None` when no service is
    /// installed for it.
    fn resolve(&self, profile_id: &str) -> Option<Arc<dyn ServiceFactory>>;
}

/// Registry backed by an in-memory map.
///
/// Profile identifiers are GUID strings whose case varies between hosts, so
/// lookups ignore ASCII case and surrounding whitespace.
#[derive(Clone, Default)]
pub struct StaticRegistry {
    factories: HashMap<String, Arc<dyn ServiceFactory>>,
}

impl StaticRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the factory for `profile_id`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::EmptyProfileId`] for a blank identifier and
    /// [`RegistryError::Duplicate`] when the identifier is already taken.
    pub fn register(
        &mut self,
        profile_id: &str,
        factory: Arc<dyn ServiceFactory>,
    ) -> Result<(), RegistryError> {
        let key = normalise(profile_id);
        if key.is_empty() {
            return Err(RegistryError::EmptyProfileId);
        }
        if self.factories.contains_key(&key) {
            return Err(RegistryError::Duplicate { profile_id: key });
        }
        self.factories.insert(key, factory);
        Ok(())
    }

    /// Number of registered profiles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Returns `true` when no profiles are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Registered profile identifiers, normalised and sorted.
    #[must_use]
    pub fn profile_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

impl ServiceRegistry for StaticRegistry {
    fn resolve(&self, profile_id: &str) -> Option<Arc<dyn ServiceFactory>> {
        self.factories.get(&normalise(profile_id)).cloned()
    }
}

impl fmt::Debug for StaticRegistry {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("StaticRegistry")
            .field("profiles", &self.profile_ids())
            .finish()
    }
}

fn normalise(profile_id: &str) -> String {
    profile_id.trim().to_ascii_lowercase()
}
