//! Input services compiled into the daemon.

use std::sync::Arc;

use pime_service::meow::{MEOW_PROFILE_ID, MeowFactory};
use pime_service::{RegistryError, StaticRegistry};

/// Builds the registry of built-in input services.
///
/// # Errors
///
/// Returns [`RegistryError`] when two built-in services claim the same
/// profile identifier.
pub fn default_registry() -> Result<StaticRegistry, RegistryError> {
    let mut registry = StaticRegistry::new();
    registry.register(MEOW_PROFILE_ID, Arc::new(MeowFactory))?;
    Ok(registry)
}
