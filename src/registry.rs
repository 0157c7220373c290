//! Process-wide table of named drivers.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use once_cell::sync::Lazy;

use crate::driver::Driver;
use crate::error::{Error, Result};

static DRIVERS: Lazy<RwLock<HashMap<String, Arc<dyn Driver>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Make a driver available to [`Database::open`](crate::Database::open) and
/// [`open`](crate::open) under `name`.
pub fn register(name: impl Into<String>, driver: Arc<dyn Driver>) -> Result<()> {
    let name = name.into();
    let mut drivers = DRIVERS.write().unwrap_or_else(PoisonError::into_inner);
    if drivers.contains_key(&name) {
        return Err(Error::DuplicateDriver(name));
    }
    tracing::debug!(driver = %name, "registered driver");
    drivers.insert(name, driver);
    Ok(())
}

/// The driver registered under `name`.
pub fn lookup(name: &str) -> Result<Arc<dyn Driver>> {
    DRIVERS
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(name)
        .cloned()
        .ok_or_else(|| Error::UnknownDriver(name.to_string()))
}

/// Names of all registered drivers, sorted.
pub fn drivers() -> Vec<String> {
    let mut names: Vec<String> = DRIVERS
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .keys()
        .cloned()
        .collect();
    names.sort();
    names
}
