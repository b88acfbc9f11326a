//! State store port: an opaque document store of JSON values keyed by string.

use std::future::Future;

use routines_domain::error::RoutinesError;
use serde_json::Value;

/// Key holding the array of routine definitions.
pub const ROUTINES_KEY: &str = "routines";

/// Key holding the captured-state document.
pub const STATES_KEY: &str = "routine-states";

/// Persistence for whole JSON documents.
pub trait StateStore: Send + Sync + 'static {
    /// Read the document stored under `key`, if any.
    fn load(&self, key: &str) -> impl Future<Output = Result<Option<Value>, RoutinesError>> + Send;

    /// Replace the document stored under `key`.
    fn save(&self, key: &str, value: Value)
    -> impl Future<Output = Result<(), RoutinesError>> + Send;
}

impl<T: StateStore> StateStore for std::sync::Arc<T> {
    fn load(&self, key: &str) -> impl Future<Output = Result<Option<Value>, RoutinesError>> + Send {
        (**self).load(key)
    }

    fn save(
        &self,
        key: &str,
        value: Value,
    ) -> impl Future<Output = Result<(), RoutinesError>> + Send {
        (**self).save(key, value)
    }
}
