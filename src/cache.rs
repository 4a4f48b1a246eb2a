use std::collections::HashMap;

use serde_json::Value;

/// Successful responses of the current pass, keyed by the endpoint path.
///
/// Failures are never stored, so that a later updater retries instead of getting a stale error.
#[must_use]
#[derive(Default)]
pub struct EndpointCache(HashMap<String, Value>);

impl EndpointCache {
    pub fn get(&self, path: &str) -> Option<&Value> {
        self.0.get(path)
    }

    pub fn insert(&mut self, path: &str, value: Value) {
        self.0.insert(path.to_owned(), value);
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
