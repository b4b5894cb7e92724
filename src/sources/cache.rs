use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::Mutex;

/// Response cache owned by a single aggregation run.
///
/// Every adapter of the run gets a shared reference, so identical upstream
/// requests are issued once. The cache is dropped together with the run.
#[derive(Debug, Default)]
pub struct RequestCache {
    entries: Mutex<HashMap<String, Value>>,
}

impl RequestCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &str) -> Option<Value> {
        self.entries.lock().await.get(key).cloned()
    }

    pub async fn insert(&self, key: String, value: Value) {
        self.entries.lock().await.insert(key, value);
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}
