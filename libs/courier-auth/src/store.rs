use async_trait::async_trait;
use courier::AuthError;
use dashmap::DashMap;

/// Persistent key/value storage for credentials (tokens, sessions).
///
/// Implementations report failures as [`AuthError::Storage`].
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// # Errors
    ///
    /// Returns [`AuthError::Storage`] when the backend cannot be read.
    async fn get(&self, key: &str) -> Result<Option<String>, AuthError>;

    /// # Errors
    ///
    /// Returns [`AuthError::Storage`] when the backend cannot be written.
    async fn put(&self, key: &str, value: &str) -> Result<(), AuthError>;

    /// Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Storage`] when the backend cannot be written.
    async fn remove(&self, key: &str) -> Result<(), AuthError>;
}

/// Process-local store, shared safely between tasks
#[derive(Debug, Default)]
pub struct InMemoryKeyValueStore {
    entries: DashMap<String, String>,
}

impl InMemoryKeyValueStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, AuthError> {
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), AuthError> {
        self.entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), AuthError> {
        self.entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_get_remove() {
        let store = InMemoryKeyValueStore::new();
        assert!(store.get("session").await.unwrap().is_none());

        store.put("session", "one").await.unwrap();
        store.put("session", "two").await.unwrap();
        assert_eq!(store.get("session").await.unwrap().as_deref(), Some("two"));
        assert_eq!(store.len(), 1);

        store.remove("session").await.unwrap();
        store.remove("session").await.unwrap();
        assert!(store.is_empty());
    }
}
