use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::ObjectStoreError;

use super::r#trait::ObjectStore;

#[derive(Debug, Clone)]
struct StoredObject {
    bytes: Vec<u8>,
    content_type: String,
}

/// In-memory object store for tests/dev. Presigned URLs are synthetic but
/// carry the key and ttl so tests can assert on them.
#[derive(Debug, Default)]
pub struct InMemoryObjectStore {
    objects: RwLock<HashMap<String, StoredObject>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn object_size(&self, key: &str) -> Option<usize> {
        self.objects
            .read()
            .expect("lock poisoned")
            .get(key)
            .map(|o| o.bytes.len())
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects
            .read()
            .expect("lock poisoned")
            .keys()
            .cloned()
            .collect()
    }

    pub fn content_type(&self, key: &str) -> Option<String> {
        self.objects
            .read()
            .expect("lock poisoned")
            .get(key)
            .map(|o| o.content_type.clone())
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn put_object(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), ObjectStoreError> {
        self.objects.write().expect("lock poisoned").insert(
            key.to_string(),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn object_exists(&self, key: &str) -> Result<bool, ObjectStoreError> {
        Ok(self
            .objects
            .read()
            .expect("lock poisoned")
            .contains_key(key))
    }

    async fn delete_object(&self, key: &str) -> Result<(), ObjectStoreError> {
        self.objects.write().expect("lock poisoned").remove(key);
        Ok(())
    }

    async fn presign_upload(
        &self,
        key: &str,
        _content_type: &str,
        ttl: Duration,
    ) -> Result<String, ObjectStoreError> {
        Ok(format!("memory://upload/{key}?ttl={}", ttl.as_secs()))
    }

    async fn presign_download(
        &self,
        key: &str,
        ttl: Duration,
    ) -> Result<String, ObjectStoreError> {
        Ok(format!("memory://download/{key}?ttl={}", ttl.as_secs()))
    }
}
