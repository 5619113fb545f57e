use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use bytes::Bytes;

use crate::{BucketError, BucketStore};

type ObjectMap = HashMap<(String, String), Bytes>;

/// In-process bucket store used by tests and local dry runs.
///
/// Clones share the same objects, so a test can keep a handle and inspect
/// what the importer left behind.
#[derive(Debug, Clone, Default)]
pub struct MemoryBucketStore {
    objects: Arc<Mutex<ObjectMap>>,
}

impl MemoryBucketStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, bucket: &str, key: &str) -> bool {
        self.lock()
            .contains_key(&(bucket.to_string(), key.to_string()))
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, ObjectMap> {
        // A poisoned map is still a usable map.
        self.objects
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl BucketStore for MemoryBucketStore {
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        bytes: Bytes,
        _content_type: &str,
    ) -> Result<(), BucketError> {
        self.lock()
            .insert((bucket.to_string(), key.to_string()), bytes);
        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes, BucketError> {
        self.lock()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| BucketError::not_found(bucket, key))
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), BucketError> {
        // S3 deletes are idempotent; mirror that here.
        self.lock().remove(&(bucket.to_string(), key.to_string()));
        Ok(())
    }
}
