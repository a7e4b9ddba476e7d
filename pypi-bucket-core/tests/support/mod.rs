//! In-memory bucket shared by the integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use pypi_bucket_core::contract::{ObjectListing, ObjectMetadata, ObjectStore, PutObjectRequest};
use pypi_bucket_core::error::StorageError;

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub body: Vec<u8>,
    pub content_type: Option<String>,
    pub metadata: ObjectMetadata,
}

/// Keys are kept sorted, like an S3 listing. Listings are cut into pages of `page_size`.
pub struct MemoryStore {
    objects: Mutex<BTreeMap<(String, String), StoredObject>>,
    puts: Mutex<Vec<String>>,
    page_size: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_page_size(1000)
    }

    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            objects: Mutex::new(BTreeMap::new()),
            puts: Mutex::new(Vec::new()),
            page_size,
        }
    }

    pub fn get(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        self.objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    pub fn keys(&self, bucket: &str) -> Vec<String> {
        self.objects
            .lock()
            .unwrap()
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, k)| k.clone())
            .collect()
    }

    /// Keys written so far, in write order.
    pub fn puts(&self) -> Vec<String> {
        self.puts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put_object(&self, req: PutObjectRequest) -> Result<(), StorageError> {
        self.puts.lock().unwrap().push(req.key.clone());
        self.objects.lock().unwrap().insert(
            (req.bucket, req.key),
            StoredObject {
                body: req.body,
                content_type: req.content_type,
                metadata: req.metadata,
            },
        );
        Ok(())
    }

    async fn head_object(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<Option<ObjectMetadata>, StorageError> {
        Ok(self.get(bucket, key).map(|o| o.metadata))
    }

    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        continuation_token: Option<String>,
    ) -> Result<ObjectListing, StorageError> {
        let matching: Vec<String> = self
            .keys(bucket)
            .into_iter()
            .filter(|k| k.starts_with(prefix))
            .filter(|k| continuation_token.as_ref().map_or(true, |after| k > after))
            .collect();

        let keys: Vec<String> = matching.iter().take(self.page_size).cloned().collect();
        let next_continuation_token = if matching.len() > keys.len() {
            keys.last().cloned()
        } else {
            None
        };
        Ok(ObjectListing {
            keys,
            next_continuation_token,
        })
    }
}
