//! In-memory blob backends.

use async_trait::async_trait;
use imghost_storage::{Storage, StorageBackend, StorageError, StorageResult, StoredObject};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

#[derive(Default)]
pub struct MemoryStorage {
    objects: Mutex<HashMap<String, (Vec<u8>, String)>>,
    fail_uploads_with_prefix: Mutex<Option<String>>,
    fail_deletes: AtomicBool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make uploads of keys starting with `prefix` fail.
    pub fn fail_uploads_with_prefix(&self, prefix: &str) {
        *self.fail_uploads_with_prefix.lock().unwrap() = Some(prefix.to_string());
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.lock().unwrap().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn get(&self, key: &str) -> Option<(Vec<u8>, String)> {
        self.objects.lock().unwrap().get(key).cloned()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn upload(
        &self,
        storage_key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> StorageResult<StoredObject> {
        if let Some(prefix) = self.fail_uploads_with_prefix.lock().unwrap().as_deref() {
            if storage_key.starts_with(prefix) {
                return Err(StorageError::UploadFailed(format!(
                    "injected failure for {}",
                    storage_key
                )));
            }
        }
        self.objects
            .lock()
            .unwrap()
            .insert(storage_key.to_string(), (data, content_type.to_string()));
        Ok(StoredObject {
            key: storage_key.to_string(),
            url: format!("/uploads/{}", storage_key),
        })
    }

    async fn download(&self, storage_key: &str) -> StorageResult<Vec<u8>> {
        self.objects
            .lock()
            .unwrap()
            .get(storage_key)
            .map(|(data, _)| data.clone())
            .ok_or_else(|| StorageError::NotFound(storage_key.to_string()))
    }

    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(StorageError::DeleteFailed(format!(
                "injected failure for {}",
                storage_key
            )));
        }
        match self.objects.lock().unwrap().remove(storage_key) {
            Some(_) => Ok(()),
            None => Err(StorageError::NotFound(storage_key.to_string())),
        }
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        Ok(self.contains(storage_key))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

/// A backend that is entirely down.
pub struct FailingStorage;

#[async_trait]
impl Storage for FailingStorage {
    async fn upload(&self, _: &str, _: Vec<u8>, _: &str) -> StorageResult<StoredObject> {
        Err(StorageError::BackendError("backend unavailable".to_string()))
    }

    async fn download(&self, _: &str) -> StorageResult<Vec<u8>> {
        Err(StorageError::BackendError("backend unavailable".to_string()))
    }

    async fn delete(&self, _: &str) -> StorageResult<()> {
        Err(StorageError::BackendError("backend unavailable".to_string()))
    }

    async fn exists(&self, _: &str) -> StorageResult<bool> {
        Err(StorageError::BackendError("backend unavailable".to_string()))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}
