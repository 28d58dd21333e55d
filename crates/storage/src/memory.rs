//! In-memory [`ObjectStore`] with failure injection.
//!
//! Used by the session cache and gateway tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use sr_domain::error::{Error, Result};

use crate::provider::ObjectStore;
use crate::types::ObjectInfo;

#[derive(Debug, Default)]
pub struct InMemoryObjectStore {
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
    fail_list: AtomicBool,
    fail_download: AtomicBool,
    fail_remove: AtomicBool,
    downloads: AtomicUsize,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_object(self, name: &str, bytes: &[u8]) -> Self {
        self.put(name, bytes);
        self
    }

    pub fn put(&self, name: &str, bytes: &[u8]) {
        self.objects.lock().insert(name.to_owned(), bytes.to_vec());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.objects.lock().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.objects.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of download calls served (successful or not).
    pub fn download_count(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }

    pub fn fail_list(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }

    pub fn fail_download(&self, fail: bool) {
        self.fail_download.store(fail, Ordering::SeqCst);
    }

    pub fn fail_remove(&self, fail: bool) {
        self.fail_remove.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn list(&self, prefix: &str, search: &str) -> Result<Vec<ObjectInfo>> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(Error::Storage("list failed (injected)".into()));
        }
        Ok(self
            .objects
            .lock()
            .keys()
            .filter(|n| n.starts_with(prefix) && n.contains(search))
            .map(ObjectInfo::named)
            .collect())
    }

    async fn download(&self, name: &str) -> Result<Option<Vec<u8>>> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        if self.fail_download.load(Ordering::SeqCst) {
            return Err(Error::Storage("download failed (injected)".into()));
        }
        Ok(self.objects.lock().get(name).cloned())
    }

    async fn remove(&self, names: &[String]) -> Result<()> {
        if self.fail_remove.load(Ordering::SeqCst) {
            return Err(Error::Storage("remove failed (injected)".into()));
        }
        let mut objects = self.objects.lock();
        for name in names {
            objects.remove(name);
        }
        Ok(())
    }
}
