//! In-memory endpoint
//!
//! A complete, deterministic implementation of the endpoint contract used by
//! the engine's tests and by embedders that need a scratch target. Failures
//! can be scripted to exercise retry paths, and third-party copy can be
//! switched on to exercise direct transfers.

use crate::checksum::{digest_bytes, ChecksumKind};
use crate::endpoint::{Endpoint, ObjectHandle, OpenOptions, StatInfo};
use crate::url::EndpointUrl;
use async_trait::async_trait;
use bulkcp_types::{Error, Result};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Default)]
struct Store {
    files: HashMap<String, Vec<u8>>,
    failures: VecDeque<Error>,
    delays: VecDeque<Duration>,
}

impl Store {
    fn take_failure(&mut self) -> Option<Error> {
        self.failures.pop_front()
    }

    fn take_delay(&mut self) -> Option<Duration> {
        self.delays.pop_front()
    }
}

/// Storage endpoint holding its objects in memory
#[derive(Debug, Clone)]
pub struct MemoryEndpoint {
    scheme: String,
    store: Arc<Mutex<Store>>,
    third_party: bool,
}

impl MemoryEndpoint {
    /// Create an endpoint serving the `mem` scheme
    pub fn new() -> Self {
        Self::with_scheme("mem")
    }

    /// Create an endpoint serving a custom scheme
    pub fn with_scheme(scheme: &str) -> Self {
        Self {
            scheme: scheme.to_string(),
            store: Arc::new(Mutex::new(Store::default())),
            third_party: false,
        }
    }

    /// Enable or disable direct endpoint-to-endpoint copies
    pub fn set_third_party(&mut self, enabled: bool) {
        self.third_party = enabled;
    }

    /// Store an object
    pub fn insert(&self, path: &str, data: impl Into<Vec<u8>>) {
        self.store
            .lock()
            .expect("memory store poisoned")
            .files
            .insert(path.to_string(), data.into());
    }

    /// Read back an object, if present
    pub fn contents(&self, path: &str) -> Option<Vec<u8>> {
        self.store
            .lock()
            .expect("memory store poisoned")
            .files
            .get(path)
            .cloned()
    }

    /// Script a failure to be returned by the next I/O operation
    pub fn push_failure(&self, error: Error) {
        self.store
            .lock()
            .expect("memory store poisoned")
            .failures
            .push_back(error);
    }

    /// Script a delay before the next positioned read or write
    ///
    /// Lets tests exercise per-operation timeouts without a slow disk.
    pub fn push_delay(&self, delay: Duration) {
        self.store
            .lock()
            .expect("memory store poisoned")
            .delays
            .push_back(delay);
    }

    /// Script `count` consecutive transient failures
    pub fn fail_times(&self, count: u32, retryable: bool) {
        for i in 0..count {
            self.push_failure(Error::endpoint(
                format!("scripted failure {}", i + 1),
                retryable,
            ));
        }
    }

    fn take_failure(&self) -> Option<Error> {
        self.store
            .lock()
            .expect("memory store poisoned")
            .take_failure()
    }
}

impl Default for MemoryEndpoint {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Endpoint for MemoryEndpoint {
    fn scheme(&self) -> &str {
        &self.scheme
    }

    async fn stat(&self, url: &EndpointUrl) -> Result<StatInfo> {
        let store = self.store.lock().expect("memory store poisoned");
        let data = store
            .files
            .get(url.path())
            .ok_or_else(|| Error::endpoint(format!("no such object: {url}"), false))?;
        Ok(StatInfo {
            size: data.len() as u64,
            is_dir: false,
        })
    }

    async fn open(&self, url: &EndpointUrl, options: OpenOptions) -> Result<Box<dyn ObjectHandle>> {
        if let Some(error) = self.take_failure() {
            return Err(error);
        }
        let mut store = self.store.lock().expect("memory store poisoned");
        let exists = store.files.contains_key(url.path());
        if options.write {
            if exists && !options.overwrite {
                return Err(Error::endpoint(
                    format!("object already exists: {url}"),
                    false,
                ));
            }
            if !exists || options.truncate {
                store.files.insert(url.path().to_string(), Vec::new());
            }
        } else if !exists {
            return Err(Error::endpoint(format!("no such object: {url}"), false));
        }
        Ok(Box::new(MemoryHandle {
            store: Arc::clone(&self.store),
            path: url.path().to_string(),
            url: url.clone(),
        }))
    }

    async fn remove(&self, url: &EndpointUrl) -> Result<()> {
        let mut store = self.store.lock().expect("memory store poisoned");
        store
            .files
            .remove(url.path())
            .map(|_| ())
            .ok_or_else(|| Error::endpoint(format!("no such object: {url}"), false))
    }

    async fn checksum(&self, url: &EndpointUrl, kind: ChecksumKind) -> Result<String> {
        let store = self.store.lock().expect("memory store poisoned");
        let data = store
            .files
            .get(url.path())
            .ok_or_else(|| Error::endpoint(format!("no such object: {url}"), false))?;
        Ok(digest_bytes(kind, data))
    }

    fn supports_third_party(&self, other: &dyn Endpoint) -> bool {
        self.third_party && other.scheme() == self.scheme
    }

    async fn copy_direct(&self, source: &EndpointUrl, target: &EndpointUrl) -> Result<u64> {
        if !self.third_party {
            return Err(Error::endpoint("third-party copy not supported", false));
        }
        if let Some(error) = self.take_failure() {
            return Err(error);
        }
        let mut store = self.store.lock().expect("memory store poisoned");
        let data = store
            .files
            .get(source.path())
            .cloned()
            .ok_or_else(|| Error::endpoint(format!("no such object: {source}"), false))?;
        let len = data.len() as u64;
        store.files.insert(target.path().to_string(), data);
        Ok(len)
    }
}

/// Handle on one in-memory object
struct MemoryHandle {
    store: Arc<Mutex<Store>>,
    path: String,
    url: EndpointUrl,
}

impl MemoryHandle {
    // The lock is released before sleeping so sibling operations proceed.
    async fn delay(&self) {
        let delay = self
            .store
            .lock()
            .expect("memory store poisoned")
            .take_delay();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl ObjectHandle for MemoryHandle {
    async fn read_at(&self, offset: u64, len: usize) -> Result<Vec<u8>> {
        self.delay().await;
        let mut store = self.store.lock().expect("memory store poisoned");
        if let Some(error) = store.take_failure() {
            return Err(error);
        }
        let data = store
            .files
            .get(&self.path)
            .ok_or_else(|| Error::endpoint(format!("object vanished: {}", self.url), false))?;
        let start = (offset as usize).min(data.len());
        let end = (start + len).min(data.len());
        Ok(data[start..end].to_vec())
    }

    async fn write_at(&self, offset: u64, data: &[u8]) -> Result<()> {
        self.delay().await;
        let mut store = self.store.lock().expect("memory store poisoned");
        if let Some(error) = store.take_failure() {
            return Err(error);
        }
        let file = store
            .files
            .get_mut(&self.path)
            .ok_or_else(|| Error::endpoint(format!("object vanished: {}", self.url), false))?;
        let end = offset as usize + data.len();
        if file.len() < end {
            file.resize(end, 0);
        }
        file[offset as usize..end].copy_from_slice(data);
        Ok(())
    }

    async fn truncate(&self, size: u64) -> Result<()> {
        let mut store = self.store.lock().expect("memory store poisoned");
        let file = store
            .files
            .get_mut(&self.path)
            .ok_or_else(|| Error::endpoint(format!("object vanished: {}", self.url), false))?;
        file.resize(size as usize, 0);
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }

    fn resolved_url(&self) -> &EndpointUrl {
        &self.url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_basic_object_lifecycle() {
        let ep = MemoryEndpoint::new();
        ep.insert("a", b"hello".to_vec());

        let url = EndpointUrl::parse("mem://a");
        assert_eq!(ep.stat(&url).await.unwrap().size, 5);

        let handle = ep.open(&url, OpenOptions::reading()).await.unwrap();
        assert_eq!(handle.read_at(0, 5).await.unwrap(), b"hello");
        assert_eq!(handle.read_at(3, 10).await.unwrap(), b"lo");

        ep.remove(&url).await.unwrap();
        assert!(ep.stat(&url).await.is_err());
    }

    #[tokio::test]
    async fn test_scripted_failures_are_consumed_in_order() {
        let ep = MemoryEndpoint::new();
        ep.insert("a", b"data".to_vec());
        ep.fail_times(2, true);

        let url = EndpointUrl::parse("mem://a");
        let handle = ep.open(&url, OpenOptions::reading()).await;
        // First operation consumes the first scripted failure.
        assert!(handle.is_err());
        let handle = ep.open(&url, OpenOptions::reading()).await;
        assert!(handle.is_err());
        let handle = ep.open(&url, OpenOptions::reading()).await.unwrap();
        assert_eq!(handle.read_at(0, 4).await.unwrap(), b"data");
    }

    #[tokio::test(start_paused = true)]
    async fn test_scripted_delay_applies_once() {
        let ep = MemoryEndpoint::new();
        ep.insert("a", b"data".to_vec());
        ep.push_delay(Duration::from_secs(3));

        let url = EndpointUrl::parse("mem://a");
        let handle = ep.open(&url, OpenOptions::reading()).await.unwrap();

        let start = tokio::time::Instant::now();
        assert_eq!(handle.read_at(0, 4).await.unwrap(), b"data");
        assert!(start.elapsed() >= Duration::from_secs(3));

        // The delay is consumed; the next read completes immediately.
        let start = tokio::time::Instant::now();
        assert_eq!(handle.read_at(0, 4).await.unwrap(), b"data");
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_third_party_copy() {
        let mut ep = MemoryEndpoint::new();
        assert!(!ep.supports_third_party(&ep.clone()));
        ep.set_third_party(true);
        assert!(ep.supports_third_party(&ep.clone()));

        ep.insert("src", b"payload".to_vec());
        let n = ep
            .copy_direct(&EndpointUrl::parse("mem://src"), &EndpointUrl::parse("mem://dst"))
            .await
            .unwrap();
        assert_eq!(n, 7);
        assert_eq!(ep.contents("dst").unwrap(), b"payload");
    }
}
