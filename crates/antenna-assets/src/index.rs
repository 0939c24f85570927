//! Lazily built path -> identifier index over one remote collection
//!
//! The remote listing is slow and occasionally fails, so it runs once and the
//! result is reused for the life of the process. A failed or empty listing
//! leaves the index unbuilt so the next request retries.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use crate::remote::RemoteStore;

/// Normalized logical location of an asset, e.g. `CST/2.4 GHZ/gain_01.txt`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct AssetPath(String);

impl AssetPath {
    /// Backslashes become slashes, empty segments and outer separators are dropped.
    /// Case is preserved.
    pub fn normalize(raw: &str) -> Self {
        let joined = raw
            .replace('\\', "/")
            .split('/')
            .filter(|seg| !seg.is_empty())
            .collect::<Vec<_>>()
            .join("/");
        Self(joined)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// File name without its last extension
    pub fn stem(&self) -> &str {
        let name = self.file_name();
        match name.rfind('.') {
            Some(pos) if pos > 0 => &name[..pos],
            _ => name,
        }
    }

    /// Lowercased extension without the dot
    pub fn extension(&self) -> Option<String> {
        let name = self.file_name();
        name.rfind('.')
            .filter(|pos| *pos > 0)
            .map(|pos| name[pos + 1..].to_lowercase())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for AssetPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque handle the remote store uses for one file
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct AssetId(String);

impl AssetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

type Mapping = BTreeMap<AssetPath, AssetId>;

/// Path index for one remote collection.
///
/// Readers see either no mapping or a complete one: the map is built off to
/// the side and published with a single pointer swap. Builds are serialized
/// by `build_lock`; callers that queued behind a build take its outcome, so
/// concurrent first requests trigger one listing whether it succeeds or not.
pub struct AssetIndex {
    name: &'static str,
    store: Arc<dyn RemoteStore>,
    list_timeout: Duration,
    mapping: RwLock<Option<Arc<Mapping>>>,
    build_lock: Mutex<()>,
    /// Completed build attempts, bumped under `build_lock`
    attempts: AtomicU64,
}

impl AssetIndex {
    pub fn new(name: &'static str, store: Arc<dyn RemoteStore>, list_timeout: Duration) -> Self {
        Self {
            name,
            store,
            list_timeout,
            mapping: RwLock::new(None),
            build_lock: Mutex::new(()),
            attempts: AtomicU64::new(0),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub async fn is_ready(&self) -> bool {
        self.mapping.read().await.is_some()
    }

    /// Build the mapping unless it is already built. Returns readiness afterwards.
    pub async fn ensure_ready(&self) -> bool {
        if self.is_ready().await {
            return true;
        }

        let seen = self.attempts.load(Ordering::Acquire);
        let _guard = self.build_lock.lock().await;
        // A build finished while we waited: its outcome is ours too
        if self.attempts.load(Ordering::Acquire) != seen {
            return self.is_ready().await;
        }
        if self.is_ready().await {
            return true;
        }

        self.build_and_publish().await
    }

    /// Operator-triggered rebuild. On failure the previous mapping stays in place.
    pub async fn force_rebuild(&self) -> bool {
        let _guard = self.build_lock.lock().await;
        let built = self.build_and_publish().await;
        if !built {
            warn!("Forced rebuild of {} index failed, keeping previous mapping", self.name);
        }
        built
    }

    /// Caller must hold `build_lock`
    async fn build_and_publish(&self) -> bool {
        let mapping = self.build().await;
        let built = match mapping {
            Some(mapping) => {
                *self.mapping.write().await = Some(Arc::new(mapping));
                true
            }
            None => false,
        };
        self.attempts.fetch_add(1, Ordering::Release);
        built
    }

    async fn build(&self) -> Option<Mapping> {
        let listing = match tokio::time::timeout(self.list_timeout, self.store.list()).await {
            Ok(Ok(entries)) => entries,
            Ok(Err(e)) => {
                warn!("Listing {} collection failed: {}", self.name, e);
                return None;
            }
            Err(_) => {
                warn!("Listing {} collection timed out after {:?}", self.name, self.list_timeout);
                return None;
            }
        };

        let mapping: Mapping = listing
            .into_iter()
            .map(|entry| (AssetPath::normalize(&entry.path), entry.id))
            .filter(|(path, _)| !path.is_empty())
            .collect();

        if mapping.is_empty() {
            warn!("Listing {} collection returned no entries", self.name);
            return None;
        }

        info!("Indexed {} collection: {} assets", self.name, mapping.len());
        Some(mapping)
    }

    async fn snapshot(&self) -> Option<Arc<Mapping>> {
        self.mapping.read().await.clone()
    }

    /// Identifier for an already-normalized path. Absent when unknown or the index is unbuilt.
    pub async fn lookup(&self, path: &AssetPath) -> Option<AssetId> {
        self.snapshot().await?.get(path).cloned()
    }

    /// All entries directly or transitively under a folder prefix, in path order
    pub async fn entries_under(&self, prefix: &str) -> Vec<(AssetPath, AssetId)> {
        let Some(mapping) = self.snapshot().await else {
            return Vec::new();
        };
        let prefix = format!("{}/", AssetPath::normalize(prefix));
        mapping
            .range(AssetPath(prefix.clone())..)
            .take_while(|(path, _)| path.as_str().starts_with(&prefix))
            .map(|(path, id)| (path.clone(), id.clone()))
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.snapshot().await.map(|m| m.len()).unwrap_or(0)
    }
}
