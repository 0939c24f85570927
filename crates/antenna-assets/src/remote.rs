//! Remote collections: a shared Google Drive folder or a local directory
//!
//! Both expose the same two calls, a full recursive listing and a fetch by
//! identifier. Drive identifiers are file ids; local identifiers are the
//! relative path itself.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use serde::Deserialize;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::RemoteError;
use crate::index::AssetId;

pub const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";
const DRIVE_FOLDER_MIME: &str = "application/vnd.google-apps.folder";

/// One file reported by a listing
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteEntry {
    /// Path relative to the collection root, separators as reported
    pub path: String,
    pub id: AssetId,
}

#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Recursive listing of every file in the collection
    async fn list(&self) -> Result<Vec<RemoteEntry>, RemoteError>;

    /// Raw bytes of one file
    async fn get(&self, id: &AssetId) -> Result<Bytes, RemoteError>;
}

/// Settings shared by all stores
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Bound on a single listing or fetch
    pub timeout: Duration,
    /// Drive REST endpoint, overridable for tests and proxies
    pub drive_api_base: String,
    /// Drive API key for publicly shared folders
    pub api_key: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(20),
            drive_api_base: DRIVE_API_BASE.to_string(),
            api_key: None,
        }
    }
}

/// Pick a store for a folder argument: an existing directory is served locally,
/// anything else is treated as a Drive folder URL or id.
pub fn open_store(folder: &str, config: &StoreConfig) -> Result<Arc<dyn RemoteStore>, RemoteError> {
    let local = Path::new(folder);
    if local.is_dir() {
        info!("Serving collection from local directory {:?}", local);
        return Ok(Arc::new(DirStore::new(local)));
    }
    Ok(Arc::new(DriveStore::new(folder, config)?))
}

// ===========================

/// Extract the folder id from a Drive folder URL, or accept a bare id
pub fn folder_id_from_url(url: &str) -> Option<String> {
    let url = url.trim();
    let candidate = if let Some(rest) = url.split("/folders/").nth(1) {
        rest
    } else if let Some(rest) = url.split("id=").nth(1) {
        rest
    } else if !url.contains('/') && !url.contains(':') {
        url
    } else {
        return None;
    };

    let id: String = candidate
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    (!id.is_empty()).then_some(id)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFileList {
    #[serde(default)]
    files: Vec<DriveFile>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    id: String,
    name: String,
    mime_type: String,
}

/// Publicly shared Google Drive folder, read through the v3 REST API
pub struct DriveStore {
    client: Client,
    api_base: String,
    api_key: Option<String>,
    folder_id: String,
    timeout: Duration,
}

impl DriveStore {
    pub fn new(folder_url: &str, config: &StoreConfig) -> Result<Self, RemoteError> {
        let folder_id = folder_id_from_url(folder_url)
            .ok_or_else(|| RemoteError::InvalidFolder(folder_url.to_string()))?;
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|source| RemoteError::Http { url: config.drive_api_base.clone(), source })?;

        Ok(Self {
            client,
            api_base: config.drive_api_base.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            folder_id,
            timeout: config.timeout,
        })
    }

    fn map_send_error(&self, url: &str, source: reqwest::Error) -> RemoteError {
        if source.is_timeout() {
            RemoteError::Timeout(self.timeout)
        } else {
            RemoteError::Http { url: url.to_string(), source }
        }
    }

    async fn list_children(&self, folder_id: &str) -> Result<Vec<DriveFile>, RemoteError> {
        let url = format!("{}/files", self.api_base);
        let query = format!("'{}' in parents and trashed = false", folder_id);
        let mut files = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self.client.get(&url).query(&[
                ("q", query.as_str()),
                ("fields", "nextPageToken,files(id,name,mimeType)"),
                ("pageSize", "1000"),
            ]);
            if let Some(key) = &self.api_key {
                request = request.query(&[("key", key)]);
            }
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token)]);
            }

            let response = request.send().await.map_err(|e| self.map_send_error(&url, e))?;
            let status = response.status();
            if !status.is_success() {
                return Err(RemoteError::Status { url, status: status.as_u16() });
            }
            let page: DriveFileList = response
                .json()
                .await
                .map_err(|source| RemoteError::Http { url: url.clone(), source })?;

            files.extend(page.files);
            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }
        Ok(files)
    }
}

#[async_trait]
impl RemoteStore for DriveStore {
    async fn list(&self) -> Result<Vec<RemoteEntry>, RemoteError> {
        let mut entries = Vec::new();
        let mut pending = vec![(self.folder_id.clone(), String::new())];

        while let Some((folder_id, prefix)) = pending.pop() {
            for file in self.list_children(&folder_id).await? {
                let path = if prefix.is_empty() {
                    file.name.clone()
                } else {
                    format!("{}/{}", prefix, file.name)
                };
                if file.mime_type == DRIVE_FOLDER_MIME {
                    pending.push((file.id, path));
                } else {
                    entries.push(RemoteEntry { path, id: AssetId::new(file.id) });
                }
            }
        }

        debug!("Drive folder {} listed {} files", self.folder_id, entries.len());
        Ok(entries)
    }

    async fn get(&self, id: &AssetId) -> Result<Bytes, RemoteError> {
        let url = format!("{}/files/{}", self.api_base, id);
        let mut request = self.client.get(&url).query(&[("alt", "media")]);
        if let Some(key) = &self.api_key {
            request = request.query(&[("key", key)]);
        }

        let response = request.send().await.map_err(|e| self.map_send_error(&url, e))?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(RemoteError::Missing(id.to_string()));
        }
        if !status.is_success() {
            return Err(RemoteError::Status { url, status: status.as_u16() });
        }
        response
            .bytes()
            .await
            .map_err(|e| self.map_send_error(&url, e))
    }
}

// ===========================

/// Local directory served as a collection; ids are relative paths
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Join an id onto the root, refusing anything that escapes it
    fn resolve(&self, id: &AssetId) -> Result<PathBuf, RemoteError> {
        let rel = Path::new(id.as_str());
        let escapes = rel
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if id.as_str().is_empty() || escapes {
            return Err(RemoteError::Missing(id.to_string()));
        }
        Ok(self.root.join(rel))
    }
}

#[async_trait]
impl RemoteStore for DirStore {
    async fn list(&self) -> Result<Vec<RemoteEntry>, RemoteError> {
        let root = self.root.clone();
        let walk = tokio::task::spawn_blocking(move || -> Result<Vec<RemoteEntry>, RemoteError> {
            let mut entries = Vec::new();
            for entry in walkdir::WalkDir::new(&root).follow_links(true) {
                let entry = entry.map_err(|e| RemoteError::Io(e.into()))?;
                if !entry.file_type().is_file() {
                    continue;
                }
                let Ok(rel) = entry.path().strip_prefix(&root) else {
                    continue;
                };
                let rel = rel
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                entries.push(RemoteEntry { path: rel.clone(), id: AssetId::new(rel) });
            }
            Ok(entries)
        });

        walk.await
            .map_err(|e| RemoteError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?
    }

    async fn get(&self, id: &AssetId) -> Result<Bytes, RemoteError> {
        let path = self.resolve(id)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(RemoteError::Missing(id.to_string())),
            Err(e) => Err(RemoteError::Io(e)),
        }
    }
}
