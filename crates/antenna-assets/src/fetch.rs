//! Asset retrieval by identifier and response header policy

use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::error::{FetchError, RemoteError};
use crate::index::{AssetId, AssetPath};
use crate::remote::RemoteStore;

/// Content at a Drive id does not change while the process runs
pub const IMMUTABLE_CACHE: &str = "public, max-age=31536000, immutable";

pub const OCTET_STREAM: &str = "application/octet-stream";
pub const PLAIN_TEXT: &str = "text/plain; charset=utf-8";

/// Content type from the requested path's extension; `fallback` for anything unrecognised
pub fn content_type_for(path: &AssetPath, fallback: &'static str) -> &'static str {
    match path.extension().as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("txt") => PLAIN_TEXT,
        _ => fallback,
    }
}

/// Bytes ready to hand to the boundary layer
#[derive(Debug, Clone)]
pub struct Served {
    pub bytes: Bytes,
    pub content_type: &'static str,
    pub cache_control: Option<&'static str>,
}

/// Fetches asset bytes with a bounded wait. Content-type agnostic.
#[derive(Clone)]
pub struct AssetFetcher {
    store: Arc<dyn RemoteStore>,
    timeout: Duration,
}

impl AssetFetcher {
    pub fn new(store: Arc<dyn RemoteStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    pub async fn fetch(&self, id: &AssetId) -> Result<Bytes, FetchError> {
        debug!("Fetching asset {}", id);
        match tokio::time::timeout(self.timeout, self.store.get(id)).await {
            Ok(Ok(bytes)) => Ok(bytes),
            Ok(Err(source)) => Err(FetchError { id: id.clone(), source }),
            Err(_) => Err(FetchError {
                id: id.clone(),
                source: RemoteError::Timeout(self.timeout),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::RemoteEntry;
    use async_trait::async_trait;

    struct SlowStore;

    #[async_trait]
    impl RemoteStore for SlowStore {
        async fn list(&self) -> Result<Vec<RemoteEntry>, RemoteError> {
            Ok(Vec::new())
        }

        async fn get(&self, id: &AssetId) -> Result<Bytes, RemoteError> {
            if id.as_str() == "broken" {
                return Err(RemoteError::Status { url: "fake://broken".into(), status: 500 });
            }
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok(Bytes::from_static(b"late"))
        }
    }

    #[test]
    fn test_content_types() {
        let ct = |p: &str| content_type_for(&AssetPath::normalize(p), OCTET_STREAM);
        assert_eq!(ct("img/top_2_4.png"), "image/png");
        assert_eq!(ct("img/view.JPG"), "image/jpeg");
        assert_eq!(ct("img/view.jpeg"), "image/jpeg");
        assert_eq!(ct("CST/2.4/gain.txt"), PLAIN_TEXT);
        assert_eq!(ct("CST/2.4/gain.s1p"), OCTET_STREAM);
        assert_eq!(content_type_for(&AssetPath::normalize("x.dat"), PLAIN_TEXT), PLAIN_TEXT);
    }

    #[tokio::test]
    async fn test_fetch_timeout_is_fetch_error() {
        let fetcher = AssetFetcher::new(Arc::new(SlowStore), Duration::from_millis(20));
        let err = fetcher.fetch(&AssetId::new("slow")).await.unwrap_err();
        assert!(matches!(err.source, RemoteError::Timeout(_)));
        assert_eq!(err.id, AssetId::new("slow"));
    }

    #[tokio::test]
    async fn test_fetch_passes_remote_failure_through() {
        let fetcher = AssetFetcher::new(Arc::new(SlowStore), Duration::from_secs(1));
        let err = fetcher.fetch(&AssetId::new("broken")).await.unwrap_err();
        assert!(matches!(err.source, RemoteError::Status { status: 500, .. }));
    }
}
