//! The three boundary operations: serve an image, serve a data file, render a plot
//!
//! Each call works against two collections, page images and simulation
//! exports, each with its own lazily built index.

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{AssetError, ParseKeyError, Result};
use crate::fetch::{content_type_for, AssetFetcher, Served, IMMUTABLE_CACHE, OCTET_STREAM, PLAIN_TEXT};
use crate::frequency::{resolve_directories, FrequencyKey, Source};
use crate::index::{AssetId, AssetIndex, AssetPath};
use crate::kind::DataKind;
use crate::plot::{self, RenderedPlot};
use crate::remote::{RemoteStore, StoreConfig};
use crate::series::select_series;

/// One remote collection: its index and a fetcher over the same store
pub struct Collection {
    pub index: AssetIndex,
    pub fetcher: AssetFetcher,
}

impl Collection {
    pub fn new(name: &'static str, store: Arc<dyn RemoteStore>, config: &StoreConfig) -> Self {
        Self {
            index: AssetIndex::new(name, store.clone(), config.timeout),
            fetcher: AssetFetcher::new(store, config.timeout),
        }
    }

    async fn ready(&self) -> Result<()> {
        if self.index.ensure_ready().await {
            Ok(())
        } else {
            warn!("{} index unavailable", self.index.name());
            Err(AssetError::IndexUnavailable(self.index.name()))
        }
    }
}

/// Logical paths of the per-frequency page images
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrequencyImages {
    pub frequency: FrequencyKey,
    /// Top view of the patch
    pub top: String,
    /// 3D view / radiation pattern
    pub view: String,
}

pub fn frequency_images(freq: FrequencyKey) -> FrequencyImages {
    let suffix = freq.image_suffix();
    FrequencyImages {
        frequency: freq,
        top: format!("img/top_{}.png", suffix),
        view: format!("img/view_{}.png", suffix),
    }
}

pub fn parse_frequency(raw: &str) -> Result<FrequencyKey> {
    raw.parse().map_err(AssetError::InvalidFrequency)
}

pub fn parse_source(raw: &str) -> Result<Source> {
    raw.parse()
        .map_err(|e: ParseKeyError| AssetError::NotFound(e.to_string()))
}

pub fn parse_kind(raw: &str) -> Result<DataKind> {
    raw.parse()
        .map_err(|e: ParseKeyError| AssetError::NotFound(e.to_string()))
}

pub struct AssetService {
    images: Collection,
    data: Collection,
}

impl AssetService {
    pub fn new(images: Collection, data: Collection) -> Self {
        Self { images, data }
    }

    pub fn from_stores(
        images: Arc<dyn RemoteStore>,
        data: Arc<dyn RemoteStore>,
        config: &StoreConfig,
    ) -> Self {
        Self::new(
            Collection::new("images", images, config),
            Collection::new("data", data, config),
        )
    }

    /// Build both indexes ahead of the first request. Failures are retried on demand.
    pub async fn warm(&self) {
        let (images, data) = tokio::join!(self.images.index.ensure_ready(), self.data.index.ensure_ready());
        info!("Index warmup: images ready={}, data ready={}", images, data);
    }

    /// Operator action: rebuild both indexes, keeping old mappings on failure
    pub async fn reindex(&self) -> (bool, bool) {
        tokio::join!(self.images.index.force_rebuild(), self.data.index.force_rebuild())
    }

    /// Image bytes for a logical path, with an immutable cache directive
    pub async fn serve_image(&self, raw_path: &str) -> Result<Served> {
        self.images.ready().await?;
        let path = AssetPath::normalize(raw_path);
        let id = self
            .images
            .index
            .lookup(&path)
            .await
            .ok_or_else(|| AssetError::NotFound(path.to_string()))?;

        let bytes = self.images.fetcher.fetch(&id).await?;
        Ok(Served {
            bytes,
            content_type: content_type_for(&path, OCTET_STREAM),
            cache_control: Some(IMMUTABLE_CACHE),
        })
    }

    /// First export file of `kind` in the first existing candidate directory
    pub async fn locate_data(
        &self,
        freq: FrequencyKey,
        source: Source,
        kind: DataKind,
    ) -> Result<(AssetPath, AssetId)> {
        let candidates = resolve_directories(freq, source).ok_or_else(|| {
            AssetError::InvalidFrequency(ParseKeyError::Frequency(format!("{} for {}", freq, source)))
        })?;
        self.data.ready().await?;

        for dir in &candidates {
            let found = self
                .data
                .index
                .entries_under(dir)
                .await
                .into_iter()
                .filter(|(path, _)| path.extension().as_deref() == Some("txt"))
                .find(|(path, _)| DataKind::classify(path.stem()) == Some(kind));
            if let Some(hit) = found {
                debug!("{} {} {} resolved to {}", source, freq, kind, hit.0);
                return Ok(hit);
            }
        }

        Err(AssetError::NotFound(format!(
            "{} data for {} at {} GHz (tried {})",
            kind,
            source,
            freq,
            candidates.join(", ")
        )))
    }

    /// Raw export text for (frequency, source, kind)
    pub async fn serve_data(&self, freq: FrequencyKey, source: Source, kind: DataKind) -> Result<Served> {
        let (path, id) = self.locate_data(freq, source, kind).await?;
        let bytes = self.data.fetcher.fetch(&id).await?;
        Ok(Served {
            bytes,
            content_type: content_type_for(&path, PLAIN_TEXT),
            cache_control: None,
        })
    }

    /// Plot of the export for (frequency, source, kind) plus overlay metadata
    pub async fn render_plot(
        &self,
        freq: FrequencyKey,
        source: Source,
        kind: DataKind,
    ) -> Result<RenderedPlot> {
        let (path, id) = self.locate_data(freq, source, kind).await?;
        let bytes = self.data.fetcher.fetch(&id).await?;

        let text = String::from_utf8_lossy(&bytes).into_owned();
        let series = match select_series(&text, path.file_name()) {
            Ok(series) => series,
            Err(no_data) => {
                info!("No plottable rows in {}", path);
                return Err(no_data.into());
            }
        };

        let plot = tokio::task::spawn_blocking(move || plot::render(&series, Some(freq.ghz())))
            .await
            .map_err(|e| crate::error::RenderError::Worker(e.to_string()))??;
        Ok(plot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RemoteError;
    use crate::remote::RemoteEntry;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::collections::HashMap;

    /// In-memory collection keyed by id
    struct MemoryStore {
        files: Vec<(String, String, Vec<u8>)>,
        listing_fails: bool,
    }

    impl MemoryStore {
        fn new(files: &[(&str, &str, &[u8])]) -> Arc<Self> {
            Arc::new(Self {
                files: files
                    .iter()
                    .map(|(path, id, body)| (path.to_string(), id.to_string(), body.to_vec()))
                    .collect(),
                listing_fails: false,
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self { files: Vec::new(), listing_fails: true })
        }
    }

    #[async_trait]
    impl RemoteStore for MemoryStore {
        async fn list(&self) -> std::result::Result<Vec<RemoteEntry>, RemoteError> {
            if self.listing_fails {
                return Err(RemoteError::Status { url: "mem://".into(), status: 500 });
            }
            Ok(self
                .files
                .iter()
                .map(|(path, id, _)| RemoteEntry { path: path.clone(), id: AssetId::new(id.clone()) })
                .collect())
        }

        async fn get(&self, id: &AssetId) -> std::result::Result<Bytes, RemoteError> {
            let by_id: HashMap<&str, &Vec<u8>> =
                self.files.iter().map(|(_, i, body)| (i.as_str(), body)).collect();
            match by_id.get(id.as_str()) {
                Some(body) if !body.is_empty() => Ok(Bytes::from((*body).clone())),
                // Empty bodies stand in for a broken upstream
                Some(_) => Err(RemoteError::Status { url: "mem://get".into(), status: 502 }),
                None => Err(RemoteError::Missing(id.to_string())),
            }
        }
    }

    fn service(images: Arc<MemoryStore>, data: Arc<MemoryStore>) -> AssetService {
        AssetService::from_stores(images, data, &StoreConfig::default())
    }

    const S11: &[u8] = b"Frequency / GHz\tdB(S11)\n2.30\t-8.1\n2.40\t-21.5\n2.50\t-9.0\n";

    #[tokio::test]
    async fn test_serve_image_with_cache_header() {
        let images = MemoryStore::new(&[("img/top_2_4.png", "p1", b"\x89PNG....")]);
        let svc = service(images, MemoryStore::new(&[]));

        let served = svc.serve_image("/img/top_2_4.png").await.unwrap();
        assert_eq!(served.content_type, "image/png");
        assert_eq!(served.cache_control, Some(IMMUTABLE_CACHE));
        assert_eq!(&served.bytes[..4], b"\x89PNG");

        let missing = svc.serve_image("img/top_9_9.png").await.unwrap_err();
        assert!(matches!(missing, AssetError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_unavailable_index_reads_as_not_found() {
        let svc = service(MemoryStore::failing(), MemoryStore::failing());
        let err = svc.serve_image("img/top_2_4.png").await.unwrap_err();
        assert!(matches!(err, AssetError::IndexUnavailable("images")));
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_serve_data_tries_candidates_in_order() {
        let data = MemoryStore::new(&[
            ("AWR/2,3/rl_awr.txt", "late", S11),
            ("AWR/2,3 GHZ/Return Loss.txt", "early", S11),
            ("AWR/2,3 GHZ/vswr.txt", "v", b"2.3 1.4\n"),
        ]);
        let svc = service(MemoryStore::new(&[]), data);

        let (path, id) = svc
            .locate_data(FrequencyKey::F2_3, Source::Awr, DataKind::ReturnLoss)
            .await
            .unwrap();
        assert_eq!(id, AssetId::new("early"));
        assert_eq!(path.as_str(), "AWR/2,3 GHZ/Return Loss.txt");

        let served = svc
            .serve_data(FrequencyKey::F2_3, Source::Awr, DataKind::Vswr)
            .await
            .unwrap();
        assert_eq!(&served.bytes[..], b"2.3 1.4\n");
        assert_eq!(served.content_type, PLAIN_TEXT);
    }

    #[tokio::test]
    async fn test_missing_kind_is_not_found() {
        let data = MemoryStore::new(&[("CST/2.4 GHZ/gain.txt", "g", b"1 2\n")]);
        let svc = service(MemoryStore::new(&[]), data);
        let err = svc
            .serve_data(FrequencyKey::F2_4, Source::Cst, DataKind::Pola)
            .await
            .unwrap_err();
        assert!(matches!(err, AssetError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_fetch_failure_is_upstream_error() {
        let data = MemoryStore::new(&[("CST/2.4 GHZ/gain.txt", "g", b"")]);
        let svc = service(MemoryStore::new(&[]), data);
        let err = svc
            .serve_data(FrequencyKey::F2_4, Source::Cst, DataKind::Gain)
            .await
            .unwrap_err();
        assert!(err.is_upstream());
        assert!(!err.is_not_found());
    }

    #[tokio::test]
    async fn test_render_plot_end_to_end() {
        let data = MemoryStore::new(&[("CST/2.4 GHZ/S-Parameter.txt", "s", S11)]);
        let svc = service(MemoryStore::new(&[]), data);

        let plot = svc
            .render_plot(FrequencyKey::F2_4, Source::Cst, DataKind::ReturnLoss)
            .await
            .unwrap();
        assert!(!plot.png.is_empty());
        assert!(plot.meta.xlim[0] < 2.30 && plot.meta.xlim[1] > 2.50);
        assert!(plot.meta.ylim[0] < -21.5 && plot.meta.ylim[1] > -8.1);
    }

    #[tokio::test]
    async fn test_render_plot_without_rows_is_no_data() {
        let data = MemoryStore::new(&[("CST/2.4 GHZ/gain.txt", "g", b"Theta / deg\n-----\n")]);
        let svc = service(MemoryStore::new(&[]), data);
        let err = svc
            .render_plot(FrequencyKey::F2_4, Source::Cst, DataKind::Gain)
            .await
            .unwrap_err();
        assert!(matches!(err, AssetError::NoData(_)));
        assert!(err.is_not_found());
    }

    #[test]
    fn test_frequency_images() {
        let images = frequency_images(FrequencyKey::F2_4);
        assert_eq!(images.top, "img/top_2_4.png");
        assert_eq!(images.view, "img/view_2_4.png");
    }

    #[test]
    fn test_parse_request_keys() {
        assert!(matches!(parse_frequency("2.45"), Err(AssetError::InvalidFrequency(_))));
        assert_eq!(parse_frequency("1,8").unwrap(), FrequencyKey::F1_8);
        assert!(parse_source("HFSS").unwrap_err().is_not_found());
        assert_eq!(parse_kind("return_loss").unwrap(), DataKind::ReturnLoss);
    }
}
