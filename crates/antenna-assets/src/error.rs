//! Error types for the asset pipeline

use std::time::Duration;
use thiserror::Error;

use crate::index::AssetId;

/// A request parameter that is not one of the closed sets
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseKeyError {
    #[error("unsupported frequency: {0}")]
    Frequency(String),

    #[error("unknown source: {0}")]
    Source(String),

    #[error("unknown data kind: {0}")]
    Kind(String),
}

/// Failure talking to a remote store (listing or retrieval)
#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("remote returned status {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("invalid folder reference: {0}")]
    InvalidFolder(String),

    #[error("no such asset: {0}")]
    Missing(String),
}

/// Retrieval of an indexed asset failed
#[derive(Error, Debug)]
#[error("fetch of asset {id} failed: {source}")]
pub struct FetchError {
    pub id: AssetId,
    #[source]
    pub source: RemoteError,
}

/// Parsed text produced no usable (x, y) pairs
#[derive(Error, Debug, Clone, PartialEq)]
#[error("no numeric series in {0}")]
pub struct NoData(pub String);

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("plot backend error: {0}")]
    Backend(String),

    #[error("PNG encoding failed: {0}")]
    Encode(#[from] image::ImageError),

    #[error("render worker failed: {0}")]
    Worker(String),

    #[error("data range cannot be plotted: {0}")]
    Range(String),
}

/// Outcome of a boundary operation that did not produce an asset
#[derive(Error, Debug)]
pub enum AssetError {
    #[error(transparent)]
    InvalidFrequency(ParseKeyError),

    #[error("asset index for {0} is unavailable")]
    IndexUnavailable(&'static str),

    #[error("asset not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    NoData(#[from] NoData),

    #[error(transparent)]
    Render(#[from] RenderError),
}

impl AssetError {
    /// Everything the boundary should report as "absent" (404-equivalent)
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            AssetError::InvalidFrequency(_)
                | AssetError::IndexUnavailable(_)
                | AssetError::NotFound(_)
                | AssetError::NoData(_)
        )
    }

    /// Remote store failed after the asset was known to exist (502-equivalent)
    pub fn is_upstream(&self) -> bool {
        matches!(self, AssetError::Fetch(_))
    }
}

pub type Result<T> = std::result::Result<T, AssetError>;
