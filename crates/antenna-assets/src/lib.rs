//! antenna-assets: reference assets for the microstrip antenna calculator
//!
//! This crate provides:
//! - Lazy, all-or-nothing indexes over remote collections (Google Drive or a local directory)
//! - Retrieval of page images and raw simulation exports by logical path
//! - Parsing of CST/AWR text exports into plottable series
//! - Headless PNG rendering plus the layout metadata a client needs to overlay the plot
//!
//! Frequencies, sources and data kinds are closed sets; anything outside them
//! is rejected at the boundary rather than coerced.

pub mod error;
pub mod fetch;
pub mod frequency;
pub mod glyph;
pub mod index;
pub mod kind;
pub mod parse;
pub mod plot;
pub mod remote;
pub mod series;
pub mod service;

pub use error::{AssetError, FetchError, NoData, ParseKeyError, RemoteError, RenderError};
pub use fetch::{AssetFetcher, Served};
pub use frequency::{resolve_directories, FrequencyKey, Source};
pub use index::{AssetId, AssetIndex, AssetPath};
pub use kind::DataKind;
pub use parse::{NumericRow, NumericRows};
pub use plot::{render, LayoutMetadata, Padding, RenderedPlot};
pub use remote::{open_store, DirStore, DriveStore, RemoteEntry, RemoteStore, StoreConfig};
pub use series::{select_series, Series};
pub use service::{frequency_images, AssetService, Collection, FrequencyImages};
