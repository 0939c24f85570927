//! antenna-assets: offline tools for the antenna reference collections
//!
//! `sync` mirrors a remote collection into a local directory, which the
//! server can then use directly. `graphs` pre-renders every CST/AWR export
//! into PNG plots plus the overlay metadata sidecar.

use anyhow::{Context, Result};
use antenna_assets::frequency::{frequency_dir_name, frequency_from_path};
use antenna_assets::{open_store, render, select_series, DataKind, RemoteStore, Source, StoreConfig};
use clap::{Parser, Subcommand};
use futures::stream::{self, StreamExt, TryStreamExt};
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "antenna-assets")]
#[command(about = "Mirror and pre-render antenna reference assets")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Download a whole collection, preserving relative paths
    Sync {
        /// Drive folder URL or id, or a local directory
        #[arg(short, long)]
        folder: String,

        /// Destination directory
        #[arg(short, long)]
        dest: PathBuf,

        /// Drive API key
        #[arg(long, env = "GOOGLE_API_KEY")]
        api_key: Option<String>,

        /// Parallel downloads
        #[arg(long, default_value = "8")]
        jobs: usize,

        /// Per-request timeout in seconds
        #[arg(long, default_value = "20")]
        timeout_secs: u64,
    },

    /// Render every CST/AWR export under the input directory
    Graphs {
        /// Directory containing CST/ and AWR/
        #[arg(short, long)]
        input: PathBuf,

        /// Output directory for <source>/<freq>/<kind>.png
        #[arg(short, long)]
        output: PathBuf,
    },
}

/// Relative destination for a listed path, or `None` if it would leave the destination
fn safe_relative(path: &str) -> Option<PathBuf> {
    let rel = PathBuf::from(path.replace('\\', "/"));
    let ok = rel.components().all(|c| matches!(c, Component::Normal(_)));
    (ok && rel.components().next().is_some()).then_some(rel)
}

async fn sync_collection(store: Arc<dyn RemoteStore>, dest: &Path, jobs: usize) -> Result<usize> {
    let entries = store.list().await.context("Failed to list collection")?;
    info!("Collection lists {} files", entries.len());

    let downloaded = stream::iter(entries.into_iter().filter_map(|entry| {
        match safe_relative(&entry.path) {
            Some(rel) => Some((dest.join(rel), entry)),
            None => {
                warn!("Skipping unsafe path {:?}", entry.path);
                None
            }
        }
    }))
    .map(|(target, entry)| {
        let store = store.clone();
        async move {
            let bytes = store
                .get(&entry.id)
                .await
                .with_context(|| format!("Failed to download {}", entry.path))?;
            if let Some(parent) = target.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("Failed to create {:?}", parent))?;
            }
            tokio::fs::write(&target, &bytes)
                .await
                .with_context(|| format!("Failed to write {:?}", target))?;
            Ok::<_, anyhow::Error>(())
        }
    })
    .buffer_unordered(jobs.max(1))
    .try_fold(0usize, |count, ()| async move { Ok(count + 1) })
    .await?;

    Ok(downloaded)
}

/// Output of one `graphs` run
#[derive(Debug, Default, PartialEq)]
struct GraphReport {
    rendered: Vec<PathBuf>,
    skipped: Vec<PathBuf>,
}

fn graph_target(output: &Path, source: Source, rel: &str, stem: &str) -> PathBuf {
    let kind = DataKind::classify(stem).map(|k| k.as_str()).unwrap_or(stem);
    output
        .join(source.folder())
        .join(frequency_dir_name(frequency_from_path(rel)))
        .join(format!("{}.png", kind))
}

fn generate_graphs(input: &Path, output: &Path) -> Result<GraphReport> {
    let mut report = GraphReport::default();

    for source in Source::ALL {
        let root = input.join(source.folder());
        if !root.is_dir() {
            info!("No {} exports under {:?}", source, input);
            continue;
        }

        for entry in walkdir::WalkDir::new(&root).sort_by_file_name() {
            let entry = entry.with_context(|| format!("Failed to walk {:?}", root))?;
            let path = entry.path();
            let is_txt = path
                .extension()
                .map(|e| e.eq_ignore_ascii_case("txt"))
                .unwrap_or(false);
            if !entry.file_type().is_file() || !is_txt {
                continue;
            }

            let rel = path.strip_prefix(&root).unwrap_or(path).to_string_lossy().replace('\\', "/");
            let stem = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
            let name = path.file_name().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();

            let raw = fs::read(path).with_context(|| format!("Failed to read {:?}", path))?;
            let text = String::from_utf8_lossy(&raw);
            let series = match select_series(&text, &name) {
                Ok(series) => series,
                Err(e) => {
                    info!("Skipping {:?}: {}", path, e);
                    report.skipped.push(path.to_path_buf());
                    continue;
                }
            };

            // Titled with the folder's own frequency, supported or not
            let plot = render(&series, frequency_from_path(&rel))
                .with_context(|| format!("Failed to render {:?}", path))?;

            let target = graph_target(output, source, &rel, &stem);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).with_context(|| format!("Failed to create {:?}", parent))?;
            }
            fs::write(&target, &plot.png).with_context(|| format!("Failed to write {:?}", target))?;
            let meta_path = target.with_extension("meta.json");
            fs::write(&meta_path, serde_json::to_string_pretty(&plot.meta)?)
                .with_context(|| format!("Failed to write {:?}", meta_path))?;

            info!("Rendered {:?} -> {:?}", path, target);
            report.rendered.push(target);
        }
    }

    Ok(report)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match args.command {
        Command::Sync { folder, dest, api_key, jobs, timeout_secs } => {
            let config = StoreConfig {
                timeout: Duration::from_secs(timeout_secs),
                api_key,
                ..StoreConfig::default()
            };
            let store = open_store(&folder, &config).context("Failed to open collection")?;
            let count = sync_collection(store, &dest, jobs).await?;
            eprintln!("Downloaded {} files into {:?}", count, dest);
        }
        Command::Graphs { input, output } => {
            let report = tokio::task::spawn_blocking(move || generate_graphs(&input, &output)).await??;
            eprintln!(
                "Rendered {} graphs, skipped {} files without data",
                report.rendered.len(),
                report.skipped.len()
            );
        }
    }

    Ok(())
}
