//! Antenna asset server
//! - Page images proxied from the image collection
//! - Raw CST/AWR exports by frequency, source and kind
//! - Plots rendered on demand with overlay metadata

use anyhow::{Context, Result};
use antenna_assets::{open_store, AssetService, StoreConfig};
use clap::Parser;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod routes;

use routes::{router, AppState};

#[derive(Parser, Debug)]
#[command(name = "antenna-server")]
#[command(about = "Serve antenna reference images, data files and plots")]
#[command(version)]
struct Args {
    /// Listen address
    #[arg(long, env = "ANTENNA_BIND", default_value = "0.0.0.0:3001")]
    bind: SocketAddr,

    /// Export collection: Drive folder URL or local directory
    #[arg(long, env = "ANTENNA_DATA_FOLDER")]
    data_folder: String,

    /// Image collection: Drive folder URL or local directory
    #[arg(long, env = "ANTENNA_IMAGE_FOLDER")]
    image_folder: String,

    /// Drive API key for publicly shared folders
    #[arg(long, env = "GOOGLE_API_KEY")]
    api_key: Option<String>,

    /// Bound on each listing or fetch, in seconds
    #[arg(long, env = "ANTENNA_TIMEOUT_SECS", default_value = "20")]
    timeout_secs: u64,

    /// Drive REST endpoint
    #[arg(long, env = "ANTENNA_DRIVE_API", default_value = antenna_assets::remote::DRIVE_API_BASE)]
    drive_api_base: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = StoreConfig {
        timeout: Duration::from_secs(args.timeout_secs),
        drive_api_base: args.drive_api_base,
        api_key: args.api_key,
    };

    let images = open_store(&args.image_folder, &config).context("Failed to open image collection")?;
    let data = open_store(&args.data_folder, &config).context("Failed to open data collection")?;

    let state = Arc::new(AppState {
        assets: AssetService::from_stores(images, data, &config),
    });

    // Build indexes in the background; requests retry on demand if this fails
    let warm = state.clone();
    tokio::spawn(async move {
        warm.assets.warm().await;
    });

    let app = router(state);

    info!("Server: http://{}", args.bind);
    let listener = tokio::net::TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("Failed to bind {}", args.bind))?;
    axum::serve(listener, app).await?;

    Ok(())
}
