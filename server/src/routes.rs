//! HTTP routes over the asset service

use antenna_assets::service::{parse_frequency, parse_kind, parse_source};
use antenna_assets::{AssetError, AssetService, DataKind, FrequencyKey, LayoutMetadata, Served, Source};
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

pub struct AppState {
    pub assets: AssetService,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/img/*path", get(image_handler))
        .route("/data/:source/:freq/:kind", get(data_handler))
        .route("/plot/:source/:freq/:kind", get(plot_handler))
        .route("/plot/:source/:freq/:kind/png", get(plot_png_handler))
        .route("/frequencies/:freq/images", get(frequency_images_handler))
        .route("/admin/reindex", post(reindex_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Boundary status for a failed operation
pub fn status_for(err: &AssetError) -> StatusCode {
    if err.is_not_found() {
        StatusCode::NOT_FOUND
    } else if err.is_upstream() {
        StatusCode::BAD_GATEWAY
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

pub struct ApiError(AssetError);

impl From<AssetError> for ApiError {
    fn from(err: AssetError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            error!("{}", self.0);
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

fn served_response(served: Served) -> Response {
    let mut response = (
        [(header::CONTENT_TYPE, served.content_type)],
        served.bytes,
    )
        .into_response();
    if let Some(cache) = served.cache_control {
        response
            .headers_mut()
            .insert(header::CACHE_CONTROL, header::HeaderValue::from_static(cache));
    }
    response
}

fn request_keys(source: &str, freq: &str, kind: &str) -> ApiResult<(FrequencyKey, Source, DataKind)> {
    Ok((parse_frequency(freq)?, parse_source(source)?, parse_kind(kind)?))
}

async fn image_handler(State(state): State<Arc<AppState>>, Path(path): Path<String>) -> ApiResult<Response> {
    // Page images live under img/ in the image collection
    let served = state.assets.serve_image(&format!("img/{}", path)).await?;
    Ok(served_response(served))
}

async fn data_handler(
    State(state): State<Arc<AppState>>,
    Path((source, freq, kind)): Path<(String, String, String)>,
) -> ApiResult<Response> {
    let (freq, source, kind) = request_keys(&source, &freq, &kind)?;
    let served = state.assets.serve_data(freq, source, kind).await?;
    Ok(served_response(served))
}

#[derive(Serialize)]
struct PlotPayload {
    /// Base64 PNG
    image: String,
    meta: LayoutMetadata,
}

async fn plot_handler(
    State(state): State<Arc<AppState>>,
    Path((source, freq, kind)): Path<(String, String, String)>,
) -> ApiResult<Json<PlotPayload>> {
    let (freq, source, kind) = request_keys(&source, &freq, &kind)?;
    let plot = state.assets.render_plot(freq, source, kind).await?;
    Ok(Json(PlotPayload {
        image: STANDARD.encode(&plot.png),
        meta: plot.meta,
    }))
}

async fn plot_png_handler(
    State(state): State<Arc<AppState>>,
    Path((source, freq, kind)): Path<(String, String, String)>,
) -> ApiResult<Response> {
    let (freq, source, kind) = request_keys(&source, &freq, &kind)?;
    let plot = state.assets.render_plot(freq, source, kind).await?;
    Ok(([(header::CONTENT_TYPE, "image/png")], plot.png).into_response())
}

async fn frequency_images_handler(Path(freq): Path<String>) -> ApiResult<impl IntoResponse> {
    let freq = parse_frequency(&freq)?;
    Ok(Json(antenna_assets::frequency_images(freq)))
}

async fn reindex_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let (images, data) = state.assets.reindex().await;
    if images && data {
        info!("Reindex complete");
    } else {
        warn!("Reindex incomplete: images={}, data={}", images, data);
    }
    let status = if images && data { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status, Json(json!({ "images": images, "data": data })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use antenna_assets::{FetchError, NoData, RemoteError, RenderError, StoreConfig};
    use axum::extract::Query;
    use std::collections::HashMap;
    use std::net::SocketAddr;

    #[test]
    fn test_status_mapping() {
        let upstream = AssetError::Fetch(FetchError {
            id: antenna_assets::AssetId::new("x"),
            source: RemoteError::Status { url: "u".into(), status: 500 },
        });
        assert_eq!(status_for(&upstream), StatusCode::BAD_GATEWAY);
        assert_eq!(status_for(&AssetError::NotFound("a".into())), StatusCode::NOT_FOUND);
        assert_eq!(status_for(&AssetError::IndexUnavailable("data")), StatusCode::NOT_FOUND);
        assert_eq!(status_for(&AssetError::NoData(NoData("gain.txt".into()))), StatusCode::NOT_FOUND);
        assert_eq!(
            status_for(&AssetError::Render(RenderError::Backend("boom".into()))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(status_for(&parse_frequency("5.8").unwrap_err()), StatusCode::NOT_FOUND);
    }

    // ---- Drive v3 stand-in ----

    /// (id, name, mimeType, parent, body)
    type MockFile = (&'static str, &'static str, &'static str, &'static str, &'static [u8]);

    const FOLDER: &str = "application/vnd.google-apps.folder";
    const GAIN: &[u8] = b"Theta [deg.]  Abs(Gain)[dBi]\n0 4.9\n30 4.1\n60 2.2\n90 -1.5\n";

    const DRIVE: &[MockFile] = &[
        ("imgdir", "img", FOLDER, "images-root", b""),
        ("top24", "top_2_4.png", "image/png", "imgdir", b"\x89PNG top"),
        ("cst", "CST", FOLDER, "data-root", b""),
        ("cst24", "2.4 GHZ", FOLDER, "cst", b""),
        ("gain24", "Gain_Abs.txt", "text/plain", "cst24", GAIN),
        ("awr", "AWR", FOLDER, "data-root", b""),
        ("awr23", "2,3 GHZ", FOLDER, "awr", b""),
        ("vswr23", "vswr.txt", "text/plain", "awr23", b"2.3 1.3\n"),
    ];

    async fn drive_files(Query(params): Query<HashMap<String, String>>) -> Json<serde_json::Value> {
        let q = params.get("q").cloned().unwrap_or_default();
        let files: Vec<_> = DRIVE
            .iter()
            .filter(|(_, _, _, parent, _)| q.starts_with(&format!("'{}' in parents", parent)))
            .map(|(id, name, mime, _, _)| json!({ "id": id, "name": name, "mimeType": mime }))
            .collect();
        Json(json!({ "files": files }))
    }

    async fn drive_media(Path(id): Path<String>) -> Response {
        match DRIVE.iter().find(|(fid, ..)| *fid == id) {
            // A zero-length body marks a file the mock refuses to serve
            Some((_, _, _, _, body)) if body.is_empty() => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
            Some((_, _, _, _, body)) => body.to_vec().into_response(),
            None => StatusCode::NOT_FOUND.into_response(),
        }
    }

    fn client() -> reqwest::Client {
        reqwest::Client::builder().no_proxy().build().unwrap()
    }

    async fn fetch(url: String) -> reqwest::Result<reqwest::Response> {
        client().get(url).send().await
    }

    async fn spawn(app: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    async fn spawn_app() -> SocketAddr {
        let drive = spawn(
            Router::new()
                .route("/files", get(drive_files))
                .route("/files/:id", get(drive_media)),
        )
        .await;

        let config = StoreConfig {
            drive_api_base: format!("http://{}", drive),
            api_key: Some("test-key".into()),
            ..StoreConfig::default()
        };
        let images = antenna_assets::open_store("https://drive.google.com/drive/folders/images-root", &config).unwrap();
        let data = antenna_assets::open_store("https://drive.google.com/drive/folders/data-root", &config).unwrap();
        let state = Arc::new(AppState {
            assets: AssetService::from_stores(images, data, &config),
        });
        spawn(router(state)).await
    }

    #[tokio::test]
    async fn test_image_route_through_drive() {
        let app = spawn_app().await;
        let resp = fetch(format!("http://{}/img/top_2_4.png", app)).await.unwrap();
        assert_eq!(resp.status().as_u16(), 200);
        assert_eq!(resp.headers()["content-type"], "image/png");
        assert_eq!(resp.headers()["cache-control"], "public, max-age=31536000, immutable");
        assert_eq!(&resp.bytes().await.unwrap()[..], b"\x89PNG top");

        let missing = fetch(format!("http://{}/img/view_2_4.png", app)).await.unwrap();
        assert_eq!(missing.status().as_u16(), 404);
    }

    #[tokio::test]
    async fn test_data_route() {
        let app = spawn_app().await;
        let resp = fetch(format!("http://{}/data/AWR/2,3/vswr", app)).await.unwrap();
        assert_eq!(resp.status().as_u16(), 200);
        assert_eq!(resp.text().await.unwrap(), "2.3 1.3\n");

        let bad_freq = fetch(format!("http://{}/data/AWR/5.8/vswr", app)).await.unwrap();
        assert_eq!(bad_freq.status().as_u16(), 404);
    }

    #[tokio::test]
    async fn test_plot_routes() {
        let app = spawn_app().await;
        let resp = fetch(format!("http://{}/plot/cst/2.4/gain", app)).await.unwrap();
        assert_eq!(resp.status().as_u16(), 200);
        let body: serde_json::Value = resp.json().await.unwrap();
        let png = STANDARD.decode(body["image"].as_str().unwrap()).unwrap();
        assert_eq!(&png[..4], b"\x89PNG");
        let left = body["meta"]["pad"]["left"].as_f64().unwrap();
        let right = body["meta"]["pad"]["right"].as_f64().unwrap();
        assert!(left + right < 1.0);
        assert!(body["meta"]["xlim"][0].as_f64().unwrap() < 0.0);

        let raw = fetch(format!("http://{}/plot/cst/2.4/gain/png", app)).await.unwrap();
        assert_eq!(raw.headers()["content-type"], "image/png");
    }

    #[tokio::test]
    async fn test_frequency_images_route() {
        let app = spawn_app().await;
        let body: serde_json::Value = fetch(format!("http://{}/frequencies/2.4/images", app))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["top"], "img/top_2_4.png");
        assert_eq!(body["view"], "img/view_2_4.png");
    }

    #[tokio::test]
    async fn test_reindex_route() {
        let app = spawn_app().await;
        let resp = client().post(format!("http://{}/admin/reindex", app)).send().await.unwrap();
        assert_eq!(resp.status().as_u16(), 200);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body, json!({ "images": true, "data": true }));
    }
}
