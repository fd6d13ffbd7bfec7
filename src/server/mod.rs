pub mod api;
pub mod ws;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::{DefaultBodyLimit, State},
    routing::get,
    routing::post,
    Json, Router,
};
use colored::*;
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::info;
use url::Url;

use crate::config::Config;
use crate::net;
use crate::realtime::Notifier;
use crate::session::{ImageRecord, SessionRegistry};
use crate::storage::UploadStore;

/// Shared state handed to every request and socket handler.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<SessionRegistry>,
    pub notifier: Notifier,
    pub uploads: Arc<UploadStore>,
    /// Base url phones are sent to
    pub mobile_base: Url,
    /// LAN address reported to the desktop
    pub local_ip: String,
}

impl AppState {
    pub fn new(uploads: UploadStore, mobile_base: Url, local_ip: String) -> Self {
        let registry = Arc::new(SessionRegistry::new());
        Self {
            notifier: Notifier::new(registry.clone()),
            registry,
            uploads: Arc::new(uploads),
            mobile_base,
            local_ip,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let local_ip = net::local_ip();
        let mobile_base = config.mobile_base_url(&local_ip)?;
        let uploads = UploadStore::new(&config.uploads_dir).with_context(|| {
            format!(
                "Failed to prepare uploads directory {}",
                config.uploads_dir.display()
            )
        })?;

        Ok(Self::new(uploads, mobile_base, local_ip))
    }

    /// Make a stored upload visible: append to the registry first, then
    /// push it to the session's subscribers. Returns the delivery count.
    pub fn record_upload(&self, session_id: &str, record: ImageRecord) -> usize {
        self.registry.append_image(session_id, record.clone());
        self.notifier.publish(session_id, &record)
    }
}

/// Liveness plus a rough view of in-memory load
async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "OK",
        "sessions": state.registry.session_count(),
        "subscribers": state.notifier.subscriber_count(),
    }))
}

pub fn router(state: AppState, config: &Config) -> Router {
    let uploads_root = state.uploads.root().to_path_buf();

    let mut app = Router::new()
        .route("/health", get(health))
        .route("/api/qrcode/{session_id}", get(api::qr_code))
        .route(
            "/api/upload/{session_id}",
            post(api::upload_image).layer(DefaultBodyLimit::max(config.max_upload_bytes)),
        )
        .route("/api/images/{session_id}", get(api::list_images))
        .route("/ws", get(ws::ws_handler))
        .nest_service("/uploads", ServeDir::new(uploads_root));

    if let Some(dir) = &config.static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    app.layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(config: Config) -> Result<()> {
    let state = AppState::from_config(&config)?;
    let addr = config.bind_addr();
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    println!(
        "{} Scan relay running at {}",
        "✓".green(),
        format!("http://localhost:{}", config.port).bright_blue()
    );
    println!(
        "  Network: {}",
        format!("http://{}:{}", state.local_ip, config.port).bright_blue()
    );
    println!("  Phones join via {}", state.mobile_base.as_str().bright_white());

    let app = router(state, &config);
    serve_on(listener, app).await
}

/// Run the app on an already bound listener until the process stops.
pub async fn serve_on(listener: TcpListener, app: Router) -> Result<()> {
    info!(addr = %listener.local_addr()?, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}
