#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Request, Response},
    Router,
};
use scan_relay::{server, AppState, Config, UploadStore};
use tempfile::TempDir;
use tower::ServiceExt;
use url::Url;

pub const BOUNDARY: &str = "scanrelaytestboundary";
pub const LOCAL_IP: &str = "192.168.1.20";

pub struct TestApp {
    pub state: AppState,
    pub config: Config,
    // keeps the upload root alive
    pub dir: TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            uploads_dir: dir.path().join("uploads"),
            max_upload_bytes: 64 * 1024,
            ..Config::default()
        };
        let uploads = UploadStore::new(&config.uploads_dir).unwrap();
        let base = Url::parse(&format!("http://{LOCAL_IP}:8000/")).unwrap();
        let state = AppState::new(uploads, base, LOCAL_IP.to_string());

        Self { state, config, dir }
    }

    pub fn router(&self) -> Router {
        server::router(self.state.clone(), &self.config)
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router().oneshot(request).await.unwrap()
    }

    pub async fn upload(&self, session: &str, file_name: &str, content: &[u8]) -> Response<Body> {
        self.send(upload_request(session, "image", file_name, content))
            .await
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }
}

pub fn multipart_body(field: &str, file_name: &str, content: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\nContent-Type: image/jpeg\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn upload_request(session: &str, field: &str, file_name: &str, content: &[u8]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(format!("/api/upload/{session}"))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(field, file_name, content)))
        .unwrap()
}

pub async fn json_body(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
