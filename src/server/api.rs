use axum::{
    extract::{multipart::MultipartRejection, Multipart, Path, State},
    Json,
};
use chrono::Utc;
use serde::Serialize;
use tracing::info;

use super::AppState;
use crate::error::{ApiError, ApiResult};
use crate::qr;
use crate::session::ImageRecord;
use crate::storage::validate_session_id;

/// Multipart field carrying the photo
pub const UPLOAD_FIELD: &str = "image";

#[derive(Debug, Serialize)]
pub struct QrCodeResponse {
    #[serde(rename = "qrCode")]
    pub qr_code: String,
    #[serde(rename = "mobileUrl")]
    pub mobile_url: String,
    #[serde(rename = "localIP")]
    pub local_ip: String,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    #[serde(rename = "imageUrl")]
    pub image_url: String,
}

#[derive(Debug, Serialize)]
pub struct ImagesResponse {
    pub images: Vec<ImageRecord>,
}

pub async fn qr_code(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Json<QrCodeResponse>> {
    let mobile_url = qr::mobile_url(&state.mobile_base, &session_id).map_err(ApiError::QrCode)?;
    let qr_code = qr::render_data_uri(mobile_url.as_str()).map_err(ApiError::QrCode)?;

    Ok(Json(QrCodeResponse {
        qr_code,
        mobile_url: mobile_url.into(),
        local_ip: state.local_ip.clone(),
    }))
}

/// Store the photo, then record and broadcast it. Nothing reaches the
/// registry unless the write succeeded.
pub async fn upload_image(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<UploadResponse>> {
    validate_session_id(&session_id)?;

    let mut multipart = multipart.map_err(|_| ApiError::bad_request("No image provided"))?;

    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let content = field.bytes().await?;
        upload = Some((file_name, content));
        break;
    }

    let Some((file_name, content)) = upload else {
        return Err(ApiError::bad_request("No image provided"));
    };
    if file_name.is_empty() || content.is_empty() {
        return Err(ApiError::bad_request("No image selected"));
    }

    let uploaded_at = Utc::now();
    let stored = state
        .uploads
        .store(&session_id, &file_name, &content, uploaded_at)
        .await?;

    let record = ImageRecord::new(stored.file_name, stored.url.clone(), uploaded_at);
    let delivered = state.record_upload(&session_id, record);

    info!(
        session = %session_id,
        url = %stored.url,
        bytes = content.len(),
        images = state.registry.image_count(&session_id),
        delivered,
        "image uploaded"
    );

    Ok(Json(UploadResponse {
        success: true,
        image_url: stored.url,
    }))
}

pub async fn list_images(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Json<ImagesResponse> {
    Json(ImagesResponse {
        images: state.registry.list_images(&session_id),
    })
}
