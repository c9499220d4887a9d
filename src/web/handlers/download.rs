//! Download handlers.

use axum::{
    body::Body,
    extract::{Path, State},
    http::header,
    response::Response,
    Json,
};
use std::sync::Arc;
use tokio_util::io::ReaderStream;

use crate::web::dto::{ApiResponse, ShareInfoResponse};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;

/// Generate a safe Content-Disposition header value for file downloads.
///
/// Control characters are dropped and quotes/backslashes replaced in the
/// plain `filename` parameter; non-ASCII names also get an RFC 5987
/// `filename*` parameter carrying the exact UTF-8 name.
fn content_disposition_header(filename: &str) -> String {
    let sanitized: String = filename
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| match c {
            '"' | '\\' => '_',
            _ => c,
        })
        .collect();

    if filename.is_ascii() && sanitized == filename {
        return format!("attachment; filename=\"{}\"", filename);
    }

    let ascii_fallback: String = sanitized
        .chars()
        .map(|c| if c.is_ascii() { c } else { '_' })
        .collect();
    let encoded = urlencoding::encode(filename);

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        ascii_fallback, encoded
    )
}

/// GET /download/:id - Stream a shared file.
///
/// - 200 with the blob as an attachment
/// - 404 if no share has this id
/// - 410 if the share has expired (it stays registered until the next sweep)
/// - 500 if the share is valid but its content cannot be read
pub async fn download_file(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response<Body>, ApiError> {
    let (record, file) = state.shares.open_download(&id).await?.into_result(&id)?;

    let length = match file.metadata().await {
        Ok(metadata) => Some(metadata.len()),
        Err(e) => {
            tracing::warn!(%id, error = %e, "Could not stat blob, sending without length");
            None
        }
    };

    let content_type = mime_guess::from_path(&record.name)
        .first_or_octet_stream()
        .to_string();

    let mut builder = Response::builder()
        .header(header::CONTENT_TYPE, content_type)
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition_header(&record.name),
        );
    if let Some(length) = length {
        builder = builder.header(header::CONTENT_LENGTH, length);
    }

    tracing::info!(%id, name = %record.name, "Serving download");

    builder
        .body(Body::from_stream(ReaderStream::new(file)))
        .map_err(|e| {
            tracing::error!("Failed to build response: {}", e);
            ApiError::internal("Failed to build response")
        })
}

/// GET /api/shares/:id - Public metadata for a share.
pub async fn get_share_info(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<ShareInfoResponse>>, ApiError> {
    let record = state.shares.describe(&id).into_result(&id)?;
    Ok(Json(ApiResponse::new(ShareInfoResponse::from_record(&record))))
}
