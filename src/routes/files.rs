use axum::extract::{Multipart, Path, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::IntoResponse;
use serde_json::json;
use tracing::error;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

fn attachment_content_disposition(filename: &str) -> String {
    let sanitized: String = filename
        .chars()
        .map(|ch| match ch {
            '"' | '\\' => '_',
            _ => ch,
        })
        .collect();

    let encoded =
        percent_encoding::utf8_percent_encode(&sanitized, percent_encoding::NON_ALPHANUMERIC);
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        sanitized, encoded
    )
}

/// Raw file upload, keyed by the original filename.
pub async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, axum::Json<serde_json::Value>)> {
    let mut stored = None;

    while let Some(field) = multipart.next_field().await.map_err(|err| {
        error!(error = %err, "invalid multipart data");
        AppError::bad_request(format!("invalid multipart data: {err}"))
    })? {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field
            .file_name()
            .map(|n| n.to_string())
            .ok_or_else(|| AppError::bad_request("filename is required"))?;
        let content_type = field.content_type().map(|mime| mime.to_string());
        let bytes = field
            .bytes()
            .await
            .map_err(|err| AppError::bad_request(format!("failed to read file bytes: {err}")))?
            .to_vec();

        if bytes.is_empty() {
            return Err(AppError::bad_request("file field must not be empty"));
        }

        let object = state
            .storage
            .put_object(&filename, bytes, content_type)
            .await
            .map_err(AppError::bad_gateway)?;

        stored = Some((filename, object));
    }

    let (filename, object) = stored.ok_or_else(|| AppError::bad_request("file field is required"))?;

    Ok((
        StatusCode::CREATED,
        axum::Json(json!({
            "key": filename,
            "location": object.location,
            "integrity_tag": object.integrity_tag,
        })),
    ))
}

/// Streams the stored bytes back with the content type and a suggested
/// attachment filename equal to the key.
pub async fn download_file(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> AppResult<impl IntoResponse> {
    let object = state
        .storage
        .get_object(&key)
        .await
        .map_err(AppError::bad_gateway)?
        .ok_or_else(AppError::not_found)?;

    let content_type = object
        .content_type
        .unwrap_or_else(|| mime_guess::from_path(&key).first_or_octet_stream().to_string());

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&content_type)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
    );
    if let Ok(value) = HeaderValue::from_str(&attachment_content_disposition(&key)) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }

    Ok((headers, object.bytes))
}
