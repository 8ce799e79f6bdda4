use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use tracing::{error, info};
use uuid::Uuid;

use super::requests::RequestFilterQuery;
use crate::error::{AppError, AppResult};
use crate::models::{DocumentRequest, NewDocumentRequest, RequestSearchResult};
use crate::state::AppState;

struct UploadedFile {
    bytes: Vec<u8>,
    filename: String,
    content_type: Option<String>,
}

/// Pulls the `file` field out of a multipart body, collecting any other text
/// fields into the returned map.
async fn read_multipart(
    multipart: &mut Multipart,
) -> AppResult<(Option<UploadedFile>, Vec<(String, String)>)> {
    let mut file = None;
    let mut fields = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(|err| {
        error!(error = %err, "invalid multipart data");
        AppError::bad_request(format!("invalid multipart data: {err}"))
    })? {
        let name = field.name().map(|n| n.to_string());
        match name.as_deref() {
            Some("file") => {
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
                file = Some(UploadedFile {
                    bytes,
                    filename,
                    content_type,
                });
            }
            Some(other) => {
                let key = other.to_string();
                let value = field
                    .text()
                    .await
                    .map_err(|err| AppError::bad_request(format!("invalid field '{key}': {err}")))?;
                fields.push((key, value));
            }
            None => {}
        }
    }

    Ok((file, fields))
}

fn require_file(file: Option<UploadedFile>) -> AppResult<UploadedFile> {
    let file = file.ok_or_else(|| AppError::bad_request("file field is required"))?;
    if file.bytes.is_empty() {
        return Err(AppError::bad_request("file field must not be empty"));
    }
    Ok(file)
}

fn field<'a>(fields: &'a [(String, String)], name: &str) -> AppResult<&'a str> {
    fields
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| AppError::bad_request(format!("{name} field is required")))
}

/// Opens a new request in CREATED state.
pub async fn create_request(
    State(state): State<AppState>,
    Json(payload): Json<NewDocumentRequest>,
) -> AppResult<(StatusCode, Json<DocumentRequest>)> {
    if payload.requester_id.trim().is_empty() || payload.issuer_id.trim().is_empty() {
        return Err(AppError::bad_request(
            "requester_id and issuer_id must not be empty",
        ));
    }

    let request = state.service.create_request(payload).await?;
    Ok((StatusCode::CREATED, Json(request)))
}

/// Combined create-and-upload: request fields and the file in one multipart
/// body. The request is only ever persisted as UPLOADED.
pub async fn create_request_and_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<DocumentRequest>)> {
    let (file, fields) = read_multipart(&mut multipart).await?;
    let file = require_file(file)?;

    let payload = NewDocumentRequest {
        requester_id: field(&fields, "requester_id")?.to_string(),
        issuer_id: field(&fields, "issuer_id")?.to_string(),
        document_type_id: field(&fields, "document_type_id")?.to_string(),
    };

    let request = state
        .service
        .create_request_and_upload(payload, &file.filename, file.bytes, file.content_type)
        .await?;

    info!(request_id = %request.id, "combined create-and-upload accepted");
    Ok((StatusCode::CREATED, Json(request)))
}

pub async fn discard_request(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<DocumentRequest>> {
    let request = state
        .service
        .discard_request(id)
        .await?
        .ok_or_else(AppError::not_found)?;

    Ok(Json(request))
}

pub async fn upload_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> AppResult<Json<DocumentRequest>> {
    let (file, _) = read_multipart(&mut multipart).await?;
    let file = require_file(file)?;

    let request = state
        .service
        .upload_document(id, &file.filename, file.bytes, file.content_type)
        .await?
        .ok_or_else(AppError::not_found)?;

    Ok(Json(request))
}

pub async fn user_search(
    State(state): State<AppState>,
    Query(params): Query<RequestFilterQuery>,
) -> AppResult<Json<Vec<RequestSearchResult>>> {
    let results = state
        .service
        .user_search_requests(params.into_filter())
        .await?;
    Ok(Json(results))
}

pub async fn institution_search(
    State(state): State<AppState>,
    Query(params): Query<RequestFilterQuery>,
) -> AppResult<Json<Vec<RequestSearchResult>>> {
    let results = state
        .service
        .institution_search_requests(params.into_filter())
        .await?;
    Ok(Json(results))
}
