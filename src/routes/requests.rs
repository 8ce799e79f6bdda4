use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::DocumentRequest;
use crate::state::AppState;
use crate::store::RequestFilter;

#[derive(Deserialize, Default)]
pub struct RequestFilterQuery {
    pub requester_id: Option<String>,
    pub issuer_id: Option<String>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
}

impl RequestFilterQuery {
    pub fn is_empty(&self) -> bool {
        self.requester_id.is_none()
            && self.issuer_id.is_none()
            && self.date_from.is_none()
            && self.date_to.is_none()
    }

    pub fn into_filter(self) -> RequestFilter {
        RequestFilter {
            requester_id: self.requester_id.filter(|v| !v.trim().is_empty()),
            issuer_id: self.issuer_id.filter(|v| !v.trim().is_empty()),
            date_from: self.date_from,
            date_to: self.date_to,
        }
    }
}

/// Lists requests, filtered when any query predicate is supplied.
pub async fn list_requests(
    State(state): State<AppState>,
    Query(params): Query<RequestFilterQuery>,
) -> AppResult<Json<Vec<DocumentRequest>>> {
    let requests = if params.is_empty() {
        state.service.list_requests().await?
    } else {
        state.service.filter_requests(params.into_filter()).await?
    };

    Ok(Json(requests))
}

/// Administrative delete; 404 when the id was never there or already gone.
pub async fn delete_request(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    if state.service.delete_request(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found())
    }
}
