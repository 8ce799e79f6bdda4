use axum::extract::{Query, State};
use axum::Json;

use crate::error::{AppError, AppResult};
use crate::ledger::AuditLogQuery;
use crate::models::{PrivateAuditLogEntry, PublicAuditLogEntry};
use crate::state::AppState;

/// Immutable audit history, passed straight through to the ledger gateway.
pub async fn query_private_audit_logs(
    State(state): State<AppState>,
    Query(query): Query<AuditLogQuery>,
) -> AppResult<Json<Vec<PrivateAuditLogEntry>>> {
    let entries = state
        .ledger
        .query_private_audit_logs(&query)
        .await
        .map_err(AppError::bad_gateway)?;
    Ok(Json(entries))
}

pub async fn query_public_audit_logs(
    State(state): State<AppState>,
    Query(query): Query<AuditLogQuery>,
) -> AppResult<Json<Vec<PublicAuditLogEntry>>> {
    let entries = state
        .ledger
        .query_public_audit_logs(&query)
        .await
        .map_err(AppError::bad_gateway)?;
    Ok(Json(entries))
}
