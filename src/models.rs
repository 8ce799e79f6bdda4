use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::document_requests;

/// Lifecycle state of a document request. Stored as text; any other value in
/// the database is a data error surfaced at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestState {
    Created,
    Uploaded,
    Discarded,
}

impl RequestState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestState::Created => "CREATED",
            RequestState::Uploaded => "UPLOADED",
            RequestState::Discarded => "DISCARDED",
        }
    }

    /// Legal transitions: CREATED -> UPLOADED and CREATED -> DISCARDED.
    /// UPLOADED and DISCARDED are terminal; the only same-state re-entry is
    /// DISCARDED -> DISCARDED, so a repeated discard stays a no-op. A repeat
    /// upload is rejected: the upload path has side effects (blob write,
    /// ledger registration) that must happen exactly once per request.
    pub fn can_transition_to(&self, next: RequestState) -> bool {
        matches!(
            (self, next),
            (RequestState::Created, _) | (RequestState::Discarded, RequestState::Discarded)
        )
    }
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestState {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "CREATED" => Ok(RequestState::Created),
            "UPLOADED" => Ok(RequestState::Uploaded),
            "DISCARDED" => Ok(RequestState::Discarded),
            other => Err(anyhow::anyhow!("unknown request state '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Queryable, Identifiable, Serialize)]
#[diesel(table_name = document_requests)]
pub struct DocumentRequestRow {
    pub id: Uuid,
    pub requester_id: String,
    pub issuer_id: String,
    pub document_type_id: String,
    pub date: DateTime<Utc>,
    pub state: String,
}

#[derive(Debug, Insertable, AsChangeset)]
#[diesel(table_name = document_requests)]
pub struct DocumentRequestChangeset {
    pub id: Uuid,
    pub requester_id: String,
    pub issuer_id: String,
    pub document_type_id: String,
    pub date: DateTime<Utc>,
    pub state: String,
}

/// The primary lifecycle entity linking a requester, an issuer, and an
/// eventual uploaded document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRequest {
    pub id: Uuid,
    pub requester_id: String,
    pub issuer_id: String,
    pub document_type_id: String,
    pub date: DateTime<Utc>,
    pub state: RequestState,
}

impl DocumentRequest {
    pub fn from_row(row: DocumentRequestRow) -> anyhow::Result<Self> {
        let state = row.state.parse()?;
        Ok(Self {
            id: row.id,
            requester_id: row.requester_id,
            issuer_id: row.issuer_id,
            document_type_id: row.document_type_id,
            date: row.date,
            state,
        })
    }

    pub fn into_changeset(self) -> DocumentRequestChangeset {
        DocumentRequestChangeset {
            id: self.id,
            requester_id: self.requester_id,
            issuer_id: self.issuer_id,
            document_type_id: self.document_type_id,
            date: self.date,
            state: self.state.as_str().to_string(),
        }
    }
}

/// Fields supplied by the caller when opening a request. The id, date and
/// state are assigned server-side.
#[derive(Debug, Clone, Deserialize)]
pub struct NewDocumentRequest {
    pub requester_id: String,
    pub issuer_id: String,
    pub document_type_id: String,
}

/// Detailed ledger-held record, keyed by the request id. Field names follow
/// the gateway's wire format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivateDocumentRecord {
    pub document_id: String,
    pub institution: String,
    pub user_id: String,
    pub name: String,
    pub path: String,
    pub hash: String,
    pub state: String,
}

/// Minimal ledger-visible record. Deliberately carries no storage location or
/// display name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicDocumentRecord {
    pub document_id: String,
    pub institution: String,
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivateAuditLogEntry {
    pub document_id: String,
    pub operation: String,
    pub previous_state: Option<String>,
    pub new_state: Option<String>,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicAuditLogEntry {
    pub document_id: String,
    pub operation: String,
    pub previous_state: Option<String>,
    pub new_state: Option<String>,
    pub timestamp: String,
}

/// One row of the combined search output: a metadata record paired with the
/// ledger record sharing its id, when one exists.
#[derive(Debug, Clone, Serialize)]
pub struct RequestSearchResult {
    pub request: DocumentRequest,
    pub record: Option<PrivateDocumentRecord>,
}
