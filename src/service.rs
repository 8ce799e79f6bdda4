use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::ledger::LedgerClient;
use crate::models::{
    DocumentRequest, NewDocumentRequest, PrivateDocumentRecord, PublicDocumentRecord,
    RequestSearchResult, RequestState,
};
use crate::storage::ObjectStorage;
use crate::store::{RequestFilter, RequestStore};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("illegal state transition {from} -> {to}")]
    InvalidTransition {
        from: RequestState,
        to: RequestState,
    },
    #[error("invalid filter: {0}")]
    InvalidFilter(&'static str),
    #[error("metadata store failure: {0}")]
    Store(#[source] anyhow::Error),
    #[error("blob store failure: {0}")]
    Storage(#[source] anyhow::Error),
    #[error("ledger gateway failure: {0}")]
    Ledger(#[source] anyhow::Error),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Drives the document-request lifecycle across the three collaborators.
///
/// Each operation is one sequential chain of calls; a failed step aborts the
/// rest and leaves prior effects in place (no retries, no compensation). A
/// mid-upload failure can therefore leave a persisted UPLOADED request with
/// no ledger records, or a stored blob with no request update.
pub struct DocumentService {
    store: Arc<dyn RequestStore>,
    storage: Arc<dyn ObjectStorage>,
    ledger: Arc<dyn LedgerClient>,
}

impl DocumentService {
    pub fn new(
        store: Arc<dyn RequestStore>,
        storage: Arc<dyn ObjectStorage>,
        ledger: Arc<dyn LedgerClient>,
    ) -> Self {
        Self {
            store,
            storage,
            ledger,
        }
    }

    /// Opens a request in CREATED state with a server-assigned date.
    pub async fn create_request(&self, new: NewDocumentRequest) -> ServiceResult<DocumentRequest> {
        let request = self
            .store
            .create(new, RequestState::Created, Utc::now())
            .await
            .map_err(ServiceError::Store)?;

        info!(request_id = %request.id, requester_id = %request.requester_id, "document request created");
        Ok(request)
    }

    /// Combined create-and-upload. The request is persisted directly as
    /// UPLOADED: no CREATED row is ever durably observed on this path.
    pub async fn create_request_and_upload(
        &self,
        new: NewDocumentRequest,
        filename: &str,
        data: Vec<u8>,
        content_type: Option<String>,
    ) -> ServiceResult<DocumentRequest> {
        let request = self
            .store
            .create(new, RequestState::Uploaded, Utc::now())
            .await
            .map_err(ServiceError::Store)?;

        let key = format!("{}-{}", request.requester_id, request.id);
        self.store_and_register(&request, &key, filename, data, content_type)
            .await?;

        info!(request_id = %request.id, key = %key, "request created and document uploaded");
        Ok(request)
    }

    /// Discards a request. Absent ids yield `None` without touching the blob
    /// store or the ledger. Discarding twice is a no-op on the second call.
    pub async fn discard_request(&self, id: Uuid) -> ServiceResult<Option<DocumentRequest>> {
        let Some(mut request) = self.store.find_by_id(id).await.map_err(ServiceError::Store)? else {
            return Ok(None);
        };

        Self::transition(&mut request, RequestState::Discarded)?;
        let request = self
            .store
            .save(request)
            .await
            .map_err(ServiceError::Store)?;

        info!(request_id = %id, "document request discarded");
        Ok(Some(request))
    }

    /// Supplies the file for an existing request. An unknown id yields `None`
    /// with zero side effects: no blob write, no ledger call.
    pub async fn upload_document(
        &self,
        id: Uuid,
        filename: &str,
        data: Vec<u8>,
        content_type: Option<String>,
    ) -> ServiceResult<Option<DocumentRequest>> {
        let Some(mut request) = self.store.find_by_id(id).await.map_err(ServiceError::Store)? else {
            warn!(request_id = %id, "upload for unknown request");
            return Ok(None);
        };

        Self::transition(&mut request, RequestState::Uploaded)?;
        let request = self
            .store
            .save(request)
            .await
            .map_err(ServiceError::Store)?;

        let key = blob_key(&request.requester_id, request.id, filename);
        self.store_and_register(&request, &key, filename, data, content_type)
            .await?;

        info!(request_id = %id, key = %key, "document uploaded");
        Ok(Some(request))
    }

    /// User-side search: ledger records looked up by the requester.
    pub async fn user_search_requests(
        &self,
        filter: RequestFilter,
    ) -> ServiceResult<Vec<RequestSearchResult>> {
        let requester_id = filter
            .requester_id
            .clone()
            .ok_or(ServiceError::InvalidFilter("requester_id is required"))?;
        validate_date_range(&filter)?;

        let (records, requests) = tokio::join!(
            self.ledger.query_private_by_user(&requester_id),
            self.store.filter(&filter),
        );

        Ok(join_results(
            requests.map_err(ServiceError::Store)?,
            records.map_err(ServiceError::Ledger)?,
        ))
    }

    /// Institution-side search: ledger records looked up by the issuer.
    pub async fn institution_search_requests(
        &self,
        filter: RequestFilter,
    ) -> ServiceResult<Vec<RequestSearchResult>> {
        let issuer_id = filter
            .issuer_id
            .clone()
            .ok_or(ServiceError::InvalidFilter("issuer_id is required"))?;
        validate_date_range(&filter)?;

        let (records, requests) = tokio::join!(
            self.ledger.query_private_by_institution(&issuer_id),
            self.store.filter(&filter),
        );

        Ok(join_results(
            requests.map_err(ServiceError::Store)?,
            records.map_err(ServiceError::Ledger)?,
        ))
    }

    pub async fn list_requests(&self) -> ServiceResult<Vec<DocumentRequest>> {
        self.store.list_all().await.map_err(ServiceError::Store)
    }

    pub async fn filter_requests(
        &self,
        filter: RequestFilter,
    ) -> ServiceResult<Vec<DocumentRequest>> {
        validate_date_range(&filter)?;
        self.store
            .filter(&filter)
            .await
            .map_err(ServiceError::Store)
    }

    /// Administrative removal, outside the normal lifecycle. Reports whether
    /// the record existed; a repeat call reports `false` without error.
    pub async fn delete_request(&self, id: Uuid) -> ServiceResult<bool> {
        self.store
            .delete_by_id(id)
            .await
            .map_err(ServiceError::Store)
    }

    /// Single mutation point for the state machine; illegal transitions are
    /// rejected, never silently overwritten.
    fn transition(request: &mut DocumentRequest, next: RequestState) -> ServiceResult<()> {
        if !request.state.can_transition_to(next) {
            return Err(ServiceError::InvalidTransition {
                from: request.state,
                to: next,
            });
        }
        request.state = next;
        Ok(())
    }

    /// Shared tail of both upload paths: blob write, then the public and
    /// private ledger registrations, in that order.
    async fn store_and_register(
        &self,
        request: &DocumentRequest,
        key: &str,
        filename: &str,
        data: Vec<u8>,
        content_type: Option<String>,
    ) -> ServiceResult<()> {
        let stored = self
            .storage
            .put_object(key, data, content_type)
            .await
            .map_err(ServiceError::Storage)?;

        let document_id = request.id.to_string();

        self.ledger
            .register_public(&PublicDocumentRecord {
                document_id: document_id.clone(),
                institution: request.issuer_id.clone(),
                user_id: request.requester_id.clone(),
            })
            .await
            .map_err(ServiceError::Ledger)?;

        self.ledger
            .save_private(&PrivateDocumentRecord {
                document_id,
                institution: request.issuer_id.clone(),
                user_id: request.requester_id.clone(),
                name: filename.to_string(),
                path: stored.location,
                hash: stored.integrity_tag,
                state: RequestState::Uploaded.as_str().to_string(),
            })
            .await
            .map_err(ServiceError::Ledger)?;

        Ok(())
    }
}

fn validate_date_range(filter: &RequestFilter) -> ServiceResult<()> {
    if let (Some(from), Some(to)) = (filter.date_from, filter.date_to) {
        if from > to {
            return Err(ServiceError::InvalidFilter("date_from is after date_to"));
        }
    }
    Ok(())
}

/// Blob key for an upload against an existing request; the extension comes
/// from the supplied filename and is omitted when there is none.
fn blob_key(requester_id: &str, id: Uuid, filename: &str) -> String {
    match Path::new(filename).extension().and_then(|ext| ext.to_str()) {
        Some(ext) => format!("{requester_id}-{id}.{ext}"),
        None => format!("{requester_id}-{id}"),
    }
}

/// Left join of metadata rows against ledger records keyed by document id.
/// Every metadata row appears in the output; ledger records with no matching
/// row are dropped. Join key is exact string equality on the id.
fn join_results(
    requests: Vec<DocumentRequest>,
    records: Vec<PrivateDocumentRecord>,
) -> Vec<RequestSearchResult> {
    let mut by_id: std::collections::HashMap<String, PrivateDocumentRecord> = records
        .into_iter()
        .map(|record| (record.document_id.clone(), record))
        .collect();

    requests
        .into_iter()
        .map(|request| {
            let record = by_id.remove(&request.id.to_string());
            RequestSearchResult { request, record }
        })
        .collect()
}
