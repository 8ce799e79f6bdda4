use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, PooledConnection};
use uuid::Uuid;

use crate::db::PgPool;
use crate::models::{DocumentRequest, DocumentRequestRow, NewDocumentRequest, RequestState};
use crate::schema::document_requests;

/// Optional predicates applied conjunctively by [`RequestStore::filter`].
/// Absent predicates are skipped; all-absent returns every record. Date
/// bounds are inclusive on both ends.
#[derive(Debug, Clone, Default)]
pub struct RequestFilter {
    pub requester_id: Option<String>,
    pub issuer_id: Option<String>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
}

/// Durable collection of document requests, consumed by the orchestrator.
#[async_trait]
pub trait RequestStore: Send + Sync + 'static {
    /// Persists a new request, assigning its id.
    async fn create(
        &self,
        new: NewDocumentRequest,
        state: RequestState,
        date: DateTime<Utc>,
    ) -> Result<DocumentRequest>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<DocumentRequest>>;

    /// Full overwrite by id.
    async fn save(&self, request: DocumentRequest) -> Result<DocumentRequest>;

    /// Deletes at most once and reports whether the record existed prior to
    /// the call. Absent ids (including a second delete) return `false`
    /// without error.
    async fn delete_by_id(&self, id: Uuid) -> Result<bool>;

    async fn list_all(&self) -> Result<Vec<DocumentRequest>>;

    async fn filter(&self, filter: &RequestFilter) -> Result<Vec<DocumentRequest>>;
}

pub struct PgRequestStore {
    pool: PgPool,
}

impl PgRequestStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> Result<PooledConnection<ConnectionManager<PgConnection>>> {
        self.pool.get().context("database pool error")
    }
}

#[async_trait]
impl RequestStore for PgRequestStore {
    async fn create(
        &self,
        new: NewDocumentRequest,
        state: RequestState,
        date: DateTime<Utc>,
    ) -> Result<DocumentRequest> {
        let request = DocumentRequest {
            id: Uuid::new_v4(),
            requester_id: new.requester_id,
            issuer_id: new.issuer_id,
            document_type_id: new.document_type_id,
            date,
            state,
        };

        let mut conn = self.conn()?;
        diesel::insert_into(document_requests::table)
            .values(request.clone().into_changeset())
            .execute(&mut conn)
            .context("failed to insert document request")?;

        Ok(request)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<DocumentRequest>> {
        let mut conn = self.conn()?;
        let row: Option<DocumentRequestRow> = document_requests::table
            .find(id)
            .first(&mut conn)
            .optional()
            .context("failed to load document request")?;

        row.map(DocumentRequest::from_row).transpose()
    }

    async fn save(&self, request: DocumentRequest) -> Result<DocumentRequest> {
        let mut conn = self.conn()?;
        let changeset = request.clone().into_changeset();
        diesel::update(document_requests::table.find(request.id))
            .set(&changeset)
            .execute(&mut conn)
            .context("failed to update document request")?;

        Ok(request)
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<bool> {
        let mut conn = self.conn()?;
        let deleted = diesel::delete(document_requests::table.find(id))
            .execute(&mut conn)
            .context("failed to delete document request")?;

        Ok(deleted > 0)
    }

    async fn list_all(&self) -> Result<Vec<DocumentRequest>> {
        let mut conn = self.conn()?;
        let rows: Vec<DocumentRequestRow> = document_requests::table
            .order(document_requests::date.desc())
            .load(&mut conn)
            .context("failed to list document requests")?;

        rows.into_iter().map(DocumentRequest::from_row).collect()
    }

    async fn filter(&self, filter: &RequestFilter) -> Result<Vec<DocumentRequest>> {
        let mut conn = self.conn()?;
        let mut query = document_requests::table.into_boxed();

        if let Some(requester_id) = filter.requester_id.as_ref() {
            query = query.filter(document_requests::requester_id.eq(requester_id));
        }
        if let Some(issuer_id) = filter.issuer_id.as_ref() {
            query = query.filter(document_requests::issuer_id.eq(issuer_id));
        }
        if let Some(from) = filter.date_from {
            query = query.filter(document_requests::date.ge(from));
        }
        if let Some(to) = filter.date_to {
            query = query.filter(document_requests::date.le(to));
        }

        let rows: Vec<DocumentRequestRow> = query
            .order(document_requests::date.desc())
            .load(&mut conn)
            .context("failed to filter document requests")?;

        rows.into_iter().map(DocumentRequest::from_row).collect()
    }
}
