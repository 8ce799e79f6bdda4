use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::models::{
    PrivateAuditLogEntry, PrivateDocumentRecord, PublicAuditLogEntry, PublicDocumentRecord,
};

/// Audit-log query parameters, passed through to the gateway as plain strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogQuery {
    pub filter_type: String,
    pub filter_value: String,
    pub start_date: String,
    pub end_date: String,
}

/// Remote gateway holding the append-only public/private document records and
/// their audit history. Every call is a network round trip and may fail
/// independently of the other collaborators; callers do not retry.
#[async_trait]
pub trait LedgerClient: Send + Sync + 'static {
    async fn save_private(&self, record: &PrivateDocumentRecord) -> Result<()>;

    async fn update_private_state(&self, id: &str, new_state: &str) -> Result<()>;

    async fn get_private(&self, id: &str) -> Result<PrivateDocumentRecord>;

    async fn query_private_by_institution(
        &self,
        institution: &str,
    ) -> Result<Vec<PrivateDocumentRecord>>;

    async fn query_private_by_user(&self, user_id: &str) -> Result<Vec<PrivateDocumentRecord>>;

    async fn query_private_audit_logs(
        &self,
        query: &AuditLogQuery,
    ) -> Result<Vec<PrivateAuditLogEntry>>;

    async fn register_public(&self, record: &PublicDocumentRecord) -> Result<()>;

    async fn get_public(&self, id: &str) -> Result<PublicDocumentRecord>;

    async fn query_public_by_institution(
        &self,
        institution: &str,
    ) -> Result<Vec<PublicDocumentRecord>>;

    async fn query_public_by_user(&self, user_id: &str) -> Result<Vec<PublicDocumentRecord>>;

    async fn query_public_audit_logs(
        &self,
        query: &AuditLogQuery,
    ) -> Result<Vec<PublicAuditLogEntry>>;
}

pub struct HttpLedgerClient {
    http: Client,
    base_url: String,
}

impl HttpLedgerClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

#[async_trait]
impl LedgerClient for HttpLedgerClient {
    async fn save_private(&self, record: &PrivateDocumentRecord) -> Result<()> {
        self.http
            .post(self.url("/privatedocuments"))
            .json(record)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .context("ledger gateway rejected private record")?;
        Ok(())
    }

    async fn update_private_state(&self, id: &str, new_state: &str) -> Result<()> {
        self.http
            .put(self.url(&format!("/privatedocuments/{id}/state")))
            .query(&[("newState", new_state)])
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .context("ledger gateway rejected state update")?;
        Ok(())
    }

    async fn get_private(&self, id: &str) -> Result<PrivateDocumentRecord> {
        let record = self
            .http
            .get(self.url(&format!("/privatedocuments/{id}")))
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .context("failed to fetch private record")?
            .json()
            .await
            .context("invalid private record payload")?;
        Ok(record)
    }

    async fn query_private_by_institution(
        &self,
        institution: &str,
    ) -> Result<Vec<PrivateDocumentRecord>> {
        let records = self
            .http
            .get(self.url(&format!("/privatedocuments/institution/{institution}")))
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .context("failed to query private records by institution")?
            .json()
            .await
            .context("invalid private record list payload")?;
        Ok(records)
    }

    async fn query_private_by_user(&self, user_id: &str) -> Result<Vec<PrivateDocumentRecord>> {
        let records = self
            .http
            .get(self.url(&format!("/privatedocuments/user/{user_id}")))
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .context("failed to query private records by user")?
            .json()
            .await
            .context("invalid private record list payload")?;
        Ok(records)
    }

    async fn query_private_audit_logs(
        &self,
        query: &AuditLogQuery,
    ) -> Result<Vec<PrivateAuditLogEntry>> {
        let entries = self
            .http
            .get(self.url("/privatedocuments/audit"))
            .query(query)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .context("failed to query private audit logs")?
            .json()
            .await
            .context("invalid audit log payload")?;
        Ok(entries)
    }

    async fn register_public(&self, record: &PublicDocumentRecord) -> Result<()> {
        self.http
            .post(self.url("/publicdocuments"))
            .json(record)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .context("ledger gateway rejected public record")?;
        Ok(())
    }

    async fn get_public(&self, id: &str) -> Result<PublicDocumentRecord> {
        let record = self
            .http
            .get(self.url(&format!("/publicdocuments/{id}")))
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .context("failed to fetch public record")?
            .json()
            .await
            .context("invalid public record payload")?;
        Ok(record)
    }

    async fn query_public_by_institution(
        &self,
        institution: &str,
    ) -> Result<Vec<PublicDocumentRecord>> {
        let records = self
            .http
            .get(self.url(&format!("/publicdocuments/institution/{institution}")))
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .context("failed to query public records by institution")?
            .json()
            .await
            .context("invalid public record list payload")?;
        Ok(records)
    }

    async fn query_public_by_user(&self, user_id: &str) -> Result<Vec<PublicDocumentRecord>> {
        let records = self
            .http
            .get(self.url(&format!("/publicdocuments/user/{user_id}")))
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .context("failed to query public records by user")?
            .json()
            .await
            .context("invalid public record list payload")?;
        Ok(records)
    }

    async fn query_public_audit_logs(
        &self,
        query: &AuditLogQuery,
    ) -> Result<Vec<PublicAuditLogEntry>> {
        let entries = self
            .http
            .get(self.url("/publicdocuments/audit"))
            .query(query)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .context("failed to query public audit logs")?
            .json()
            .await
            .context("invalid audit log payload")?;
        Ok(entries)
    }
}
