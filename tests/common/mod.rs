use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request};
use axum::Router;
use certidoc::config::AppConfig;
use certidoc::ledger::{AuditLogQuery, LedgerClient};
use certidoc::models::{
    DocumentRequest, NewDocumentRequest, PrivateAuditLogEntry, PrivateDocumentRecord,
    PublicAuditLogEntry, PublicDocumentRecord, RequestState,
};
use certidoc::routes;
use certidoc::service::DocumentService;
use certidoc::state::AppState;
use certidoc::storage::{FetchedObject, ObjectStorage, StoredObject};
use certidoc::store::{RequestFilter, RequestStore};
use chrono::{DateTime, Utc};
use http_body_util::BodyExt;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use tower::util::ServiceExt;
use uuid::Uuid;

#[derive(Default)]
pub struct MemoryRequestStore {
    requests: Mutex<HashMap<Uuid, DocumentRequest>>,
}

impl MemoryRequestStore {
    #[allow(dead_code)]
    pub async fn get(&self, id: Uuid) -> Option<DocumentRequest> {
        self.requests.lock().await.get(&id).cloned()
    }
}

#[async_trait]
impl RequestStore for MemoryRequestStore {
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
        self.requests
            .lock()
            .await
            .insert(request.id, request.clone());
        Ok(request)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<DocumentRequest>> {
        Ok(self.requests.lock().await.get(&id).cloned())
    }

    async fn save(&self, request: DocumentRequest) -> Result<DocumentRequest> {
        self.requests
            .lock()
            .await
            .insert(request.id, request.clone());
        Ok(request)
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<bool> {
        Ok(self.requests.lock().await.remove(&id).is_some())
    }

    async fn list_all(&self) -> Result<Vec<DocumentRequest>> {
        Ok(self.requests.lock().await.values().cloned().collect())
    }

    async fn filter(&self, filter: &RequestFilter) -> Result<Vec<DocumentRequest>> {
        let guard = self.requests.lock().await;
        Ok(guard
            .values()
            .filter(|request| {
                filter
                    .requester_id
                    .as_ref()
                    .map_or(true, |v| &request.requester_id == v)
                    && filter
                        .issuer_id
                        .as_ref()
                        .map_or(true, |v| &request.issuer_id == v)
                    && filter.date_from.map_or(true, |from| request.date >= from)
                    && filter.date_to.map_or(true, |to| request.date <= to)
            })
            .cloned()
            .collect())
    }
}

#[derive(Clone)]
pub struct FakeBlob {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// In-memory blob store; the integrity tag is the sha256 of the content,
/// playing the role S3's ETag plays in production.
#[derive(Default)]
pub struct FakeStorage {
    objects: Mutex<HashMap<String, FakeBlob>>,
    pub puts: AtomicUsize,
}

impl FakeStorage {
    #[allow(dead_code)]
    pub async fn get(&self, key: &str) -> Option<FakeBlob> {
        self.objects.lock().await.get(key).cloned()
    }

    #[allow(dead_code)]
    pub async fn object_count(&self) -> usize {
        self.objects.lock().await.len()
    }
}

#[async_trait]
impl ObjectStorage for FakeStorage {
    async fn put_object(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: Option<String>,
    ) -> Result<StoredObject> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        let integrity_tag = hex::encode(Sha256::digest(&bytes));
        self.objects.lock().await.insert(
            key.to_string(),
            FakeBlob {
                bytes,
                content_type,
            },
        );
        Ok(StoredObject {
            location: format!("https://fake-storage/{key}"),
            integrity_tag,
        })
    }

    async fn get_object(&self, key: &str) -> Result<Option<FetchedObject>> {
        Ok(self.objects.lock().await.get(key).map(|blob| FetchedObject {
            bytes: blob.bytes.clone(),
            content_type: blob.content_type.clone(),
        }))
    }
}

#[derive(Default)]
pub struct FakeLedger {
    pub public: Mutex<Vec<PublicDocumentRecord>>,
    pub private: Mutex<Vec<PrivateDocumentRecord>>,
    pub audit_private: Mutex<Vec<PrivateAuditLogEntry>>,
    pub audit_public: Mutex<Vec<PublicAuditLogEntry>>,
    pub calls: AtomicUsize,
}

#[async_trait]
impl LedgerClient for FakeLedger {
    async fn save_private(&self, record: &PrivateDocumentRecord) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.private.lock().await.push(record.clone());
        Ok(())
    }

    async fn update_private_state(&self, id: &str, new_state: &str) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut guard = self.private.lock().await;
        for record in guard.iter_mut().filter(|r| r.document_id == id) {
            record.state = new_state.to_string();
        }
        Ok(())
    }

    async fn get_private(&self, id: &str) -> Result<PrivateDocumentRecord> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.private
            .lock()
            .await
            .iter()
            .find(|r| r.document_id == id)
            .cloned()
            .ok_or_else(|| anyhow!("private record {id} missing"))
    }

    async fn query_private_by_institution(
        &self,
        institution: &str,
    ) -> Result<Vec<PrivateDocumentRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .private
            .lock()
            .await
            .iter()
            .filter(|r| r.institution == institution)
            .cloned()
            .collect())
    }

    async fn query_private_by_user(&self, user_id: &str) -> Result<Vec<PrivateDocumentRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .private
            .lock()
            .await
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn query_private_audit_logs(
        &self,
        _query: &AuditLogQuery,
    ) -> Result<Vec<PrivateAuditLogEntry>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.audit_private.lock().await.clone())
    }

    async fn register_public(&self, record: &PublicDocumentRecord) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.public.lock().await.push(record.clone());
        Ok(())
    }

    async fn get_public(&self, id: &str) -> Result<PublicDocumentRecord> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.public
            .lock()
            .await
            .iter()
            .find(|r| r.document_id == id)
            .cloned()
            .ok_or_else(|| anyhow!("public record {id} missing"))
    }

    async fn query_public_by_institution(
        &self,
        institution: &str,
    ) -> Result<Vec<PublicDocumentRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .public
            .lock()
            .await
            .iter()
            .filter(|r| r.institution == institution)
            .cloned()
            .collect())
    }

    async fn query_public_by_user(&self, user_id: &str) -> Result<Vec<PublicDocumentRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .public
            .lock()
            .await
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn query_public_audit_logs(
        &self,
        _query: &AuditLogQuery,
    ) -> Result<Vec<PublicAuditLogEntry>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.audit_public.lock().await.clone())
    }
}

pub struct TestApp {
    router: Router,
    store: Arc<MemoryRequestStore>,
    storage: Arc<FakeStorage>,
    ledger: Arc<FakeLedger>,
}

impl TestApp {
    pub fn new() -> Self {
        let config = AppConfig {
            database_url: "postgres://unused".to_string(),
            database_max_pool_size: 1,
            server_host: "127.0.0.1".to_string(),
            server_port: 0,
            cors_allowed_origin: None,
            aws_endpoint_url: None,
            aws_access_key_id: None,
            aws_secret_access_key: None,
            aws_region: "us-east-1".to_string(),
            s3_bucket: "test-bucket".to_string(),
            ledger_gateway_url: "http://ledger.test".to_string(),
        };

        let store = Arc::new(MemoryRequestStore::default());
        let storage = Arc::new(FakeStorage::default());
        let ledger = Arc::new(FakeLedger::default());

        let service = Arc::new(DocumentService::new(
            store.clone(),
            storage.clone(),
            ledger.clone(),
        ));
        let state = AppState::new(config, service, storage.clone(), ledger.clone());
        let router = routes::create_router(state);

        Self {
            router,
            store,
            storage,
            ledger,
        }
    }

    #[allow(dead_code)]
    pub fn store(&self) -> Arc<MemoryRequestStore> {
        self.store.clone()
    }

    pub fn storage(&self) -> Arc<FakeStorage> {
        self.storage.clone()
    }

    pub fn ledger(&self) -> Arc<FakeLedger> {
        self.ledger.clone()
    }

    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
    ) -> Result<hyper::Response<Body>> {
        let body = serde_json::to_vec(payload)?;
        let request = Request::builder()
            .method(Method::POST)
            .uri(path)
            .header("content-type", "application/json")
            .body(Body::from(body))?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    pub async fn get(&self, path: &str) -> Result<hyper::Response<Body>> {
        let request = Request::builder()
            .method(Method::GET)
            .uri(path)
            .body(Body::empty())?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    pub async fn delete(&self, path: &str) -> Result<hyper::Response<Body>> {
        let request = Request::builder()
            .method(Method::DELETE)
            .uri(path)
            .body(Body::empty())?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    pub async fn post_multipart(
        &self,
        path: &str,
        filename: &str,
        content_type: &str,
        data: &[u8],
        extra_fields: &[(&str, &str)],
    ) -> Result<hyper::Response<Body>> {
        let boundary = format!("boundary-{}", Uuid::new_v4());
        let mut body = Vec::new();
        body.extend(format!("--{boundary}\r\n").as_bytes());
        body.extend(
            format!(
                "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n",
                filename
            )
            .as_bytes(),
        );
        body.extend(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
        body.extend(data);
        body.extend(b"\r\n");

        for (name, value) in extra_fields {
            body.extend(format!("--{boundary}\r\n").as_bytes());
            body.extend(
                format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
            );
            body.extend(value.as_bytes());
            body.extend(b"\r\n");
        }

        body.extend(format!("--{boundary}--\r\n").as_bytes());

        let request = Request::builder()
            .method(Method::POST)
            .uri(path)
            .header(
                "content-type",
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }
}

pub async fn body_to_vec(body: Body) -> Result<Vec<u8>> {
    let collected = body
        .collect()
        .await
        .map_err(|err| anyhow!("failed to read response body: {err}"))?;
    Ok(collected.to_bytes().to_vec())
}
