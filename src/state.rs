use std::sync::Arc;

use crate::{
    config::AppConfig, ledger::LedgerClient, service::DocumentService, storage::ObjectStorage,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub service: Arc<DocumentService>,
    pub storage: Arc<dyn ObjectStorage>,
    pub ledger: Arc<dyn LedgerClient>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        service: Arc<DocumentService>,
        storage: Arc<dyn ObjectStorage>,
        ledger: Arc<dyn LedgerClient>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            service,
            storage,
            ledger,
        }
    }
}
