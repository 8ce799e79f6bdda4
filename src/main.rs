use std::sync::Arc;

use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use certidoc::{
    config::AppConfig,
    db,
    ledger::{HttpLedgerClient, LedgerClient},
    routes, s3,
    service::DocumentService,
    state::AppState,
    storage::ObjectStorage,
    store::PgRequestStore,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;
    tracing::info!(
        database_url = %config.redacted_database_url(),
        pool_size = config.database_max_pool_size,
        s3_bucket = %config.s3_bucket,
        ledger_gateway = %config.ledger_gateway_url,
        "loaded certidoc configuration"
    );

    let pool = db::init_pool(&config.database_url, config.database_max_pool_size)?;
    db::run_migrations(&pool)?;

    let storage: Arc<dyn ObjectStorage> = Arc::new(s3::build_storage(&config).await?);
    let ledger: Arc<dyn LedgerClient> = Arc::new(HttpLedgerClient::new(&config.ledger_gateway_url));
    let store = Arc::new(PgRequestStore::new(pool));

    let service = Arc::new(DocumentService::new(
        store,
        storage.clone(),
        ledger.clone(),
    ));

    let addr = format!("{}:{}", config.server_host, config.server_port);
    let state = AppState::new(config, service, storage, ledger);
    let router = routes::create_router(state);

    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "certidoc listening");
    axum::serve(listener, router).await?;

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
