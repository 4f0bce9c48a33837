use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use unitrack::api::router;
use unitrack::config::Config;
use unitrack::db::{self, LocalStore};
use unitrack::remote::RestStoreClient;
use unitrack::services::{Backend, SessionHub, SessionListener, SyncService};
use unitrack::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "unitrack=debug".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let pool = db::connect(&config.database_url).await?;
    let local = LocalStore::new(pool);

    let backend = match config.resolve_remote(&local).await? {
        Some(remote) => Backend::Remote(Arc::new(RestStoreClient::new(remote)?)),
        None => Backend::Local(local.clone()),
    };
    info!("Sync strategy: {:?}", config.strategy);

    let sync = Arc::new(SyncService::new(backend, config.strategy));
    let sessions = SessionHub::new();

    // subscribe before the first load so no sign-in is missed
    let listener = SessionListener::new(sync.clone(), &sessions);
    if let Err(e) = sync.initialize(&sessions).await {
        warn!("Initial load failed: {}", e);
    }
    tokio::spawn(listener.start());

    let state = AppState {
        sync,
        sessions,
        local,
    };

    let app = router(state);

    info!("listening on http://{}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
