use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use draft_overlay::{
    AppContext, build_router,
    config::{self, Settings},
    services::{
        draft_control::DraftController,
        history::{FirestoreHistoryStore, HistoryStore, SqliteHistoryStore},
        lan,
        store::DocumentStore,
        websocket::Broadcaster,
    },
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = config::load_settings();
    let db_url = config::prepare_database_url(&settings.database_url)?;
    let store = DocumentStore::connect(&db_url)
        .await
        .with_context(|| format!("could not open {db_url}"))?;
    store.seed_defaults().await?;
    info!("Connected to sqlite database.");

    let history = history_backend(&settings, &store).await?;
    let broadcaster = Broadcaster::new(settings.broadcast_capacity);
    let controller = DraftController::load(settings.draft_format, store, broadcaster).await?;

    let app = build_router(AppContext {
        controller: Arc::new(controller),
        history,
        public_dir: settings.public_dir.clone(),
    });

    let listener = tokio::net::TcpListener::bind(&settings.bind_addr)
        .await
        .with_context(|| format!("could not bind {}", settings.bind_addr))?;
    let port = listener.local_addr()?.port();
    let host = lan::lan_host();
    info!("Started server on {}.", settings.bind_addr);
    info!("Local:   http://localhost:{}", port);
    info!("Network: http://{}:{}", host, port);
    if let Err(e) = lan::write_server_ip(&settings.public_dir, &host) {
        warn!("Failed to write serverip.txt: {}", e);
    }
    axum::serve(listener, app).await?;
    Ok(())
}

/// Firestore when a service account key is present, the local database
/// otherwise.
async fn history_backend(
    settings: &Settings,
    store: &DocumentStore,
) -> anyhow::Result<Arc<dyn HistoryStore>> {
    if settings.firestore_credentials.exists() {
        match FirestoreHistoryStore::from_credentials(
            &settings.firestore_credentials,
            settings.firestore_project_id.as_deref(),
            &settings.history_collection,
        )
        .await
        {
            Ok(firestore) => return Ok(Arc::new(firestore)),
            Err(e) => warn!("Firestore unavailable ({}), keeping history locally.", e),
        }
    } else {
        warn!(
            "{} not found, keeping draft history in the local database.",
            settings.firestore_credentials.display()
        );
    }

    let local = SqliteHistoryStore::new(store.pool().clone()).await?;
    Ok(Arc::new(local))
}
