use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tracker_bridge::config::BridgeConfig;
use tracker_bridge::destination::{ClientFactory, change_submission_handler};
use tracker_bridge::pipeline::EventPipeline;
use tracker_bridge::server::{AppState, build_router};
use tracker_bridge::store::{BridgeStore, FileStore, MemoryStore};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tracker_bridge=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match BridgeConfig::from_env() {
        Ok(config) => config,
        Err(error) => {
            tracing::error!(%error, "Invalid configuration");
            std::process::exit(1);
        }
    };

    let store: Arc<dyn BridgeStore> = match &config.data_dir {
        Some(dir) => match FileStore::open(dir) {
            Ok(store) => Arc::new(store),
            Err(error) => {
                tracing::error!(%error, dir = %dir.display(), "Could not open store");
                std::process::exit(1);
            }
        },
        None => {
            tracing::warn!("No BRIDGE_DATA_DIR configured; counters will not survive restarts");
            Arc::new(MemoryStore::new())
        }
    };

    let pipeline = EventPipeline::over_store(Arc::clone(&store), ClientFactory::new());
    let state = AppState::new(
        config.webhook_secret.clone(),
        store,
        pipeline,
        change_submission_handler(),
    );

    let app = build_router(state);

    tracing::info!("listening on {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
