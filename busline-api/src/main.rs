use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use busline_api::{app, AppState, AuthConfig};
use busline_booking::{spawn_hold_sweeper, BookingLedger};
use busline_catalog::CatalogStore;
use busline_core::RouteRepository;
use busline_store::{app_config::Config, EventBus};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "busline_api=debug,busline_booking=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting Busline API on port {}", config.server.port);

    let store = busline_store::connect(&config.store)
        .await
        .context("Failed to connect to store")?;

    let catalog = match &config.catalog.seed_path {
        Some(path) => CatalogStore::from_seed_file(path).with_context(|| format!("Failed to load routes from {}", path))?,
        None => CatalogStore::builtin(),
    };
    tracing::info!("Catalog loaded with {} routes", catalog.len());
    let catalog: Arc<dyn RouteRepository> = Arc::new(catalog);

    let ledger = Arc::new(BookingLedger::new(
        store,
        catalog.clone(),
        EventBus::default(),
        &config.ledger,
    ));
    let _sweeper = spawn_hold_sweeper(ledger.clone(), &config.booking);

    let app_state = AppState::new(
        catalog,
        ledger,
        AuthConfig {
            secret: config.auth.jwt_secret.clone(),
            expiration: config.auth.jwt_expiration_seconds,
        },
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(app_state)).await?;
    Ok(())
}
