use anyhow::Context;
use jordnaer_chats::{CommandBus, CommandRouter};
use jordnaer_config::load as load_config;
use jordnaer_database::initialize_database;
use jordnaer_gateway::{create_router, ChatHub, GatewayState};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_env_filter(env_filter)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    info!("starting Jordnaer chat backend");

    let config = load_config().context("failed to load configuration")?;

    let db_pool = initialize_database(&config.database)
        .await
        .context("failed to initialize database")?;

    let hub = Arc::new(ChatHub::new());
    let router = Arc::new(CommandRouter::new(db_pool.clone(), hub.clone()));
    let (bus, bus_workers) = CommandBus::start(&config.messaging, router);

    let state = GatewayState::new(db_pool, bus.clone(), hub);
    let app = create_router(state);

    let address = format!("{}:{}", config.http.address, config.http.port);
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;
    info!(%address, "gateway listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    // The router and every other producer handle are gone once the server
    // returns; dropping ours lets the queue workers drain and stop.
    drop(bus);
    for worker in bus_workers {
        if let Err(error) = worker.await {
            warn!(%error, "queue worker terminated abnormally");
        }
    }

    info!("Jordnaer chat backend stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        warn!(?error, "failed to listen for shutdown signal");
    }
    info!("shutdown signal received");
}
