// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::sync::Mutex;
use tracing_subscriber::EnvFilter;

use crate::application::indicator_source::RemoteFetcher;
use crate::application::panel_service::PanelService;
use crate::application::presenter::ChartPresenter;
use crate::infrastructure::canvas_board::CanvasBoard;
use crate::infrastructure::comtrade::ComtradeSource;
use crate::infrastructure::config::{load_app_config, SourceSettings};
use crate::infrastructure::http::{Relay, UpstreamClient};
use crate::infrastructure::openweather::OpenWeatherSource;
use crate::infrastructure::who_gho::WhoSource;
use crate::infrastructure::world_bank::WorldBankSource;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::router;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let app_config = load_app_config()?;
    let relay = app_config.relay.as_ref().map(Relay::from);
    if let Some(relay) = &app_config.relay {
        tracing::info!("Routing upstream requests through relay {}", relay.url);
    }

    // Create sources (infrastructure layer)
    let client = Arc::new(UpstreamClient::new(
        Duration::from_secs(app_config.sources.timeout_secs),
        relay,
    )?);
    let fetcher = build_fetcher(client, &app_config.sources);

    // Create services (application layer)
    let presenter = ChartPresenter::new(Box::new(CanvasBoard::new()));
    let panel_service = PanelService::new(
        Arc::new(fetcher),
        Arc::new(Mutex::new(presenter)),
        app_config.panels,
    );
    panel_service.mount_all().await;
    tracing::info!("{} panels configured", panel_service.panels().len());

    // Create application state
    let state = Arc::new(AppState { panel_service });

    // Build router (presentation layer)
    let router = router(state);

    // Start server
    let addr: SocketAddr = app_config.server.bind.parse()?;
    tracing::info!("Starting world-indicators service on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}

fn build_fetcher(client: Arc<UpstreamClient>, sources: &SourceSettings) -> RemoteFetcher {
    let comtrade = Arc::new(ComtradeSource::new(
        client.clone(),
        sources.comtrade_base.clone(),
        sources.comtrade_key.clone(),
    ));

    let mut fetcher = RemoteFetcher::new()
        .with_source(Arc::new(WorldBankSource::new(
            client.clone(),
            sources.world_bank_base.clone(),
        )))
        .with_source(Arc::new(WhoSource::new(client.clone(), sources.who_base.clone())))
        .with_source(comtrade.clone())
        .with_partner_source(comtrade);

    match &sources.openweather_key {
        Some(key) => {
            fetcher = fetcher.with_source(Arc::new(OpenWeatherSource::new(
                client,
                sources.openweather_base.clone(),
                key.clone(),
            )));
        }
        None => tracing::warn!("No OpenWeatherMap key configured, weather panels will be empty"),
    }

    fetcher
}
