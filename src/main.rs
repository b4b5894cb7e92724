use anyhow::Result;
use axum::Router;
use portfolio_tracker::api::{AppState, router};
use portfolio_tracker::api_client::ReqwestPriceProvider;
use portfolio_tracker::config::AppSettings;
use portfolio_tracker::infra::sqlite::{SqliteRepo, connect};
use portfolio_tracker::sources::{DefaultAnalyzers, HttpFetcher};
use portfolio_tracker::usecases::history_service::HistoryService;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = AppSettings::from_env()?;
    let pool = connect(&settings.database_url).await?;
    info!(database_url = %settings.database_url, "Opened snapshot store");

    let provider = Arc::new(ReqwestPriceProvider::new(
        settings.endpoints.price_api_url.clone(),
        settings.price_api_key.clone(),
    ));
    let http = HttpFetcher::new(settings.http_timeout)?;
    let analyzers = Arc::new(DefaultAnalyzers::new(http, settings.endpoints.clone()));
    let service = Arc::new(HistoryService::new(
        Arc::new(SqliteRepo::new(pool)),
        provider,
        analyzers,
    ));

    if let Some(path) = &settings.portfolio_config {
        match service.seed_configuration(path).await {
            Ok(true) => info!(path = %path, "Loaded portfolio configuration"),
            Ok(false) => info!("Keeping stored portfolio configuration"),
            Err(e) => warn!(path = %path, error = %e, "Failed to seed portfolio configuration"),
        }
    }

    let host: IpAddr = settings.server_host.parse()?;
    let app = router(AppState { service });
    serve(app, host, settings.server_port).await;
    Ok(())
}

async fn serve(app: Router, host: IpAddr, port: u16) {
    // Try to bind to the requested port; if it's in use, try a few subsequent ports.
    let max_attempts: u16 = 10;
    let mut last_port = port;
    for offset in 0..max_attempts {
        let Some(try_port) = port.checked_add(offset) else {
            break;
        };
        last_port = try_port;
        let addr = SocketAddr::new(host, try_port);
        match tokio::net::TcpListener::bind(&addr).await {
            Ok(listener) => {
                info!(%addr, "Listening");
                if let Err(e) = axum::serve(listener, app).await {
                    error!(error = %e, "Server failed while serving");
                }
                return;
            }
            Err(e) => {
                warn!(port = try_port, error = %e, "Port unavailable, trying next");
            }
        }
    }
    error!("Failed to bind to any port in range {}..={}", port, last_port);
}
