use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cache;
mod clock;
mod config;
mod error;
mod forecast;
mod rate_limit;
mod routes;
mod utils;

use clock::{SharedClock, SystemClock};
use config::Config;
use forecast::openweather::OpenWeatherClient;
use routes::{create_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "city_weather=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    tracing::debug!("Loaded {:?}", config);

    let weather_client = Arc::new(OpenWeatherClient::new(&config)?);
    let clock: SharedClock = Arc::new(SystemClock);
    let state = AppState::new(&config, weather_client, clock);

    // Drop stale rate-limit windows so idle clients don't accumulate
    let limiter = state.rate_limiter.clone();
    let prune_every = config.rate_limit_prune_interval;
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(prune_every);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = limiter.prune_expired();
            if removed > 0 {
                tracing::debug!(
                    "Pruned {} rate-limit window(s), {} still tracked",
                    removed,
                    limiter.tracked_clients()
                );
            }
        }
    });

    let app = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server starting on http://{}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
