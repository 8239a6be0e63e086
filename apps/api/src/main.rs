mod config;
mod delivery;
mod errors;
mod ranking;
mod routes;
mod session;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::delivery::DeliveryClient;
use crate::ranking::scoring::{RandomPrefixSelector, RandomScoreProvider};
use crate::routes::build_router;
use crate::session::{Scoring, SessionSettings};
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on malformed env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={},tower_http={}",
                env!("CARGO_CRATE_NAME"),
                &config.rust_log,
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Resume Ranker v{}", env!("CARGO_PKG_VERSION"));

    // Initialize webhook delivery client
    let delivery = DeliveryClient::new(Duration::from_secs(config.delivery_timeout_secs))?;
    info!(
        "Delivery client initialized (timeout: {}s, endpoint: {})",
        config.delivery_timeout_secs,
        config.webhook_url.as_deref().unwrap_or("<none>")
    );

    // Demo scoring backends (seeded when RANKER_SEED is set)
    let scoring = Scoring {
        scores: Arc::new(RandomScoreProvider::new(config.ranker_seed)),
        selector: Arc::new(RandomPrefixSelector::new(config.ranker_seed)),
    };
    info!(
        "Scoring: {} (seed: {:?})",
        scoring.scores.name(),
        config.ranker_seed
    );

    // Start the session coordinator
    let session = session::spawn(
        SessionSettings {
            max_files: config.max_files,
            analysis_delay: Duration::from_millis(config.analysis_delay_ms),
            webhook_url: config.webhook_url.clone(),
        },
        scoring,
        Arc::new(delivery),
    );
    info!(
        "Session coordinator started (max files: {}, analysis delay: {}ms)",
        config.max_files, config.analysis_delay_ms
    );

    // Build app state
    let state = AppState {
        config: config.clone(),
        session,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // the widget is served from its own origin

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
