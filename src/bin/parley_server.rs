//! HTTP server for the Parley chat relay.
//!
//! # Environment Variables
//!
//! - `GEMINI_API_KEY`: external credential; without it every message is
//!   answered with a contact reply
//! - `DATABASE_URL`: `PostgreSQL` URL; without it sessions live in memory
//! - `PARLEY_BIND`: listen address, default `0.0.0.0:3000`
//! - `PARLEY_ALLOWED_ORIGINS`: comma-separated CORS origins; default any
//! - `PARLEY_SESSION_TTL_HOURS`: idle retention, `0` keeps sessions forever
//! - `RUST_LOG`: tracing filter, default `parley=info,tower_http=info`

use axum::http::HeaderValue;
use parley::api::{ApiState, router};
use parley::app::open_chat_service;
use parley::chat::{config::ChatConfig, ports::ChatPort};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Boxed error type for the main result.
type BoxError = Box<dyn std::error::Error + Send + Sync>;

const SWEEP_INTERVAL: Duration = Duration::from_secs(3600);

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "parley=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ChatConfig::from_env()?;
    if !config.has_credential() {
        tracing::warn!(
            "GEMINI_API_KEY is not set; chat replies will direct visitors to contact the team"
        );
    }

    let (chat, storage) = open_chat_service(&config).await;
    if let Some(ttl) = config.session_ttl {
        spawn_sweeper(Arc::clone(&chat), ttl);
    }

    let app = router(ApiState::new(chat, storage))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config.allowed_origins));

    tracing::info!(
        addr = %config.bind_addr,
        storage = storage.as_str(),
        model = %config.model,
        "starting chat relay"
    );

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server shutdown complete");
    Ok(())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!(origin = %origin, error = %err, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::permissive().allow_origin(AllowOrigin::list(allowed))
}

fn spawn_sweeper(chat: Arc<dyn ChatPort>, ttl: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            match chat.purge_idle(ttl).await {
                Ok(0) => {}
                Ok(removed) => tracing::info!(removed, "purged idle chat sessions"),
                Err(err) => tracing::warn!(error = %err, "failed to purge idle chat sessions"),
            }
        }
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            park_after_failure(&err, "Ctrl+C").await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => park_after_failure(&err, "SIGTERM").await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received Ctrl+C, shutting down");
        },
        () = terminate => {
            tracing::info!("received SIGTERM, shutting down");
        },
    }
}

/// Logs a handler that failed to install and never resolves, leaving
/// shutdown to the remaining signal source.
async fn park_after_failure(err: &std::io::Error, source: &str) {
    tracing::error!(source, error = %err, "failed to install signal handler");
    std::future::pending::<()>().await;
}
