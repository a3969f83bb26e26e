//! Realtime session service entry point.
//!
//! Wires the two websocket channels, the booking event bridge, and the
//! in-process adapters, then serves until interrupted. Booking lifecycle
//! events arrive from the REST service over `POST /internal/events` and
//! are fanned into the connected clients by the bridge.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::{HeaderValue, StatusCode},
    routing::post,
    Json, Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mindbridge::adapters::events::InMemoryEventBus;
use mindbridge::adapters::memory::{
    InMemoryMessageStore, InMemoryUserDirectory, StaticIdentityVerifier,
};
use mindbridge::adapters::websocket::{
    self, AnonymousChannel, BookedChannel, BookingEventBridge, RealtimeState,
};
use mindbridge::config::AppConfig;
use mindbridge::domain::foundation::EventEnvelope;
use mindbridge::ports::EventPublisher;

const EVICTION_INTERVAL_SECS: u64 = 30;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;
    init_tracing(&config.server.log_level);

    let store = Arc::new(InMemoryMessageStore::with_retention(
        config.realtime.anonymous_retention_secs,
    ));
    let directory = Arc::new(InMemoryUserDirectory::new());
    let verifier = Arc::new(StaticIdentityVerifier::new());

    let booked = Arc::new(BookedChannel::new(store.clone(), directory.clone()));
    let anonymous = Arc::new(AnonymousChannel::new(
        store.clone(),
        config.realtime.max_queue_depth,
    ));

    let bus = Arc::new(InMemoryEventBus::new());
    let bridge = Arc::new(BookingEventBridge::new(booked.clone(), store.clone()));
    bridge.register(bus.as_ref());

    // Overdue matchmaking waiters are swept on a fixed cadence.
    let sweeper = anonymous.clone();
    let max_wait_secs = config.realtime.max_wait_secs;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(EVICTION_INTERVAL_SECS));
        loop {
            interval.tick().await;
            sweeper.evict_overdue(max_wait_secs).await;
        }
    });

    let realtime = RealtimeState {
        booked,
        anonymous,
        verifier,
    };
    let app = Router::new()
        .route("/internal/events", post(ingest_event))
        .with_state(bus)
        .merge(websocket::router(realtime))
        .layer(cors_layer(&config.server))
        .layer(TraceLayer::new_for_http());

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("realtime session service listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server shutdown complete");
    Ok(())
}

/// Accepts an event envelope from the REST service and publishes it on the
/// in-process bus.
async fn ingest_event(
    State(bus): State<Arc<InMemoryEventBus>>,
    Json(envelope): Json<EventEnvelope>,
) -> StatusCode {
    match bus.publish(envelope).await {
        Ok(()) => StatusCode::ACCEPTED,
        Err(e) => {
            tracing::error!("event ingestion failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Browser-facing endpoints allow the configured origins, or anything in
/// development when none are configured.
fn cors_layer(server: &mindbridge::config::ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = server
        .cors_origins_list()
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    if origins.is_empty() {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

fn init_tracing(log_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
