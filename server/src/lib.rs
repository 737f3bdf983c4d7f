//! HTTP surface of the PIGG backend.
//!
//! One axum router; every path answers `OPTIONS` with an empty 200 and
//! accepts cross-origin requests from anywhere. The CORS layer advertises
//! the full method set on every route, whichever subset the route serves.

use anyhow::{Context, Result};
use axum::{
    http::Method,
    routing::{get, post},
    Router,
};
use tokio::{net::TcpListener, signal};
use tower_http::cors::{Any, CorsLayer};

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use config::Config;
use routes::*;
use state::{AppState, SharedState};

pub const ALLOWED_METHODS: [Method; 6] = [
    Method::GET,
    Method::OPTIONS,
    Method::PATCH,
    Method::DELETE,
    Method::POST,
    Method::PUT,
];

pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(ALLOWED_METHODS.to_vec())
        .allow_headers(Any)
}

pub fn app(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health).options(preflight))
        .route(
            "/simulation-state",
            get(fetch_simulation_state)
                .post(save_simulation_state)
                .options(preflight),
        )
        .route(
            "/customers",
            get(get_customer)
                .post(create_customer)
                .delete(delete_customer)
                .options(preflight),
        )
        .route(
            "/risk-profile",
            get(fetch_risk_profile).post(save_risk_profile).options(preflight),
        )
        .route(
            "/login-logs",
            get(list_logins).post(record_login).options(preflight),
        )
        .route(
            "/chat-inquiries",
            post(submit_chat_inquiry)
                .get(list_chat_inquiries)
                .options(preflight),
        )
        .layer(cors_layer())
        .with_state(state)
}

pub async fn start_server(config: Config) -> Result<()> {
    log::info!("Opening store at {}", config.db);
    let store = state::open_store(&config).context("failed to open store")?;
    let app = app(AppState::new(store));

    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    log::info!("Server running on http://{}", config.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => log::info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                log::error!("Failed to install Ctrl+C handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
                log::info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                log::error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
