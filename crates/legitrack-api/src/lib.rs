//! HTTP API: bill reads from the local mirror, accounts, saved interests.

pub mod auth;
pub mod error;
mod handlers;
pub mod models;
pub mod state;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

pub use error::ApiError;
pub use state::AppState;

/// The full application: routes, permissive CORS, request tracing.
pub fn app(state: AppState) -> Router {
    handlers::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Serve until `shutdown` resolves, then drain in-flight requests.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    info!(%addr, "HTTP API listening");
    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown)
        .await
}
