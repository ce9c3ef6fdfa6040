//! HTTP API application wiring (Axum router + shared state).
//!
//! - `routes/`: HTTP/WebSocket routes + handlers (one file per area)
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

use crate::config::AppConfig;
use crate::middleware;

pub mod errors;
pub mod routes;

/// Build the full HTTP router (public entrypoint used by `main.rs` and tests).
pub fn build_app(config: AppConfig) -> Router {
    let jwt = Arc::new(softgate_auth::Hs256JwtValidator::new(config.jwt_secret.into_bytes()));
    let auth_state = middleware::AuthState { jwt };

    let commands = Arc::new(routes::commands::CommandSocketState {
        runner: Arc::new(config.runner),
        outbound_capacity: config.outbound_capacity,
    });

    // Protected routes: require a valid token.
    let protected = routes::router().layer(
        ServiceBuilder::new()
            .layer(axum::middleware::from_fn_with_state(
                auth_state,
                middleware::auth_middleware,
            ))
            .layer(Extension(commands)),
    );

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(protected)
}
