use axum::{Router, routing::get};

pub mod commands;
pub mod system;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .route("/permissions", get(system::permissions))
        .route("/ws/commands", get(commands::command_socket))
        .route("/ws/commands/", get(commands::command_socket))
}
