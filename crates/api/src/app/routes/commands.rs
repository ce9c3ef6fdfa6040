//! Command socket: run administrative commands and stream their output.
//!
//! `GET /ws/commands/` upgrades to a WebSocket once the caller is known to
//! hold `commands.run`. Each connection gets its own [`CommandSession`].

use std::sync::Arc;

use axum::{
    extract::{
        Extension,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use softgate_auth::Permission;
use softgate_commands::{CommandRunner, CommandSession, ServerMessage};

use crate::app::errors;
use crate::authz;
use crate::context::PrincipalContext;

pub struct CommandSocketState {
    pub runner: Arc<CommandRunner>,
    pub outbound_capacity: usize,
}

/// GET /ws/commands/
pub async fn command_socket(
    Extension(state): Extension<Arc<CommandSocketState>>,
    Extension(principal): Extension<PrincipalContext>,
    ws: WebSocketUpgrade,
) -> Response {
    if let Err(e) = authz::require(&principal, &Permission::COMMANDS_RUN) {
        return errors::authz_error_to_response(e);
    }

    ws.on_upgrade(move |socket| serve_session(socket, state, principal))
}

async fn serve_session(socket: WebSocket, state: Arc<CommandSocketState>, principal: PrincipalContext) {
    let principal_id = principal.principal_id();
    tracing::info!(%principal_id, "command socket opened");

    let (mut ws_sink, mut ws_stream) = socket.split();
    let (tx, mut rx) = mpsc::channel::<ServerMessage>(state.outbound_capacity);

    // Writer: outbound queue -> socket. The bounded queue is the only
    // throttle on a chatty command.
    let writer = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let text = match serde_json::to_string(&msg) {
                Ok(t) => t,
                Err(e) => {
                    tracing::error!(error = %e, "failed to serialize server message");
                    continue;
                }
            };
            if ws_sink.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    let mut session = CommandSession::open(state.runner.clone(), tx);
    let mut close_code = None;

    while let Some(frame) = ws_stream.next().await {
        match frame {
            Ok(Message::Text(text)) => session.handle_message(&text).await,
            Ok(Message::Close(frame)) => {
                close_code = frame.map(|f| f.code);
                break;
            }
            // Binary frames are not part of the protocol; pings are answered by axum.
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(%principal_id, error = %e, "command socket read failed");
                break;
            }
        }
    }

    // The client is gone: nothing may be sent from here on.
    writer.abort();
    session.close(close_code).await;
    tracing::info!(%principal_id, ?close_code, "command socket closed");
}
