//! HTTP/WebSocket API: server wiring, auth middleware, and the command socket.

pub mod app;
pub mod authz;
pub mod config;
pub mod context;
pub mod middleware;
