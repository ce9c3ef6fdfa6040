//! `softgate-commands`: runs administrative commands on behalf of one client.
//!
//! A [`CommandSession`] owns at most one child process at a time. Output from
//! the child (stdout and stderr merged) is relayed line by line as
//! [`ServerMessage`]s through a bounded outbound queue; the transport (see the
//! API crate) drains that queue onto the socket.

pub mod process;
pub mod protocol;
pub mod runner;
pub mod session;

mod relay;

pub use protocol::{ClientMessage, ServerMessage};
pub use runner::{CommandRunner, SpawnError};
pub use session::CommandSession;
