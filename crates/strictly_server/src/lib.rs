//! Strictly Gomoku server - authoritative five-in-a-row sessions.
//!
//! # Architecture
//!
//! - **Session**: one game, its seats, votes, grace timer and opponent turns
//! - **Registry**: every live session, the wait queue and identity indices
//! - **Gateway**: binds identities to connections and dispatches requests
//! - **Transport**: WebSocket binding of the gateway (axum)
//!
//! # Example
//!
//! ```no_run
//! use strictly_server::{ClientRequest, Gateway, ServerConfig};
//!
//! # async fn example() {
//! let gateway = Gateway::new(ServerConfig::default());
//! let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
//! let conn = gateway.connect(tx);
//! gateway
//!     .dispatch(conn, ClientRequest::ClaimIdentity { name: "alice".into() })
//!     .await;
//! let accepted = rx.recv().await;
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod directory;
mod error;
mod gateway;
mod identity;
mod protocol;
mod registry;
mod session;
pub mod selfplay;
mod transport;

pub use config::{ConfigError, DEFAULT_CONFIG_FILE, ServerConfig};
pub use directory::{ChannelDirectory, EventSink};
pub use error::GatewayError;
pub use gateway::Gateway;
pub use identity::validate_name;
pub use protocol::{
    ClientRequest, ConnectionId, Identity, Outbound, ServerEvent, SessionId, StateSnapshot,
};
pub use registry::{RegistryStats, SessionRegistry, SharedSession};
pub use session::{Effects, GameSession, Occupant, Seat};
pub use transport::{Health, router, serve_socket};
