//! Connection gateway: identity binding and request dispatch.
//!
//! [`Gateway::handle`] turns one request into the events it produces without
//! touching any transport, so every protocol flow can be driven from tests
//! with plain channels.

use crate::config::ServerConfig;
use crate::directory::{ChannelDirectory, EventSink};
use crate::error::GatewayError;
use crate::identity::validate_name;
use crate::protocol::{ClientRequest, ConnectionId, Identity, Outbound, ServerEvent};
use crate::registry::SessionRegistry;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, instrument, warn};

/// Routes requests from live connections to the session registry.
#[derive(Debug, Clone)]
pub struct Gateway {
    directory: Arc<ChannelDirectory>,
    registry: SessionRegistry,
}

impl Gateway {
    /// Creates a gateway with an empty registry.
    #[instrument(skip_all)]
    pub fn new(config: ServerConfig) -> Self {
        let directory = Arc::new(ChannelDirectory::new());
        let sink: Arc<dyn EventSink> = directory.clone();
        Self {
            registry: SessionRegistry::new(config, sink),
            directory,
        }
    }

    /// The session registry.
    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Open connections.
    pub fn connections(&self) -> usize {
        self.directory.len()
    }

    /// Registers a connection whose events go to `sender`.
    pub fn connect(&self, sender: UnboundedSender<ServerEvent>) -> ConnectionId {
        self.directory.open(sender)
    }

    /// Handles one request and delivers the resulting events.
    pub async fn dispatch(&self, conn: ConnectionId, request: ClientRequest) {
        let outbound = self.handle(conn, request).await;
        self.directory.deliver(outbound);
    }

    /// Handles one request, returning the events it produces.
    ///
    /// Refusals become a single rejection event for `conn`. Events that
    /// schedule an opponent turn are delivered directly and not returned.
    #[instrument(skip(self))]
    pub async fn handle(&self, conn: ConnectionId, request: ClientRequest) -> Vec<Outbound> {
        match self.route(conn, request).await {
            Ok(outbound) => outbound,
            Err(err) => {
                match &err {
                    GatewayError::Internal { .. } => warn!(%conn, %err, "Request failed"),
                    _ => debug!(%conn, %err, "Request refused"),
                }
                vec![Outbound::new(conn, err.into_event())]
            }
        }
    }

    /// Tells `conn` its frame could not be understood.
    pub fn reject(&self, conn: ConnectionId, reason: impl Into<String>) {
        self.directory.deliver(vec![Outbound::new(
            conn,
            ServerEvent::RequestRejected {
                reason: reason.into(),
            },
        )]);
    }

    /// Handles a transport drop.
    #[instrument(skip(self))]
    pub async fn disconnect(&self, conn: ConnectionId) {
        let Some(who) = self.directory.close(conn) else {
            debug!("Anonymous connection closed");
            return;
        };
        info!(identity = %who, "Connection closed");
        let outbound = self.registry.disconnect(&who, conn).await;
        self.directory.deliver(outbound);
    }

    /// Tears down every session.
    pub async fn shutdown(&self) {
        self.registry.shutdown().await;
    }

    async fn route(
        &self,
        conn: ConnectionId,
        request: ClientRequest,
    ) -> Result<Vec<Outbound>, GatewayError> {
        match request {
            ClientRequest::ClaimIdentity { name } => self.claim(conn, &name),
            ClientRequest::JoinQueue => {
                let who = self.authenticated(conn)?;
                Ok(self.registry.join_queue(&who, conn).await)
            }
            ClientRequest::JoinVsHeuristic => {
                let who = self.authenticated(conn)?;
                Ok(self.registry.join_with_opponent(&who, conn).await)
            }
            ClientRequest::SubmitMove {
                session_id,
                row,
                col,
            } => {
                let who = self.authenticated(conn)?;
                self.registry.submit_move(&who, &session_id, row, col).await
            }
            ClientRequest::RequestRestart { session_id } => {
                let who = self.authenticated(conn)?;
                self.registry.request_restart(&who, &session_id).await
            }
            ClientRequest::RequestNewGame { session_id } => {
                let who = self.authenticated(conn)?;
                self.registry.request_new_game(&who, &session_id).await
            }
            ClientRequest::RespondNewGame { session_id, accept } => {
                let who = self.authenticated(conn)?;
                self.registry
                    .respond_new_game(&who, &session_id, accept)
                    .await
            }
            ClientRequest::Reconnect => {
                let who = self.authenticated(conn)?;
                self.registry.reconnect(&who, conn).await
            }
            ClientRequest::ExplicitQuit { session_id } => {
                let who = self.authenticated(conn)?;
                self.registry.quit(&who, &session_id).await
            }
            ClientRequest::LeaveQueue => {
                let who = self.authenticated(conn)?;
                self.registry.leave_queue(&who);
                Ok(Vec::new())
            }
        }
    }

    fn authenticated(&self, conn: ConnectionId) -> Result<Identity, GatewayError> {
        self.directory
            .identity(conn)
            .ok_or(GatewayError::NotAuthenticated)
    }

    #[instrument(skip(self))]
    fn claim(&self, conn: ConnectionId, raw: &str) -> Result<Vec<Outbound>, GatewayError> {
        let name = validate_name(raw, self.registry.config())?;
        match self.directory.identity(conn) {
            Some(current) if current == name => {}
            Some(current) => return Err(GatewayError::AlreadyClaimed { name: current }),
            None => {
                self.registry.claim_identity(&name, conn)?;
                self.directory.bind(conn, name.clone());
                info!(identity = %name, "Identity claimed");
            }
        }
        Ok(vec![Outbound::new(conn, ServerEvent::IdentityAccepted { name })])
    }
}
