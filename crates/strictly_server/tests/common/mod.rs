//! Test client driving a gateway through real channels.

#![allow(dead_code)]

use std::time::Duration;
use strictly_gomoku::Color;
use strictly_server::{
    ClientRequest, ConnectionId, Gateway, ServerConfig, ServerEvent, SessionId, StateSnapshot,
};
use tokio::sync::mpsc::{self, UnboundedReceiver};

/// Upper bound for waiting on a timer-driven event.
pub const PATIENCE: Duration = Duration::from_secs(2);

/// Gateway with short timings and a seeded opponent.
pub fn gateway(grace_ms: u64, think_ms: u64) -> Gateway {
    let config = ServerConfig::default()
        .with_grace_window_ms(grace_ms)
        .with_opponent_think_ms(think_ms)
        .with_opponent_seed(Some(7));
    Gateway::new(config)
}

/// One simulated connection.
pub struct Client {
    pub conn: ConnectionId,
    pub rx: UnboundedReceiver<ServerEvent>,
}

impl Client {
    /// Opens a connection without claiming a name.
    pub fn open(gateway: &Gateway) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            conn: gateway.connect(tx),
            rx,
        }
    }

    /// Opens a connection and claims `name`.
    pub async fn named(gateway: &Gateway, name: &str) -> Self {
        let mut client = Self::open(gateway);
        client
            .send(
                gateway,
                ClientRequest::ClaimIdentity {
                    name: name.to_string(),
                },
            )
            .await;
        match client.take() {
            Some(ServerEvent::IdentityAccepted { name: accepted }) => assert_eq!(accepted, name),
            other => panic!("claim of {name} failed: {other:?}"),
        }
        client
    }

    pub async fn send(&self, gateway: &Gateway, request: ClientRequest) {
        gateway.dispatch(self.conn, request).await;
    }

    pub async fn play(&self, gateway: &Gateway, session_id: &str, row: i64, col: i64) {
        self.send(
            gateway,
            ClientRequest::SubmitMove {
                session_id: session_id.to_string(),
                row,
                col,
            },
        )
        .await;
    }

    /// Next event already delivered, if any.
    pub fn take(&mut self) -> Option<ServerEvent> {
        self.rx.try_recv().ok()
    }

    /// Waits for the next event.
    pub async fn next(&mut self) -> ServerEvent {
        tokio::time::timeout(PATIENCE, self.rx.recv())
            .await
            .expect("timed out waiting for an event")
            .expect("event channel closed")
    }

    /// Everything delivered so far.
    pub fn drain(&mut self) -> Vec<ServerEvent> {
        std::iter::from_fn(|| self.take()).collect()
    }

    /// Expects `session-started`, returning its fields.
    pub fn started(&mut self) -> (SessionId, Color, String, StateSnapshot) {
        match self.take() {
            Some(ServerEvent::SessionStarted {
                session_id,
                color,
                opponent_name,
                state,
            }) => (session_id, color, opponent_name, state),
            other => panic!("expected session-started, got {other:?}"),
        }
    }

    /// Expects `state-update`, returning its state.
    pub fn updated(&mut self) -> StateSnapshot {
        match self.take() {
            Some(ServerEvent::StateUpdate { state }) => state,
            other => panic!("expected state-update, got {other:?}"),
        }
    }
}

/// Pairs `alice` (black) with `bob` (white) through the queue.
pub async fn paired(gateway: &Gateway) -> (Client, Client, SessionId) {
    let mut alice = Client::named(gateway, "alice").await;
    let mut bob = Client::named(gateway, "bob").await;
    alice.send(gateway, ClientRequest::JoinQueue).await;
    assert_eq!(alice.take(), Some(ServerEvent::Waiting));
    bob.send(gateway, ClientRequest::JoinQueue).await;
    let (session_id, color, _, _) = alice.started();
    assert_eq!(color, Color::Black);
    let (bob_session, color, _, _) = bob.started();
    assert_eq!(color, Color::White);
    assert_eq!(session_id, bob_session);
    (alice, bob, session_id)
}
