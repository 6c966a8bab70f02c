//! Live connections and the identity bound to each.

use crate::protocol::{ConnectionId, Identity, Outbound, ServerEvent};
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, instrument, trace};

/// Delivers outbound events to their connections.
pub trait EventSink: Send + Sync + Debug {
    /// Sends every event to its recipient. Closed recipients are skipped.
    fn deliver(&self, outbound: Vec<Outbound>);
}

#[derive(Debug)]
struct Channel {
    sender: UnboundedSender<ServerEvent>,
    identity: Option<Identity>,
}

/// Maps each open connection to its event sender and claimed identity.
#[derive(Debug, Default)]
pub struct ChannelDirectory {
    channels: Mutex<HashMap<ConnectionId, Channel>>,
    next_id: AtomicU64,
}

impl ChannelDirectory {
    /// Creates an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    fn channels(&self) -> MutexGuard<'_, HashMap<ConnectionId, Channel>> {
        self.channels.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a new connection.
    #[instrument(skip_all)]
    pub fn open(&self, sender: UnboundedSender<ServerEvent>) -> ConnectionId {
        let conn = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        self.channels().insert(
            conn,
            Channel {
                sender,
                identity: None,
            },
        );
        debug!(%conn, "Connection opened");
        conn
    }

    /// Forgets a connection, returning the identity it held.
    #[instrument(skip(self))]
    pub fn close(&self, conn: ConnectionId) -> Option<Identity> {
        self.channels()
            .remove(&conn)
            .and_then(|channel| channel.identity)
    }

    /// Identity claimed on `conn`.
    pub fn identity(&self, conn: ConnectionId) -> Option<Identity> {
        self.channels()
            .get(&conn)
            .and_then(|channel| channel.identity.clone())
    }

    /// Binds `identity` to `conn`.
    pub fn bind(&self, conn: ConnectionId, identity: Identity) {
        if let Some(channel) = self.channels().get_mut(&conn) {
            channel.identity = Some(identity);
        }
    }

    /// Open connections.
    pub fn len(&self) -> usize {
        self.channels().len()
    }

    /// Checks whether no connection is open.
    pub fn is_empty(&self) -> bool {
        self.channels().is_empty()
    }
}

impl EventSink for ChannelDirectory {
    fn deliver(&self, outbound: Vec<Outbound>) {
        let channels = self.channels();
        for Outbound { to, event } in outbound {
            match channels.get(&to) {
                Some(channel) => {
                    trace!(%to, ?event, "Delivering event");
                    if channel.sender.send(event).is_err() {
                        debug!(%to, "Receiver gone, event dropped");
                    }
                }
                None => debug!(%to, "Connection closed, event dropped"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn test_deliver_routes_by_connection() {
        let directory = ChannelDirectory::new();
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        let a = directory.open(tx_a);
        let b = directory.open(tx_b);
        assert_ne!(a, b);

        directory.deliver(vec![
            Outbound::new(a, ServerEvent::Waiting),
            Outbound::new(b, ServerEvent::PeerDisconnected),
        ]);
        assert_eq!(rx_a.try_recv().ok(), Some(ServerEvent::Waiting));
        assert_eq!(rx_b.try_recv().ok(), Some(ServerEvent::PeerDisconnected));
    }

    #[test]
    fn test_close_returns_identity() {
        let directory = ChannelDirectory::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let conn = directory.open(tx);
        directory.bind(conn, "alice".to_string());
        assert_eq!(directory.identity(conn).as_deref(), Some("alice"));
        assert_eq!(directory.close(conn).as_deref(), Some("alice"));
        assert!(directory.is_empty());
        // Delivering to a closed connection is a no-op.
        directory.deliver(vec![Outbound::new(conn, ServerEvent::Waiting)]);
    }
}
