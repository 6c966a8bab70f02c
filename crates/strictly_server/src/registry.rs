//! All live sessions, the matchmaking queue and the identity indices.
//!
//! Lock order: a session lock may be held while taking the index lock,
//! never the reverse. The index lock is a plain mutex held only for map
//! updates; session locks are async and held across a whole transition.

use crate::config::ServerConfig;
use crate::directory::EventSink;
use crate::error::GatewayError;
use crate::protocol::{ConnectionId, Identity, Outbound, ServerEvent, SessionId};
use crate::session::{Effects, GameSession, Seat};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use strictly_gomoku::Color;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, instrument, warn};

/// A session behind its own lock.
pub type SharedSession = Arc<AsyncMutex<GameSession>>;

/// Counts reported by the health endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RegistryStats {
    /// Live sessions.
    pub sessions: usize,
    /// Identities waiting for an opponent.
    pub waiting: usize,
    /// Names bound to a live connection.
    pub reserved: usize,
}

#[derive(Debug, Default)]
struct RegistryIndex {
    sessions: HashMap<SessionId, SharedSession>,
    by_identity: HashMap<Identity, SessionId>,
    queue: VecDeque<(Identity, ConnectionId)>,
    reservations: HashMap<Identity, ConnectionId>,
}

impl RegistryIndex {
    fn session_of(&self, who: &str) -> Option<SharedSession> {
        self.by_identity
            .get(who)
            .and_then(|id| self.sessions.get(id))
            .cloned()
    }

    fn is_queued(&self, who: &str) -> bool {
        self.queue.iter().any(|(queued, _)| queued == who)
    }

    fn dequeue(&mut self, who: &str) -> bool {
        let before = self.queue.len();
        self.queue.retain(|(queued, _)| queued != who);
        before != self.queue.len()
    }

    fn insert(&mut self, session: GameSession) -> SharedSession {
        let id = session.id().to_string();
        for who in session.participants() {
            self.by_identity.insert(who, id.clone());
        }
        let shared = Arc::new(AsyncMutex::new(session));
        self.sessions.insert(id, Arc::clone(&shared));
        shared
    }
}

#[derive(Debug)]
struct RegistryInner {
    config: ServerConfig,
    sink: Arc<dyn EventSink>,
    index: Mutex<RegistryIndex>,
    next_session: AtomicU64,
}

/// Owns every live session. Cheap to clone.
#[derive(Debug, Clone)]
pub struct SessionRegistry {
    inner: Arc<RegistryInner>,
}

impl SessionRegistry {
    /// Creates an empty registry delivering deferred events through `sink`.
    #[instrument(skip(sink))]
    pub fn new(config: ServerConfig, sink: Arc<dyn EventSink>) -> Self {
        info!("Creating session registry");
        Self {
            inner: Arc::new(RegistryInner {
                config,
                sink,
                index: Mutex::new(RegistryIndex::default()),
                next_session: AtomicU64::new(0),
            }),
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    fn index(&self) -> MutexGuard<'_, RegistryIndex> {
        self.inner
            .index
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Reserves `name` for `conn`.
    ///
    /// # Errors
    ///
    /// [`GatewayError::IdentityTaken`] if another live connection holds it.
    #[instrument(skip(self))]
    pub fn claim_identity(&self, name: &str, conn: ConnectionId) -> Result<(), GatewayError> {
        let mut index = self.index();
        match index.reservations.get(name) {
            Some(holder) if *holder != conn => {
                warn!(%holder, "Name already in use");
                Err(GatewayError::IdentityTaken {
                    name: name.to_string(),
                })
            }
            _ => {
                index.reservations.insert(name.to_string(), conn);
                Ok(())
            }
        }
    }

    /// Drops the reservation of `name` if `conn` holds it.
    pub fn release_identity(&self, name: &str, conn: ConnectionId) {
        let mut index = self.index();
        if index.reservations.get(name) == Some(&conn) {
            index.reservations.remove(name);
        }
    }

    /// Pairs `who` with the longest-waiting identity, or queues it.
    ///
    /// Idempotent: a caller already in a live session gets that session
    /// again, a caller already queued gets `waiting` again.
    #[instrument(skip(self))]
    pub async fn join_queue(&self, who: &str, conn: ConnectionId) -> Vec<Outbound> {
        if let Some(outbound) = self.resync(who, conn).await {
            debug!("Already seated, resyncing");
            return outbound;
        }

        let mut index = self.index();
        if index.is_queued(who) {
            return vec![Outbound::new(conn, ServerEvent::Waiting)];
        }
        let Some((head, head_conn)) = index.queue.pop_front() else {
            index.queue.push_back((who.to_string(), conn));
            info!(waiting = index.queue.len(), "Queued for an opponent");
            return vec![Outbound::new(conn, ServerEvent::Waiting)];
        };

        let session = GameSession::new(
            self.next_session_id(),
            Seat::human(Color::Black, head, head_conn),
            Seat::human(Color::White, who.to_string(), conn),
            self.opponent_rng(),
        );
        let outbound = session.started_events();
        info!(session_id = %session.id(), "Paired from queue");
        index.insert(session);
        outbound
    }

    /// Starts a session against the heuristic opponent. `who` plays black.
    #[instrument(skip(self))]
    pub async fn join_with_opponent(&self, who: &str, conn: ConnectionId) -> Vec<Outbound> {
        if let Some(outbound) = self.resync(who, conn).await {
            debug!("Already seated, resyncing");
            return outbound;
        }

        let mut index = self.index();
        index.dequeue(who);
        let session = GameSession::new(
            self.next_session_id(),
            Seat::human(Color::Black, who.to_string(), conn),
            Seat::heuristic(Color::White, self.inner.config.opponent_name().clone()),
            self.opponent_rng(),
        );
        let outbound = session.started_events();
        info!(session_id = %session.id(), "Started game against the computer");
        index.insert(session);
        outbound
    }

    /// Removes `who` from the wait queue. Does not touch sessions.
    #[instrument(skip(self))]
    pub fn leave_queue(&self, who: &str) -> bool {
        let left = self.index().dequeue(who);
        debug!(left, "Leave queue");
        left
    }

    /// Applies a participant's move.
    ///
    /// # Errors
    ///
    /// See [`GameSession::apply_move`]; [`GatewayError::NoSuchSession`] for
    /// an unknown id.
    #[instrument(skip(self))]
    pub async fn submit_move(
        &self,
        who: &str,
        session_id: &str,
        row: i64,
        col: i64,
    ) -> Result<Vec<Outbound>, GatewayError> {
        self.with_session(session_id, |session| session.apply_move(who, row, col))
            .await
    }

    /// Records a restart vote.
    ///
    /// # Errors
    ///
    /// See [`GameSession::request_restart`].
    #[instrument(skip(self))]
    pub async fn request_restart(
        &self,
        who: &str,
        session_id: &str,
    ) -> Result<Vec<Outbound>, GatewayError> {
        self.with_session(session_id, |session| session.request_restart(who))
            .await
    }

    /// Proposes a new game.
    ///
    /// # Errors
    ///
    /// See [`GameSession::request_new_game`].
    #[instrument(skip(self))]
    pub async fn request_new_game(
        &self,
        who: &str,
        session_id: &str,
    ) -> Result<Vec<Outbound>, GatewayError> {
        self.with_session(session_id, |session| session.request_new_game(who))
            .await
    }

    /// Answers a new-game proposal.
    ///
    /// # Errors
    ///
    /// See [`GameSession::respond_new_game`].
    #[instrument(skip(self))]
    pub async fn respond_new_game(
        &self,
        who: &str,
        session_id: &str,
        accept: bool,
    ) -> Result<Vec<Outbound>, GatewayError> {
        self.with_session(session_id, |session| session.respond_new_game(who, accept))
            .await
    }

    /// Ends a session at once on a participant's request.
    ///
    /// # Errors
    ///
    /// See [`GameSession::quit`].
    #[instrument(skip(self))]
    pub async fn quit(&self, who: &str, session_id: &str) -> Result<Vec<Outbound>, GatewayError> {
        self.with_session(session_id, |session| session.quit(who))
            .await
    }

    /// Handles a transport drop of `who` on `conn`.
    ///
    /// Leaves the queue, frees the name, and opens the grace window of a
    /// seated identity.
    #[instrument(skip(self))]
    pub async fn disconnect(&self, who: &str, conn: ConnectionId) -> Vec<Outbound> {
        let shared = {
            let mut index = self.index();
            index.dequeue(who);
            if index.reservations.get(who) == Some(&conn) {
                index.reservations.remove(who);
            }
            index.session_of(who)
        };
        let Some(shared) = shared else {
            return Vec::new();
        };
        let mut session = shared.lock().await;
        let effects = session.disconnect(who, conn);
        self.carry_out(&shared, &mut session, effects)
    }

    /// Resumes the session `who` was seated in, on `conn`.
    ///
    /// # Errors
    ///
    /// [`GatewayError::ReconnectFailed`] if there is nothing to resume.
    #[instrument(skip(self))]
    pub async fn reconnect(
        &self,
        who: &str,
        conn: ConnectionId,
    ) -> Result<Vec<Outbound>, GatewayError> {
        let shared = self
            .index()
            .session_of(who)
            .ok_or_else(|| GatewayError::ReconnectFailed {
                reason: "No session to resume".to_string(),
            })?;
        let mut session = shared.lock().await;
        let effects = session.reconnect(who, conn)?;
        Ok(self.carry_out(&shared, &mut session, effects))
    }

    /// Session `who` is seated in.
    pub fn session_of(&self, who: &str) -> Option<SessionId> {
        self.index().by_identity.get(who).cloned()
    }

    /// Session by id.
    pub fn session(&self, session_id: &str) -> Option<SharedSession> {
        self.index().sessions.get(session_id).cloned()
    }

    /// Checks whether `who` waits for an opponent.
    pub fn is_queued(&self, who: &str) -> bool {
        self.index().is_queued(who)
    }

    /// Current counts.
    pub fn stats(&self) -> RegistryStats {
        let index = self.index();
        RegistryStats {
            sessions: index.sessions.len(),
            waiting: index.queue.len(),
            reserved: index.reservations.len(),
        }
    }

    /// Cancels every timer and opponent task and forgets all state.
    #[instrument(skip(self))]
    pub async fn shutdown(&self) {
        let sessions: Vec<SharedSession> = {
            let mut index = self.index();
            let sessions = index.sessions.drain().map(|(_, shared)| shared).collect();
            *index = RegistryIndex::default();
            sessions
        };
        info!(sessions = sessions.len(), "Shutting down session registry");
        for shared in sessions {
            shared.lock().await.cancel_timers();
        }
    }

    async fn resync(&self, who: &str, conn: ConnectionId) -> Option<Vec<Outbound>> {
        let shared = self.index().session_of(who)?;
        let session = shared.lock().await;
        // Ended sessions are unindexed under their lock; a closed one
        // here means the caller is free to join again.
        if session.is_closed() {
            return None;
        }
        Some(session.resync(who, conn))
    }

    async fn with_session<F>(&self, session_id: &str, op: F) -> Result<Vec<Outbound>, GatewayError>
    where
        F: FnOnce(&mut GameSession) -> Result<Effects, GatewayError>,
    {
        let shared = self
            .session(session_id)
            .ok_or_else(|| GatewayError::NoSuchSession {
                session_id: session_id.to_string(),
            })?;
        let mut session = shared.lock().await;
        let effects = op(&mut *session)?;
        Ok(self.carry_out(&shared, &mut session, effects))
    }

    /// Schedules what `effects` asks for and returns its events.
    ///
    /// Events that prompt an opponent turn are delivered here, under the
    /// session lock, so the reply can never reach a client before them.
    fn carry_out(
        &self,
        shared: &SharedSession,
        session: &mut GameSession,
        effects: Effects,
    ) -> Vec<Outbound> {
        let mut outbound = effects.outbound;
        if let Some(epoch) = effects.heuristic_due {
            self.inner.sink.deliver(std::mem::take(&mut outbound));
            self.schedule_opponent(shared, session, epoch);
        }
        if let Some(generation) = effects.arm_grace {
            self.schedule_expiry(shared, session, generation);
        }
        if effects.ended {
            self.remove_session(session);
        }
        outbound
    }

    fn schedule_opponent(&self, shared: &SharedSession, session: &mut GameSession, epoch: u64) {
        let registry = self.clone();
        let weak = Arc::downgrade(shared);
        let think = self.inner.config.opponent_think();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(think).await;
            let Some(shared) = weak.upgrade() else {
                return;
            };
            let mut session = shared.lock().await;
            let effects = session.play_heuristic_turn(epoch);
            let outbound = registry.carry_out(&shared, &mut session, effects);
            registry.inner.sink.deliver(outbound);
        });
        session.set_opponent_task(handle);
    }

    fn schedule_expiry(&self, shared: &SharedSession, session: &mut GameSession, generation: u64) {
        let registry = self.clone();
        let weak = Arc::downgrade(shared);
        let window = self.inner.config.grace_window();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(window).await;
            let Some(shared) = weak.upgrade() else {
                return;
            };
            let mut session = shared.lock().await;
            let Some(effects) = session.expire(generation) else {
                return;
            };
            let outbound = registry.carry_out(&shared, &mut session, effects);
            registry.inner.sink.deliver(outbound);
        });
        session.attach_grace_timer(generation, handle);
    }

    fn remove_session(&self, session: &GameSession) {
        let mut index = self.index();
        index.sessions.remove(session.id());
        for who in session.participants() {
            if index.by_identity.get(&who).map(String::as_str) == Some(session.id()) {
                index.by_identity.remove(&who);
            }
        }
        info!(session_id = %session.id(), remaining = index.sessions.len(), "Session removed");
    }

    fn next_session_id(&self) -> SessionId {
        let n = self.inner.next_session.fetch_add(1, Ordering::Relaxed) + 1;
        format!("game-{n}")
    }

    fn opponent_rng(&self) -> StdRng {
        match self.inner.config.opponent_seed() {
            Some(seed) => StdRng::seed_from_u64(*seed),
            None => StdRng::from_entropy(),
        }
    }
}
