//! One game's authoritative state and its lifecycle.
//!
//! A [`GameSession`] never does I/O and never sleeps. Each transition returns
//! [`Effects`]: the events to deliver plus any timer or opponent turn the
//! registry has to schedule. All transitions run under the session's lock.

use crate::error::GatewayError;
use crate::protocol::{ConnectionId, Identity, Outbound, ServerEvent, SessionId, StateSnapshot};
use rand::rngs::StdRng;
use std::collections::HashSet;
use strictly_gomoku::{Color, Game, Placement, heuristic};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

/// Who sits in a seat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Occupant {
    /// A remote participant. `channel` is `None` during a grace window.
    Human {
        /// Stable identity.
        identity: Identity,
        /// Current connection, replaced on reconnect.
        channel: Option<ConnectionId>,
    },
    /// The in-process heuristic opponent.
    Heuristic {
        /// Display name.
        name: String,
    },
}

/// A colored seat in a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seat {
    color: Color,
    occupant: Occupant,
}

impl Seat {
    /// A human seat bound to a live connection.
    pub fn human(color: Color, identity: Identity, channel: ConnectionId) -> Self {
        Self {
            color,
            occupant: Occupant::Human {
                identity,
                channel: Some(channel),
            },
        }
    }

    /// A seat played by the heuristic opponent.
    pub fn heuristic(color: Color, name: String) -> Self {
        Self {
            color,
            occupant: Occupant::Heuristic { name },
        }
    }

    /// Seat color.
    pub fn color(&self) -> Color {
        self.color
    }

    /// Who sits here.
    pub fn occupant(&self) -> &Occupant {
        &self.occupant
    }

    /// Display name.
    pub fn name(&self) -> &str {
        match &self.occupant {
            Occupant::Human { identity, .. } => identity,
            Occupant::Heuristic { name } => name,
        }
    }

    /// Identity of a human occupant.
    pub fn identity(&self) -> Option<&str> {
        match &self.occupant {
            Occupant::Human { identity, .. } => Some(identity),
            Occupant::Heuristic { .. } => None,
        }
    }

    /// Current connection of a human occupant.
    pub fn channel(&self) -> Option<ConnectionId> {
        match &self.occupant {
            Occupant::Human { channel, .. } => *channel,
            Occupant::Heuristic { .. } => None,
        }
    }

    /// Checks whether the heuristic opponent plays this seat.
    pub fn is_heuristic(&self) -> bool {
        matches!(self.occupant, Occupant::Heuristic { .. })
    }

    fn holds(&self, who: &str) -> bool {
        self.identity() == Some(who)
    }

    fn is_disconnected_human(&self) -> bool {
        matches!(self.occupant, Occupant::Human { channel: None, .. })
    }

    fn set_channel(&mut self, conn: Option<ConnectionId>) {
        if let Occupant::Human { channel, .. } = &mut self.occupant {
            *channel = conn;
        }
    }
}

/// Work the registry must carry out after a transition.
#[derive(Debug, Default)]
pub struct Effects {
    /// Events to deliver now.
    pub outbound: Vec<Outbound>,
    /// Schedule the heuristic opponent for this epoch.
    pub heuristic_due: Option<u64>,
    /// Start a grace timer with this generation.
    pub arm_grace: Option<u64>,
    /// The session is over and must leave the registry.
    pub ended: bool,
}

impl Effects {
    fn send(outbound: Vec<Outbound>) -> Self {
        Self {
            outbound,
            ..Self::default()
        }
    }
}

#[derive(Debug)]
struct GraceTimer {
    generation: u64,
    handle: Option<JoinHandle<()>>,
}

/// One game between two seats.
#[derive(Debug)]
pub struct GameSession {
    id: SessionId,
    black: Seat,
    white: Seat,
    game: Game,
    restart_votes: HashSet<Identity>,
    proposal: Option<Identity>,
    /// Bumped on every reset or teardown; stale opponent turns compare it.
    epoch: u64,
    closed: bool,
    grace: Option<GraceTimer>,
    grace_generation: u64,
    opponent_task: Option<JoinHandle<()>>,
    rng: StdRng,
}

impl GameSession {
    /// Creates a session. `black` moves first.
    #[instrument(skip(black, white, rng), fields(black = %black.name(), white = %white.name()))]
    pub fn new(id: SessionId, black: Seat, white: Seat, rng: StdRng) -> Self {
        info!(session_id = %id, "Creating game session");
        Self {
            id,
            black,
            white,
            game: Game::new(),
            restart_votes: HashSet::new(),
            proposal: None,
            epoch: 0,
            closed: false,
            grace: None,
            grace_generation: 0,
            opponent_task: None,
            rng,
        }
    }

    /// Session id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The game being played.
    pub fn game(&self) -> &Game {
        &self.game
    }

    /// Current epoch.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Seat of the given color.
    pub fn seat(&self, color: Color) -> &Seat {
        match color {
            Color::Black => &self.black,
            Color::White => &self.white,
        }
    }

    /// Checks whether the session was torn down by a quit or an expired
    /// grace window. The game keeps any result reached before that.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Checks whether a grace timer is armed.
    pub fn grace_pending(&self) -> bool {
        self.grace.is_some()
    }

    /// Identities of the human seats.
    pub fn participants(&self) -> Vec<Identity> {
        self.seats()
            .iter()
            .filter_map(|seat| seat.identity().map(str::to_string))
            .collect()
    }

    /// Full state for clients.
    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot::capture(&self.id, &self.game, self.black.name(), self.white.name())
    }

    /// `session-started` for every connected human.
    pub fn started_events(&self) -> Vec<Outbound> {
        self.seats()
            .iter()
            .filter_map(|seat| self.started_for(seat))
            .collect()
    }

    /// Resends `session-started` to `who` on its current connection.
    ///
    /// A seat held through another connection must be taken over with
    /// `reconnect` first; `conn` is told so.
    pub fn resync(&self, who: &str, conn: ConnectionId) -> Vec<Outbound> {
        match self.seat_of(who) {
            Some(seat) if seat.channel() == Some(conn) => {
                self.started_for(seat).into_iter().collect()
            }
            _ => vec![Outbound::new(
                conn,
                ServerEvent::RequestRejected {
                    reason: format!("Already seated in {}; reconnect to resume", self.id),
                },
            )],
        }
    }

    /// Applies a human move.
    ///
    /// # Errors
    ///
    /// [`GatewayError::NotParticipant`] if `who` holds no seat,
    /// [`GatewayError::IllegalMove`] with the engine's reason otherwise. The
    /// board is untouched in both cases.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn apply_move(&mut self, who: &str, row: i64, col: i64) -> Result<Effects, GatewayError> {
        self.ensure_live()?;
        let color = self.require_seat(who)?;
        let placement = self.game.place(row, col, color).map_err(|reason| {
            debug!(%reason, "Move refused");
            GatewayError::from(reason)
        })?;
        info!(%color, row, col, moves = self.game.move_count(), "Move applied");
        self.after_placement(placement)
    }

    /// Plays the heuristic opponent's turn, if it is still due.
    ///
    /// Does nothing when the game was reset or ended since the turn was
    /// scheduled (`epoch` mismatch) or when it is not the heuristic's move.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn play_heuristic_turn(&mut self, epoch: u64) -> Effects {
        // Called from the opponent task itself; drop the handle, don't abort.
        self.opponent_task = None;
        if epoch != self.epoch || !self.game.is_active() {
            debug!(current = self.epoch, "Stale opponent turn skipped");
            return Effects::default();
        }
        let color = self.game.turn();
        if !self.seat(color).is_heuristic() {
            return Effects::default();
        }
        let Some(at) = heuristic::select_move(self.game.board(), color, &mut self.rng) else {
            return Effects::default();
        };
        let placement = match self.game.place(at.row as i64, at.col as i64, color) {
            Ok(placement) => placement,
            Err(reason) => {
                error!(%reason, %at, "Heuristic chose an illegal cell");
                return Effects::default();
            }
        };
        self.after_placement(placement).unwrap_or_else(|err| {
            error!(%err, "Opponent move broke an invariant");
            Effects::default()
        })
    }

    /// Stores the handle of a scheduled opponent turn.
    pub fn set_opponent_task(&mut self, handle: JoinHandle<()>) {
        if let Some(previous) = self.opponent_task.replace(handle) {
            previous.abort();
        }
    }

    /// Records a restart vote; resets once every human has voted.
    ///
    /// A single vote suffices against the heuristic opponent.
    ///
    /// # Errors
    ///
    /// [`GatewayError::NotParticipant`] if `who` holds no seat.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn request_restart(&mut self, who: &str) -> Result<Effects, GatewayError> {
        self.ensure_live()?;
        self.require_seat(who)?;
        self.restart_votes.insert(who.to_string());

        let consent = self.seats().iter().all(|seat| match seat.identity() {
            Some(identity) => self.restart_votes.contains(identity),
            None => true,
        });
        if consent {
            info!("Restart agreed");
            return Ok(self.reset());
        }
        debug!(votes = self.restart_votes.len(), "Restart vote recorded");
        Ok(Effects::send(
            self.to_peers_of(who, ServerEvent::RestartRequestedByPeer),
        ))
    }

    /// Proposes a new game to the peer. Auto-accepted by the heuristic.
    ///
    /// # Errors
    ///
    /// [`GatewayError::NotParticipant`] if `who` holds no seat.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn request_new_game(&mut self, who: &str) -> Result<Effects, GatewayError> {
        self.ensure_live()?;
        let color = self.require_seat(who)?;
        if self.seat(color.opponent()).is_heuristic() {
            return Ok(self.reset());
        }
        self.proposal = Some(who.to_string());
        Ok(Effects::send(self.to_peers_of(
            who,
            ServerEvent::NewGameProposed {
                from_name: who.to_string(),
            },
        )))
    }

    /// Answers the peer's new-game proposal.
    ///
    /// # Errors
    ///
    /// [`GatewayError::NoPendingProposal`] unless the other participant has
    /// an open proposal.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn respond_new_game(&mut self, who: &str, accept: bool) -> Result<Effects, GatewayError> {
        self.ensure_live()?;
        self.require_seat(who)?;
        match &self.proposal {
            Some(proposer) if proposer != who => {}
            _ => return Err(GatewayError::NoPendingProposal),
        }
        if accept {
            info!("New game accepted");
            return Ok(self.reset());
        }
        self.proposal = None;
        Ok(Effects::send(self.broadcast(ServerEvent::NewGameDeclined {
            by_name: who.to_string(),
        })))
    }

    /// Handles a transport drop for `who` on `conn`.
    ///
    /// Drops from a connection the seat no longer uses are ignored. The first
    /// drop arms the grace timer; a second drop while it runs shares it.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn disconnect(&mut self, who: &str, conn: ConnectionId) -> Effects {
        if self.is_closed() {
            return Effects::default();
        }
        let seat = match (self.black.holds(who), self.white.holds(who)) {
            (true, _) => &mut self.black,
            (_, true) => &mut self.white,
            _ => return Effects::default(),
        };
        if seat.channel() != Some(conn) {
            debug!(%conn, "Stale connection drop ignored");
            return Effects::default();
        }
        seat.set_channel(None);
        warn!("Participant disconnected, grace window open");

        let mut effects = Effects::send(self.to_peers_of(who, ServerEvent::PeerDisconnected));
        if self.grace.is_none() {
            self.grace_generation += 1;
            self.grace = Some(GraceTimer {
                generation: self.grace_generation,
                handle: None,
            });
            effects.arm_grace = Some(self.grace_generation);
        }
        effects
    }

    /// Attaches the task that will fire [`GameSession::expire`].
    pub fn attach_grace_timer(&mut self, generation: u64, handle: JoinHandle<()>) {
        match &mut self.grace {
            Some(timer) if timer.generation == generation => timer.handle = Some(handle),
            _ => handle.abort(),
        }
    }

    /// Rebinds `who` to `conn` within the grace window.
    ///
    /// The timer is cancelled once no human seat is disconnected.
    ///
    /// # Errors
    ///
    /// [`GatewayError::ReconnectFailed`] if the session was abandoned or `who`
    /// holds no seat.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn reconnect(&mut self, who: &str, conn: ConnectionId) -> Result<Effects, GatewayError> {
        if self.is_closed() {
            return Err(GatewayError::ReconnectFailed {
                reason: "Session has ended".to_string(),
            });
        }
        let seat = match (self.black.holds(who), self.white.holds(who)) {
            (true, _) => &mut self.black,
            (_, true) => &mut self.white,
            _ => {
                return Err(GatewayError::ReconnectFailed {
                    reason: "Not a participant".to_string(),
                });
            }
        };
        let was_disconnected = seat.channel().is_none();
        seat.set_channel(Some(conn));

        if !self.seats().iter().any(|seat| seat.is_disconnected_human()) {
            self.cancel_grace();
        }
        info!(%conn, was_disconnected, "Participant reconnected");

        let mut outbound = self.resync(who, conn);
        if was_disconnected {
            outbound.extend(self.to_peers_of(who, ServerEvent::PeerReconnected));
        }
        Ok(Effects::send(outbound))
    }

    /// Fires the grace timer of `generation`.
    ///
    /// Returns `None` if that timer was cancelled or superseded, so a
    /// reconnect that won the lock always wins.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn expire(&mut self, generation: u64) -> Option<Effects> {
        match &self.grace {
            Some(timer) if timer.generation == generation => {}
            _ => return None,
        }
        // Runs inside the timer task: detach, don't abort.
        self.grace = None;
        if !self.seats().iter().any(|seat| seat.is_disconnected_human()) {
            return None;
        }
        warn!("Grace window expired, closing session");
        self.close();
        let final_state = self.snapshot();
        Some(Effects {
            outbound: self.broadcast(ServerEvent::PeerReconnectWindowExpired { final_state }),
            ended: true,
            ..Effects::default()
        })
    }

    /// Tears the session down at once on an explicit quit.
    ///
    /// # Errors
    ///
    /// [`GatewayError::NotParticipant`] if `who` holds no seat.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn quit(&mut self, who: &str) -> Result<Effects, GatewayError> {
        self.ensure_live()?;
        self.require_seat(who)?;
        info!("Participant quit");
        self.close();
        self.cancel_grace();
        let state = self.snapshot();
        Ok(Effects {
            outbound: self.broadcast(self.ended_event(state)),
            ended: true,
            ..Effects::default()
        })
    }

    /// Aborts every pending timer and opponent task.
    pub fn cancel_timers(&mut self) {
        self.cancel_grace();
        if let Some(task) = self.opponent_task.take() {
            task.abort();
        }
    }

    fn seats(&self) -> [&Seat; 2] {
        [&self.black, &self.white]
    }

    fn seat_of(&self, who: &str) -> Option<&Seat> {
        self.seats().into_iter().find(|seat| seat.holds(who))
    }

    fn require_seat(&self, who: &str) -> Result<Color, GatewayError> {
        self.seat_of(who)
            .map(Seat::color)
            .ok_or_else(|| GatewayError::NotParticipant {
                session_id: self.id.clone(),
            })
    }

    fn ensure_live(&self) -> Result<(), GatewayError> {
        if self.is_closed() {
            return Err(GatewayError::NoSuchSession {
                session_id: self.id.clone(),
            });
        }
        Ok(())
    }

    fn started_for(&self, seat: &Seat) -> Option<Outbound> {
        let conn = seat.channel()?;
        Some(Outbound::new(
            conn,
            ServerEvent::SessionStarted {
                session_id: self.id.clone(),
                color: seat.color(),
                opponent_name: self.seat(seat.color().opponent()).name().to_string(),
                state: self.snapshot(),
            },
        ))
    }

    fn broadcast(&self, event: ServerEvent) -> Vec<Outbound> {
        self.seats()
            .iter()
            .filter_map(|seat| seat.channel())
            .map(|conn| Outbound::new(conn, event.clone()))
            .collect()
    }

    fn to_peers_of(&self, who: &str, event: ServerEvent) -> Vec<Outbound> {
        self.seats()
            .iter()
            .filter(|seat| !seat.holds(who))
            .filter_map(|seat| seat.channel())
            .map(|conn| Outbound::new(conn, event.clone()))
            .collect()
    }

    fn after_placement(&mut self, placement: Placement) -> Result<Effects, GatewayError> {
        self.verify()?;
        let state = self.snapshot();
        let mut effects = Effects::send(self.broadcast(ServerEvent::StateUpdate {
            state: state.clone(),
        }));
        match placement {
            Placement::Continue => {
                if self.seat(self.game.turn()).is_heuristic() {
                    effects.heuristic_due = Some(self.epoch);
                }
            }
            Placement::Won(_) | Placement::Draw => {
                info!(outcome = %self.game.outcome(), "Game finished");
                effects.outbound.extend(self.broadcast(self.ended_event(state)));
            }
        }
        Ok(effects)
    }

    /// `session-ended` carrying the game's outcome and, if won, both names.
    fn ended_event(&self, state: StateSnapshot) -> ServerEvent {
        let outcome = self.game.outcome();
        let winner = outcome.winner();
        ServerEvent::SessionEnded {
            outcome,
            winner_name: winner.map(|c| self.seat(c).name().to_string()),
            loser_name: winner.map(|c| self.seat(c.opponent()).name().to_string()),
            state,
        }
    }

    fn reset(&mut self) -> Effects {
        self.game.reset();
        self.restart_votes.clear();
        self.proposal = None;
        self.epoch += 1;
        if let Some(task) = self.opponent_task.take() {
            task.abort();
        }
        let state = self.snapshot();
        Effects {
            outbound: self.broadcast(ServerEvent::SessionRestarted { state }),
            heuristic_due: self
                .seat(self.game.turn())
                .is_heuristic()
                .then_some(self.epoch),
            ..Effects::default()
        }
    }

    fn close(&mut self) {
        self.closed = true;
        self.game.abandon();
        self.epoch += 1;
        self.restart_votes.clear();
        self.proposal = None;
        if let Some(task) = self.opponent_task.take() {
            task.abort();
        }
    }

    fn cancel_grace(&mut self) {
        if let Some(timer) = self.grace.take()
            && let Some(handle) = timer.handle
        {
            handle.abort();
        }
    }

    fn verify(&self) -> Result<(), GatewayError> {
        self.game.check_invariants().map_err(|violations| {
            let message = violations
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            error!(session_id = %self.id, %message, "Invariant violated");
            GatewayError::Internal { message }
        })
    }
}

impl Drop for GameSession {
    fn drop(&mut self) {
        self.cancel_timers();
    }
}
