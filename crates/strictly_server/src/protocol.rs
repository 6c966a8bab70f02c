//! Wire protocol: JSON requests in, JSON events out.
//!
//! Both directions are internally tagged by a kebab-case `type` field with
//! camelCase payload fields, e.g.
//! `{"type":"submit-move","sessionId":"s-1","row":9,"col":9}`.

use derive_more::Display;
use derive_new::new;
use serde::{Deserialize, Serialize};
use strictly_gomoku::{BOARD_SIZE, Color, Coord, Game, GameStatus, Outcome};

/// Opaque session identifier.
pub type SessionId = String;

/// Claimed display name, the stable key for a participant.
pub type Identity = String;

/// Identifies one live duplex channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
#[display("conn-{_0}")]
pub struct ConnectionId(pub u64);

/// Inbound request from a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ClientRequest {
    /// Bind a display name to this connection.
    ClaimIdentity {
        /// Requested name.
        name: String,
    },
    /// Wait for a human opponent.
    JoinQueue,
    /// Start a game against the heuristic opponent.
    JoinVsHeuristic,
    /// Place a stone.
    SubmitMove {
        /// Target session.
        session_id: SessionId,
        /// Row, 0-18.
        row: i64,
        /// Column, 0-18.
        col: i64,
    },
    /// Vote to restart with the same seats.
    RequestRestart {
        /// Target session.
        session_id: SessionId,
    },
    /// Propose a new game to the peer.
    RequestNewGame {
        /// Target session.
        session_id: SessionId,
    },
    /// Answer the peer's new-game proposal.
    RespondNewGame {
        /// Target session.
        session_id: SessionId,
        /// Whether to start over.
        accept: bool,
    },
    /// Resume the session held by this identity.
    Reconnect,
    /// Leave the session immediately, no grace window.
    ExplicitQuit {
        /// Target session.
        session_id: SessionId,
    },
    /// Stop waiting for an opponent.
    LeaveQueue,
}

/// Outbound event to a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    /// The name is now bound to this connection.
    IdentityAccepted {
        /// Accepted (trimmed) name.
        name: Identity,
    },
    /// The name was refused.
    IdentityRejected {
        /// Why.
        reason: String,
    },
    /// Queued, no opponent yet.
    Waiting,
    /// A session began, or was resumed.
    SessionStarted {
        /// Session to address in later requests.
        session_id: SessionId,
        /// Seat color of the recipient.
        color: Color,
        /// Display name of the other seat.
        opponent_name: String,
        /// Full state.
        state: StateSnapshot,
    },
    /// A move was applied.
    StateUpdate {
        /// Full state.
        state: StateSnapshot,
    },
    /// A move was refused; nothing changed.
    MoveRejected {
        /// Why.
        reason: String,
    },
    /// The game ended.
    SessionEnded {
        /// Final outcome.
        outcome: Outcome,
        /// Winner, if the game was won.
        winner_name: Option<String>,
        /// Loser, if the game was won.
        loser_name: Option<String>,
        /// Final state.
        state: StateSnapshot,
    },
    /// The peer voted to restart.
    RestartRequestedByPeer,
    /// The board was reset; seats unchanged.
    SessionRestarted {
        /// Fresh state.
        state: StateSnapshot,
    },
    /// The peer proposes a new game.
    NewGameProposed {
        /// Proposer.
        from_name: String,
    },
    /// A new-game proposal was declined.
    NewGameDeclined {
        /// Who declined.
        by_name: String,
    },
    /// The peer's connection dropped; they may come back.
    PeerDisconnected,
    /// The peer came back within the grace window.
    PeerReconnected,
    /// The peer never came back; the session is gone.
    PeerReconnectWindowExpired {
        /// State at the moment of abandonment.
        final_state: StateSnapshot,
    },
    /// There is no session to resume.
    ReconnectFailed {
        /// Why.
        reason: String,
    },
    /// Any other refused request; nothing changed.
    RequestRejected {
        /// Why.
        reason: String,
    },
}

/// An event addressed to one connection.
#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct Outbound {
    /// Recipient.
    pub to: ConnectionId,
    /// Payload.
    pub event: ServerEvent,
}

/// Everything a client needs to redraw the game from scratch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    /// Session this state belongs to.
    pub session_id: SessionId,
    /// Rows top to bottom; `null` for an empty cell.
    pub board: Vec<Vec<Option<Color>>>,
    /// Color to move.
    pub turn: Color,
    /// Active or finished.
    pub status: GameStatus,
    /// Outcome so far.
    pub outcome: Outcome,
    /// Stones on the board.
    pub move_count: usize,
    /// Black seat's display name.
    pub black_name: String,
    /// White seat's display name.
    pub white_name: String,
    /// Most recent stone.
    pub last_move: Option<Coord>,
    /// The five deciding stones, if won.
    pub winning_line: Option<Vec<Coord>>,
}

impl StateSnapshot {
    /// Captures the current state of `game`.
    pub fn capture(session_id: &str, game: &Game, black_name: &str, white_name: &str) -> Self {
        let board = game
            .board()
            .rows()
            .iter()
            .map(|row| row.iter().map(|cell| cell.color()).collect())
            .collect();
        Self {
            session_id: session_id.to_string(),
            board,
            turn: game.turn(),
            status: game.status(),
            outcome: game.outcome(),
            move_count: game.move_count(),
            black_name: black_name.to_string(),
            white_name: white_name.to_string(),
            last_move: game.last_move().map(|mv| *mv.at()),
            winning_line: game.winning_line().map(|line| line.to_vec()),
        }
    }

    /// Color at `(row, col)`, if in bounds and occupied.
    pub fn stone_at(&self, row: usize, col: usize) -> Option<Color> {
        if row >= BOARD_SIZE || col >= BOARD_SIZE {
            return None;
        }
        self.board[row][col]
    }
}
