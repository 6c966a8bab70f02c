//! Gateway error taxonomy.
//!
//! Every variant is recoverable: it becomes one rejection event for the
//! requesting connection and leaves shared state exactly as it was.

use crate::protocol::ServerEvent;
use derive_more::{Display, Error};
use strictly_gomoku::IllegalMove;

/// A refused request.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum GatewayError {
    /// Bad name format, length or characters.
    #[display("{reason}")]
    IdentityInvalid {
        /// Why the name was refused.
        reason: String,
    },
    /// Name bound to another live connection.
    #[display("Name '{name}' is already in use")]
    IdentityTaken {
        /// The contested name.
        name: String,
    },
    /// This connection already holds a different name.
    #[display("This connection is already playing as '{name}'")]
    AlreadyClaimed {
        /// The name already held.
        name: String,
    },
    /// A session operation arrived before a name was claimed.
    #[display("Claim an identity first")]
    NotAuthenticated,
    /// Unknown or already torn-down session.
    #[display("No such session: {session_id}")]
    NoSuchSession {
        /// Requested id.
        session_id: String,
    },
    /// The caller holds neither seat.
    #[display("Not a participant in session {session_id}")]
    NotParticipant {
        /// Requested id.
        session_id: String,
    },
    /// The board engine refused the move.
    #[display("{reason}")]
    IllegalMove {
        /// Engine reason, sent verbatim.
        reason: IllegalMove,
    },
    /// A new-game answer with nothing to answer.
    #[display("No new game proposal to answer")]
    NoPendingProposal,
    /// Nothing to resume.
    #[display("{reason}")]
    ReconnectFailed {
        /// Why.
        reason: String,
    },
    /// A server-side invariant broke. Always a bug.
    #[display("Internal error: {message}")]
    Internal {
        /// What broke.
        message: String,
    },
}

impl From<IllegalMove> for GatewayError {
    fn from(reason: IllegalMove) -> Self {
        Self::IllegalMove { reason }
    }
}

impl GatewayError {
    /// The rejection event a client receives for this error.
    pub fn into_event(self) -> ServerEvent {
        let reason = self.to_string();
        match self {
            Self::IdentityInvalid { .. }
            | Self::IdentityTaken { .. }
            | Self::AlreadyClaimed { .. } => ServerEvent::IdentityRejected { reason },
            Self::IllegalMove { .. } => ServerEvent::MoveRejected { reason },
            Self::ReconnectFailed { .. } => ServerEvent::ReconnectFailed { reason },
            Self::NotAuthenticated
            | Self::NoSuchSession { .. }
            | Self::NotParticipant { .. }
            | Self::NoPendingProposal
            | Self::Internal { .. } => ServerEvent::RequestRejected { reason },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_illegal_move_maps_to_move_rejected() {
        let event = GatewayError::from(IllegalMove::Occupied).into_event();
        assert_eq!(
            event,
            ServerEvent::MoveRejected {
                reason: "Position already occupied".to_string()
            }
        );
    }

    #[test]
    fn test_identity_errors_map_to_identity_rejected() {
        let event = GatewayError::IdentityTaken {
            name: "alice".to_string(),
        }
        .into_event();
        assert!(matches!(event, ServerEvent::IdentityRejected { .. }));
    }

    #[test]
    fn test_session_errors_map_to_request_rejected() {
        let event = GatewayError::NoSuchSession {
            session_id: "nope".to_string(),
        }
        .into_event();
        assert_eq!(
            event,
            ServerEvent::RequestRejected {
                reason: "No such session: nope".to_string()
            }
        );
    }
}
