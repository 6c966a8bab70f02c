//! End-to-end protocol flows through the gateway.

mod common;

use common::{Client, gateway, paired};
use strictly_gomoku::{Cell, Color, Coord, GameStatus, Outcome};
use strictly_server::{ClientRequest, ConnectionId, Outbound, ServerEvent};

#[tokio::test]
async fn test_matchmaking_and_first_moves() {
    let gateway = gateway(30_000, 10);
    let mut alice = Client::named(&gateway, "alice").await;
    let mut bob = Client::named(&gateway, "bob").await;

    alice.send(&gateway, ClientRequest::JoinQueue).await;
    assert_eq!(alice.take(), Some(ServerEvent::Waiting));
    assert_eq!(gateway.registry().stats().waiting, 1);

    bob.send(&gateway, ClientRequest::JoinQueue).await;
    let (session_id, color, opponent, state) = alice.started();
    assert_eq!(color, Color::Black, "longest waiter moves first");
    assert_eq!(opponent, "bob");
    assert_eq!(state.move_count, 0);
    let (_, color, opponent, _) = bob.started();
    assert_eq!(color, Color::White);
    assert_eq!(opponent, "alice");
    assert_eq!(gateway.registry().stats().waiting, 0);

    alice.play(&gateway, &session_id, 9, 9).await;
    for client in [&mut alice, &mut bob] {
        let state = client.updated();
        assert_eq!(state.turn, Color::White);
        assert_eq!(state.stone_at(9, 9), Some(Color::Black));
        assert_eq!(state.move_count, 1);
    }

    bob.play(&gateway, &session_id, 9, 9).await;
    assert_eq!(
        bob.take(),
        Some(ServerEvent::MoveRejected {
            reason: "Position already occupied".to_string()
        })
    );
    assert!(alice.take().is_none());

    let shared = gateway.registry().session(&session_id).expect("live session");
    let session = shared.lock().await;
    assert_eq!(session.game().move_count(), 1);
    assert_eq!(session.game().turn(), Color::White);
}

#[tokio::test]
async fn test_horizontal_five_ends_game() {
    let gateway = gateway(30_000, 10);
    let (mut alice, mut bob, session_id) = paired(&gateway).await;

    for col in 5..9 {
        alice.play(&gateway, &session_id, 9, col).await;
        bob.play(&gateway, &session_id, 0, col).await;
    }
    alice.drain();
    bob.drain();
    alice.play(&gateway, &session_id, 9, 9).await;

    for client in [&mut alice, &mut bob] {
        assert_eq!(client.updated().status, GameStatus::Finished);
        match client.take() {
            Some(ServerEvent::SessionEnded {
                outcome,
                winner_name,
                loser_name,
                state,
            }) => {
                assert_eq!(outcome, Outcome::BlackWon);
                assert_eq!(winner_name.as_deref(), Some("alice"));
                assert_eq!(loser_name.as_deref(), Some("bob"));
                let expected: Vec<Coord> = (5..10).map(|col| Coord { row: 9, col }).collect();
                assert_eq!(state.winning_line, Some(expected));
            }
            other => panic!("expected session-ended, got {other:?}"),
        }
    }

    // Finished sessions stay addressable; further moves are refused.
    bob.play(&gateway, &session_id, 1, 1).await;
    assert_eq!(
        bob.take(),
        Some(ServerEvent::MoveRejected {
            reason: "Game is not active".to_string()
        })
    );
}

#[tokio::test]
async fn test_session_ops_require_identity() {
    let gateway = gateway(30_000, 10);
    let mut anonymous = Client::open(&gateway);
    anonymous.send(&gateway, ClientRequest::JoinQueue).await;
    assert!(matches!(
        anonymous.take(),
        Some(ServerEvent::RequestRejected { .. })
    ));
    anonymous.send(&gateway, ClientRequest::Reconnect).await;
    assert!(matches!(
        anonymous.take(),
        Some(ServerEvent::RequestRejected { .. })
    ));
    assert_eq!(gateway.registry().stats().waiting, 0);
}

#[tokio::test]
async fn test_identity_rules() {
    let gateway = gateway(30_000, 10);
    let mut alice = Client::named(&gateway, "alice").await;

    let mut rival = Client::open(&gateway);
    rival
        .send(&gateway, ClientRequest::ClaimIdentity { name: "alice".into() })
        .await;
    assert!(matches!(rival.take(), Some(ServerEvent::IdentityRejected { .. })));

    rival
        .send(&gateway, ClientRequest::ClaimIdentity { name: "  ".into() })
        .await;
    assert!(matches!(rival.take(), Some(ServerEvent::IdentityRejected { .. })));

    rival
        .send(&gateway, ClientRequest::ClaimIdentity { name: "Computer".into() })
        .await;
    assert!(matches!(rival.take(), Some(ServerEvent::IdentityRejected { .. })));

    // Same name again is harmless, a second name is not.
    alice
        .send(&gateway, ClientRequest::ClaimIdentity { name: "alice".into() })
        .await;
    assert!(matches!(alice.take(), Some(ServerEvent::IdentityAccepted { .. })));
    alice
        .send(&gateway, ClientRequest::ClaimIdentity { name: "carol".into() })
        .await;
    assert!(matches!(alice.take(), Some(ServerEvent::IdentityRejected { .. })));

    // A name frees up once its connection is gone.
    gateway.disconnect(alice.conn).await;
    rival
        .send(&gateway, ClientRequest::ClaimIdentity { name: "alice".into() })
        .await;
    assert!(matches!(rival.take(), Some(ServerEvent::IdentityAccepted { .. })));
}

#[tokio::test]
async fn test_join_queue_is_idempotent() {
    let gateway = gateway(30_000, 10);
    let mut alice = Client::named(&gateway, "alice").await;
    alice.send(&gateway, ClientRequest::JoinQueue).await;
    alice.send(&gateway, ClientRequest::JoinQueue).await;
    assert_eq!(alice.drain(), vec![ServerEvent::Waiting, ServerEvent::Waiting]);
    assert_eq!(gateway.registry().stats().waiting, 1);

    let mut bob = Client::named(&gateway, "bob").await;
    bob.send(&gateway, ClientRequest::JoinQueue).await;
    let (session_id, ..) = bob.started();
    alice.drain();

    bob.send(&gateway, ClientRequest::JoinQueue).await;
    let (again, color, ..) = bob.started();
    assert_eq!(again, session_id);
    assert_eq!(color, Color::White);
    assert_eq!(gateway.registry().stats().sessions, 1);
    assert!(alice.take().is_none());
}

#[tokio::test]
async fn test_leave_queue() {
    let gateway = gateway(30_000, 10);
    let mut alice = Client::named(&gateway, "alice").await;
    alice.send(&gateway, ClientRequest::JoinQueue).await;
    alice.send(&gateway, ClientRequest::LeaveQueue).await;
    alice.drain();
    assert!(!gateway.registry().is_queued("alice"));

    let mut bob = Client::named(&gateway, "bob").await;
    bob.send(&gateway, ClientRequest::JoinQueue).await;
    assert_eq!(bob.take(), Some(ServerEvent::Waiting));
    assert!(alice.take().is_none());
}

#[tokio::test]
async fn test_strangers_and_unknown_sessions_refused() {
    let gateway = gateway(30_000, 10);
    let (mut alice, _bob, session_id) = paired(&gateway).await;
    let mut carol = Client::named(&gateway, "carol").await;

    carol.play(&gateway, &session_id, 0, 0).await;
    assert!(matches!(carol.take(), Some(ServerEvent::RequestRejected { .. })));

    alice.play(&gateway, "game-999", 0, 0).await;
    assert!(matches!(alice.take(), Some(ServerEvent::RequestRejected { .. })));

    alice.play(&gateway, &session_id, 19, 0).await;
    assert_eq!(
        alice.take(),
        Some(ServerEvent::MoveRejected {
            reason: "Position out of bounds".to_string()
        })
    );
    alice.play(&gateway, &session_id, -1, 3).await;
    assert!(matches!(alice.take(), Some(ServerEvent::MoveRejected { .. })));
}

#[tokio::test]
async fn test_concurrent_moves_one_per_turn() {
    let gateway = gateway(30_000, 10);
    let (alice, _bob, session_id) = paired(&gateway).await;

    let first = ClientRequest::SubmitMove {
        session_id: session_id.clone(),
        row: 3,
        col: 3,
    };
    let second = ClientRequest::SubmitMove {
        session_id: session_id.clone(),
        row: 4,
        col: 4,
    };
    let (a, b) = tokio::join!(
        gateway.handle(alice.conn, first),
        gateway.handle(alice.conn, second)
    );

    let own = |outbound: &[Outbound]| {
        outbound
            .iter()
            .filter(|o| o.to == alice.conn)
            .map(|o| o.event.clone())
            .collect::<Vec<_>>()
    };
    let results = [own(&a), own(&b)];
    let applied = results
        .iter()
        .filter(|events| matches!(events.as_slice(), [ServerEvent::StateUpdate { .. }]))
        .count();
    let refused = results
        .iter()
        .filter(|events| {
            events.as_slice()
                == [ServerEvent::MoveRejected {
                    reason: "Not your turn".to_string(),
                }]
        })
        .count();
    assert_eq!((applied, refused), (1, 1));

    let shared = gateway.registry().session(&session_id).expect("live");
    assert_eq!(shared.lock().await.game().move_count(), 1);
}

#[tokio::test]
async fn test_explicit_quit_tears_down_at_once() {
    let gateway = gateway(30_000, 10);
    let (mut alice, mut bob, session_id) = paired(&gateway).await;
    alice.play(&gateway, &session_id, 9, 9).await;
    alice.drain();
    bob.drain();

    bob.send(
        &gateway,
        ClientRequest::ExplicitQuit {
            session_id: session_id.clone(),
        },
    )
    .await;
    for client in [&mut alice, &mut bob] {
        match client.take() {
            Some(ServerEvent::SessionEnded { outcome, state, .. }) => {
                assert_eq!(outcome, Outcome::Abandoned);
                assert_eq!(state.stone_at(9, 9), Some(Color::Black));
            }
            other => panic!("expected session-ended, got {other:?}"),
        }
    }
    assert!(gateway.registry().session(&session_id).is_none());
    assert!(gateway.registry().session_of("alice").is_none());

    alice.play(&gateway, &session_id, 0, 0).await;
    assert!(matches!(alice.take(), Some(ServerEvent::RequestRejected { .. })));

    // Both are free to be matched again.
    alice.send(&gateway, ClientRequest::JoinQueue).await;
    assert_eq!(alice.take(), Some(ServerEvent::Waiting));
}

#[tokio::test]
async fn test_quit_after_win_reports_the_win() {
    let gateway = gateway(30_000, 10);
    let (mut alice, bob, session_id) = paired(&gateway).await;
    for row in 0..4 {
        alice.play(&gateway, &session_id, row, 0).await;
        bob.play(&gateway, &session_id, row, 1).await;
    }
    alice.play(&gateway, &session_id, 4, 0).await;
    alice.drain();

    let shared = gateway.registry().session(&session_id).expect("live");
    bob.send(
        &gateway,
        ClientRequest::ExplicitQuit {
            session_id: session_id.clone(),
        },
    )
    .await;
    match alice.take() {
        Some(ServerEvent::SessionEnded {
            outcome,
            winner_name,
            loser_name,
            state,
        }) => {
            assert_eq!(outcome, Outcome::BlackWon);
            assert_eq!(winner_name.as_deref(), Some("alice"));
            assert_eq!(loser_name.as_deref(), Some("bob"));
            assert_eq!(state.outcome, Outcome::BlackWon);
            let expected: Vec<Coord> = (0..5).map(|row| Coord { row, col: 0 }).collect();
            assert_eq!(state.winning_line, Some(expected));
        }
        other => panic!("expected session-ended, got {other:?}"),
    }
    let session = shared.lock().await;
    assert!(session.is_closed());
    assert!(session.game().check_invariants().is_ok());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_both_players_racing_for_one_cell() {
    let gateway = gateway(30_000, 10);
    let (alice, bob, session_id) = paired(&gateway).await;

    let submit = |row, col| ClientRequest::SubmitMove {
        session_id: session_id.clone(),
        row,
        col,
    };
    let applied_for = |outbound: &[Outbound], conn: ConnectionId| {
        outbound
            .iter()
            .any(|o| o.to == conn && matches!(o.event, ServerEvent::StateUpdate { .. }))
    };

    // Bob's claim on the cell is only legal if Alice's move lands first, and
    // then the cell is taken; either way one stone is placed.
    let (a, b) = tokio::join!(
        gateway.handle(alice.conn, submit(3, 3)),
        gateway.handle(bob.conn, submit(3, 3))
    );
    assert!(applied_for(&a, alice.conn));
    assert!(!applied_for(&b, bob.conn));

    // Bob racing on another cell either lands after Alice or is refused.
    let (a, b) = tokio::join!(
        gateway.handle(bob.conn, submit(4, 4)),
        gateway.handle(alice.conn, submit(5, 5))
    );
    let applied = [applied_for(&a, bob.conn), applied_for(&b, alice.conn)];
    assert!(applied[0], "bob holds the turn");

    let shared = gateway.registry().session(&session_id).expect("live");
    let session = shared.lock().await;
    let game = session.game();
    let placed = 1 + applied.iter().filter(|ok| **ok).count();
    assert_eq!(game.move_count(), placed);
    assert!(game.check_invariants().is_ok());
    let colors: Vec<Color> = game.history().iter().map(|mv| *mv.color()).collect();
    assert!(colors.windows(2).all(|pair| pair[0] != pair[1]), "turns alternate");
    assert_eq!(
        game.board().get(Coord { row: 3, col: 3 }),
        Cell::Stone(Color::Black)
    );
}
