//! Heuristic opponent against itself, for demos and smoke tests.

use rand::SeedableRng;
use rand::rngs::StdRng;
use strictly_gomoku::{Game, Placement, select_move};
use tracing::{debug, info, instrument, warn};

/// Plays one full game and returns it.
///
/// A fixed `seed` makes the game reproducible.
#[instrument]
pub fn play(seed: Option<u64>) -> Game {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let mut game = Game::new();

    while game.is_active() {
        let color = game.turn();
        let Some(at) = select_move(game.board(), color, &mut rng) else {
            break;
        };
        match game.place(at.row as i64, at.col as i64, color) {
            Ok(Placement::Continue) => debug!(%color, %at, "Stone placed"),
            Ok(_) => info!(%color, %at, outcome = %game.outcome(), "Game over"),
            Err(reason) => {
                warn!(%reason, %at, "Heuristic chose an illegal cell");
                break;
            }
        }
    }
    game
}
