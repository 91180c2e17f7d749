use axum::{Extension, Json};
use chess_core::history::{self, MovePair};
use chess_core::{MoveInput, MoveRecord, PositionSnapshot};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct GameView {
    #[serde(flatten)]
    pub position: PositionSnapshot,
    pub history: Vec<MoveRecord>,
}

#[derive(Serialize)]
pub struct MoveResult {
    pub applied: bool,
    #[serde(rename = "move", skip_serializing_if = "Option::is_none")]
    pub record: Option<MoveRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub position: PositionSnapshot,
}

#[derive(Serialize)]
pub struct HistoryView {
    pub moves: Vec<MovePair>,
}

/// GET /api/game
pub async fn get_game(Extension(state): Extension<AppState>) -> Json<GameView> {
    let game = state.game.read();
    Json(GameView {
        position: game.snapshot(),
        history: game.history().to_vec(),
    })
}

/// POST /api/game/move
///
/// A rejected move is not an HTTP error: the board snaps back, so the
/// response carries the unchanged position.
pub async fn make_move(
    Extension(state): Extension<AppState>,
    Json(input): Json<MoveInput>,
) -> Json<MoveResult> {
    let outcome = state.game.write().apply(&input);

    let result = match outcome {
        Ok(applied) => {
            tracing::info!("Board move {} -> {}", applied.record.san, applied.position.status);
            state.publish_board();
            MoveResult {
                applied: true,
                record: Some(applied.record),
                error: None,
                position: applied.position,
            }
        }
        Err(e) => {
            tracing::debug!("Rejected move {}: {e}", input.describe());
            MoveResult {
                applied: false,
                record: None,
                error: Some(e.to_string()),
                position: state.game.read().snapshot(),
            }
        }
    };

    Json(result)
}

/// POST /api/game/reset
pub async fn reset_game(Extension(state): Extension<AppState>) -> Json<PositionSnapshot> {
    let snapshot = {
        let mut game = state.game.write();
        game.reset();
        game.snapshot()
    };
    tracing::info!("Game reset");
    state.publish_board();
    Json(snapshot)
}

/// GET /api/game/history
pub async fn get_history(Extension(state): Extension<AppState>) -> Json<HistoryView> {
    let game = state.game.read();
    Json(HistoryView {
        moves: history::move_pairs(game.history()),
    })
}
