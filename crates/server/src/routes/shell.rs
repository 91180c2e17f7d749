use axum::{Extension, Json};
use chess_core::Side;
use serde::{Deserialize, Serialize};
use voice_bridge::SessionState;

use crate::state::{AppState, Tab};

#[derive(Serialize)]
pub struct ShellView {
    pub status: String,
    pub turn: Side,
    pub active_tab: Tab,
    pub voice: SessionState,
}

#[derive(Deserialize)]
pub struct TabRequest {
    pub tab: Tab,
}

/// GET /api/shell
pub async fn get_shell(Extension(state): Extension<AppState>) -> Json<ShellView> {
    let (status, turn) = {
        let game = state.game.read();
        (game.status_text(), game.turn())
    };
    Json(ShellView {
        status,
        turn,
        active_tab: *state.active_tab.read(),
        voice: state.voice.state(),
    })
}

/// PUT /api/shell/tab
pub async fn set_tab(
    Extension(state): Extension<AppState>,
    Json(body): Json<TabRequest>,
) -> Json<ShellView> {
    *state.active_tab.write() = body.tab;
    get_shell(Extension(state)).await
}
