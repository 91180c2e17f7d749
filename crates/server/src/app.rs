use axum::{
    routing::{get, post, put},
    Extension, Router,
};
use tower_http::cors::{Any, CorsLayer};

use crate::clients::lichess::LichessClient;
use crate::puzzle::PuzzleView;
use crate::routes;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health
        .route("/health", get(routes::health::health_check))
        // Game
        .route("/api/game", get(routes::game::get_game))
        .route("/api/game/move", post(routes::game::make_move))
        .route("/api/game/reset", post(routes::game::reset_game))
        .route("/api/game/history", get(routes::game::get_history))
        // Coach
        .route(
            "/api/chat",
            get(routes::chat::get_chat).post(routes::chat::send_message),
        )
        // Daily puzzle
        .route("/api/puzzle", get(routes::puzzle::get_puzzle))
        // Shell
        .route("/api/shell", get(routes::shell::get_shell))
        .route("/api/shell/tab", put(routes::shell::set_tab))
        // Voice
        .route("/api/voice", get(routes::voice_ws::ws_handler))
        .layer(Extension(state))
        .layer(cors)
}

/// Fetch the daily puzzle once in the background. On failure the panel
/// stays in its loading state.
pub fn spawn_puzzle_fetch(state: AppState) {
    tokio::spawn(async move {
        let client = match LichessClient::new(state.config.lichess_base_url.clone()) {
            Ok(client) => client,
            Err(e) => {
                tracing::warn!("Failed to build Lichess client: {e}");
                return;
            }
        };
        match client.fetch_daily_puzzle().await {
            Ok(puzzle) => {
                tracing::info!("Loaded daily puzzle {}", puzzle.puzzle.id);
                *state.puzzle.write() = Some(PuzzleView::new(puzzle));
            }
            Err(e) => tracing::warn!("Failed to fetch daily puzzle: {e}"),
        }
    });
}
