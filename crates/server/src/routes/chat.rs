use axum::{http::StatusCode, Extension, Json};
use serde::Deserialize;

use crate::coach::{self, ChatSnapshot};
use crate::error::AppError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

/// GET /api/chat
pub async fn get_chat(Extension(state): Extension<AppState>) -> Json<ChatSnapshot> {
    Json(state.coach.snapshot())
}

/// POST /api/chat
///
/// Returns as soon as the user's message is logged; the coach's answer is
/// appended by a background task.
pub async fn send_message(
    Extension(state): Extension<AppState>,
    Json(body): Json<ChatRequest>,
) -> Result<(StatusCode, Json<ChatSnapshot>), AppError> {
    let text = state.coach.begin(&body.message)?;
    let prompt = coach::build_prompt(&state.game.read().describe_for_prompt(), &text);

    tokio::spawn({
        let chat = state.coach.clone();
        let model = state.coach_model.clone();
        async move {
            let outcome = model.generate(&prompt).await;
            chat.finish(outcome);
        }
    });

    Ok((StatusCode::ACCEPTED, Json(state.coach.snapshot())))
}
