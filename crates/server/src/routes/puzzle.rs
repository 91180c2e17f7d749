use axum::{Extension, Json};
use serde_json::{json, Value};

use crate::error::AppError;
use crate::state::AppState;

/// GET /api/puzzle
pub async fn get_puzzle(Extension(state): Extension<AppState>) -> Result<Json<Value>, AppError> {
    let puzzle = state.puzzle.read().clone();
    let Some(view) = puzzle else {
        return Ok(Json(json!({ "loading": true })));
    };

    let mut body = serde_json::to_value(view)?;
    if let Some(obj) = body.as_object_mut() {
        obj.insert("loading".to_string(), Value::Bool(false));
    }
    Ok(Json(body))
}
