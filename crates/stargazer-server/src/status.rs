use axum::Json;
use axum::extract::State;

use stargazer_core::StatusSnapshot;

use crate::state::AppState;

/// `GET /status`: the active watcher's snapshot as JSON.
pub async fn get_status(State(state): State<AppState>) -> Json<StatusSnapshot> {
    Json(state.status.snapshot().await)
}
