use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use uuid::Uuid;

use preingest_core::action::ActionRecord;

use crate::error::AppError;
use crate::state::AppState;

fn parse_id(kind: &str, raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::bad_request(format!("invalid {kind} '{raw}'")))
}

/// GET /api/sessions/{session_id}/actions — every action recorded for a
/// session, oldest first, each with its status history.
pub async fn list_session_actions(
    State(app): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<Vec<ActionRecord>>, AppError> {
    let session_id = parse_id("session id", &session_id)?;
    let store = Arc::clone(&app.store);
    let records = tokio::task::spawn_blocking(move || store.list_actions(session_id))
        .await
        .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;
    Ok(Json(records))
}

/// GET /api/actions/{process_id}
pub async fn get_action(
    State(app): State<AppState>,
    Path(process_id): Path<String>,
) -> Result<Json<ActionRecord>, AppError> {
    let process_id = parse_id("process id", &process_id)?;
    let store = Arc::clone(&app.store);
    let record = tokio::task::spawn_blocking(move || store.get_action(process_id))
        .await
        .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;
    Ok(Json(record))
}
