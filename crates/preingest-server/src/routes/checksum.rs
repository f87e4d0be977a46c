use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use preingest_core::{ChecksumStep, PreingestError, Step};

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChecksumBody {
    /// Selector as supplied by the submitter, e.g. `MD5` or `SHA-256`.
    /// Unknown selectors are accepted here and reported by the step.
    pub algorithm: String,
    #[serde(default)]
    pub expected: Option<String>,
}

/// POST /api/checksum/{collection} — start a checksum calculation.
///
/// Returns 202 as soon as the step is scheduled. Progress and outcome are
/// published on `/api/events` and recorded under the returned `process_id`.
pub async fn start_checksum(
    State(app): State<AppState>,
    Path(collection): Path<String>,
    Json(body): Json<ChecksumBody>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let collection = app.collection(&collection)?;
    if !collection.exists() {
        return Err(PreingestError::CollectionNotFound(collection.name().to_string()).into());
    }

    let name = collection.name().to_string();
    let mut step = ChecksumStep::new(
        app.step_context(collection),
        Arc::clone(&app.fixity),
        body.algorithm,
    )
    .with_expected(body.expected);
    let process_id = step.process_id();
    let session_id = step.session_id();

    tracing::info!(%process_id, %session_id, collection = %name, "checksum requested");
    tokio::task::spawn_blocking(move || match step.execute() {
        Ok(payload) => tracing::info!(
            %process_id,
            result = ?payload.result,
            "checksum finished"
        ),
        Err(e) => tracing::error!(%process_id, error = %e, "checksum did not run"),
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(serde_json::json!({
            "message": format!("Checksum calculation for collection '{name}' started."),
            "session_id": session_id,
            "process_id": process_id,
        })),
    ))
}
