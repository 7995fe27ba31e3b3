//! Session endpoints.
//!
//! - GET /session              - Issue a fresh session id
//! - GET /session/{id}/turns   - Stored transcript of a session

use axum::Json;
use axum::extract::{Path, State};
use serde::Serialize;

use parley_core::chat::session::issue_session_id;
use parley_types::session::SessionId;
use parley_types::turn::Turn;

use crate::http::error::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_id: SessionId,
}

#[derive(Debug, Serialize)]
pub struct TranscriptResponse {
    pub session_id: SessionId,
    pub turns: Vec<Turn>,
}

/// GET /session - Issue a new session id. Nothing is stored until the first chat turn.
pub async fn issue_session() -> Json<SessionResponse> {
    Json(SessionResponse {
        session_id: issue_session_id(),
    })
}

/// GET /session/{id}/turns - Ordered transcript; empty for unknown sessions.
pub async fn get_turns(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TranscriptResponse>, AppError> {
    let session_id = SessionId::parse(&id)?;
    let turns = state.relay.transcript(&session_id).await?;
    Ok(Json(TranscriptResponse { session_id, turns }))
}
