//! Chat relay endpoint.
//!
//! POST /chat with `{"session_id", "message", "mood"?}`; unknown fields
//! (e.g. `user_id`) are ignored. Replies with `{"reply": "..."}`.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use serde::{Deserialize, Serialize};

use parley_core::chat::service::ChatTurnRequest;

use crate::http::error::AppError;
use crate::state::AppState;

/// Request body for `POST /chat`. Presence is checked by the relay service.
#[derive(Debug, Default, Deserialize)]
pub struct ChatBody {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub mood: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub reply: String,
}

/// POST /chat - Relay one user message and return the assistant reply.
pub async fn chat(
    State(state): State<AppState>,
    body: Result<Json<ChatBody>, JsonRejection>,
) -> Result<Json<ChatResponse>, AppError> {
    let Json(body) = body?;

    let reply = state
        .relay
        .handle_chat(ChatTurnRequest {
            session_id: body.session_id,
            message: body.message,
            mood: body.mood,
        })
        .await?;

    Ok(Json(ChatResponse { reply: reply.reply }))
}
