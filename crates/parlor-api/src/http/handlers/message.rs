//! Message history HTTP handler.
//!
//! Endpoint:
//! - GET /api/v1/messages - All stored messages, newest first.
//!
//! The response is unpaginated: the dataset is every message the instance
//! has ever stored, so this endpoint grows without bound. Acceptable at
//! chat-feature scale; revisit before exposing it beyond administration.

use std::time::Instant;

use axum::Json;
use axum::extract::State;
use uuid::Uuid;

use parlor_core::message::MessageRepository;
use parlor_types::message::Message;

use crate::http::error::AppError;
use crate::http::extractors::auth::Authenticated;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// GET /api/v1/messages - All messages across conversations, newest first.
pub async fn list_messages(
    State(state): State<AppState>,
    _auth: Authenticated,
) -> Result<Json<ApiResponse<Vec<Message>>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let messages = state.messages.all_recent_first().await?;

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(messages, request_id, elapsed)))
}
