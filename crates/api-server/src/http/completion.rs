use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use shared::config::GEMINI_API_KEY_VAR;
use shared::models::{CompletionRequest, CompletionResponse};
use tracing::debug;

use super::AppState;
use super::errors::{
    completion_error_response, configuration_error_response, invalid_request_response,
};

pub(super) async fn complete(
    State(state): State<AppState>,
    request: Result<Json<CompletionRequest>, JsonRejection>,
) -> Response {
    let Some(backend) = state.completion_backend.as_ref() else {
        return configuration_error_response(GEMINI_API_KEY_VAR);
    };
    let Json(request) = match request {
        Ok(request) => request,
        Err(rejection) => return invalid_request_response(rejection),
    };

    debug!(
        message_count = request.messages.len(),
        "forwarding completion request"
    );

    match backend.complete(request.messages).await {
        Ok(text) => (StatusCode::OK, Json(CompletionResponse { text })).into_response(),
        Err(err) => completion_error_response(err),
    }
}
