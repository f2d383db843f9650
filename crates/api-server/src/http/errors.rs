use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use shared::llm::{CompletionError, EMPTY_RESPONSE_CODE, EMPTY_RESPONSE_MESSAGE};
use shared::models::ErrorResponse;
use tracing::{error, warn};

pub(super) const UPSTREAM_FAILURE_MESSAGE: &str = "Gemini request failed.";

fn error_response(status: StatusCode, body: ErrorResponse) -> Response {
    (status, Json(body)).into_response()
}

pub(super) fn configuration_error_response(missing: &str) -> Response {
    let err = CompletionError::Configuration(missing.to_string());
    error!("{err}");
    error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        ErrorResponse::message(err.to_string()),
    )
}

pub(super) fn invalid_request_response(rejection: JsonRejection) -> Response {
    let message = rejection.body_text();
    warn!("rejected completion request body: {message}");
    error_response(rejection.status(), ErrorResponse::message(message))
}

pub(super) fn completion_error_response(err: CompletionError) -> Response {
    match err {
        CompletionError::Configuration(missing) => configuration_error_response(&missing),
        CompletionError::Upstream { message, status } => {
            warn!(status, "upstream rejected completion request: {message}");
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
            error_response(status, ErrorResponse::message(message))
        }
        CompletionError::EmptyResponse => {
            warn!("upstream returned no candidates");
            error_response(
                StatusCode::BAD_GATEWAY,
                ErrorResponse::with_code(EMPTY_RESPONSE_MESSAGE, EMPTY_RESPONSE_CODE),
            )
        }
        CompletionError::InvalidPayload(reason) => {
            error!("upstream returned an invalid payload: {reason}");
            upstream_failure_response()
        }
        CompletionError::Transport => {
            error!("upstream request failed in transport");
            upstream_failure_response()
        }
    }
}

fn upstream_failure_response() -> Response {
    error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        ErrorResponse::message(UPSTREAM_FAILURE_MESSAGE),
    )
}
