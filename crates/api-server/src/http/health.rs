use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use shared::models::OkResponse;

pub(super) async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, Json(OkResponse { ok: true }))
}
