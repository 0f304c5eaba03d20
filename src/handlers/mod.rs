//! HTTP Surface: request-shape validation and status mapping. Domain
//! rules live in `services`; handlers translate between the two.

pub mod cars;
pub mod garages;
pub mod oauth;
pub mod users;
pub mod validate;

use axum::extract::{OriginalUri, State};
use axum::http::{header, Method, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::error::ApiError;
use crate::state::AppState;

/// Parses a numeric path id. Non-numeric ids can never match a stored
/// entity, so they behave as NotFound rather than a validation failure.
pub(crate) fn parse_id(raw: &str, message: &'static str) -> Result<i64, ApiError> {
    raw.parse::<i64>().map_err(|_| ApiError::not_found(message))
}

/// 405 for unsupported verbs on the collection routes, advertising the
/// supported ones.
pub async fn collection_not_allowed(
    State(state): State<AppState>,
    method: Method,
    OriginalUri(uri): OriginalUri,
) -> impl IntoResponse {
    let url = format!("{}{}", state.base_url(), uri.path());
    let message = format!("The {} method is not allowed on {}", method, url);
    (
        StatusCode::METHOD_NOT_ALLOWED,
        [(header::ACCEPT, "GET, POST")],
        Json(json!({ "Error": message })),
    )
}
