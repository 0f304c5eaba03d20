//! User listing.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

use crate::error::ApiError;
use crate::middleware::accept::RequireJsonAccept;
use crate::services::users;
use crate::state::AppState;

/// GET /users
pub async fn list(
    State(state): State<AppState>,
    _accept: RequireJsonAccept,
) -> Result<impl IntoResponse, ApiError> {
    let users = users::list_users(&state.store).await?;
    Ok(Json(users))
}
