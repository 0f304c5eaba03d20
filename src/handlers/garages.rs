//! Garage routes. No ownership concept, so no bearer requirement.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use crate::error::ApiError;
use crate::middleware::accept::RequireJsonAccept;
use crate::middleware::body::JsonBody;
use crate::services::garages::{self, GaragePatch, NewGarage};
use crate::state::AppState;

use super::validate::{exact_fields, optional_string_field, string_field, subset_fields};
use super::parse_id;

const CREATE_FIELDS: &[&str] = &["name", "city", "state"];
const CREATE_MSG: &str = "Garages can only have attributes name, city, and state; all required";
const PATCH_MSG: &str = "Only name, city, and/or state can be updated for a garage";
const NO_GARAGE_MSG: &str = "No garage with this garage_id exists";

/// POST /garages
pub async fn create(
    State(state): State<AppState>,
    _accept: RequireJsonAccept,
    JsonBody(body): JsonBody,
) -> Result<impl IntoResponse, ApiError> {
    let fields = exact_fields(&body, CREATE_FIELDS, CREATE_MSG)?;
    let new = NewGarage {
        name: string_field(fields, "name", CREATE_MSG)?,
        city: string_field(fields, "city", CREATE_MSG)?,
        state: string_field(fields, "state", CREATE_MSG)?,
    };
    let garage = garages::create_garage(&state.store, state.base_url(), new).await?;
    Ok((StatusCode::CREATED, Json(garage)))
}

/// GET /garages
pub async fn list(
    State(state): State<AppState>,
    _accept: RequireJsonAccept,
) -> Result<impl IntoResponse, ApiError> {
    let page = garages::list_garages(&state.store, state.base_url(), None).await?;
    Ok(Json(page))
}

/// GET /garages/page/:cursor
pub async fn list_page(
    State(state): State<AppState>,
    _accept: RequireJsonAccept,
    Path(cursor): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let page = garages::list_garages(&state.store, state.base_url(), Some(&cursor)).await?;
    Ok(Json(page))
}

/// GET /garages/:garage_id
pub async fn fetch(
    State(state): State<AppState>,
    _accept: RequireJsonAccept,
    Path(garage_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let garage_id = parse_id(&garage_id, NO_GARAGE_MSG)?;
    let garage = garages::get_garage(&state.store, state.base_url(), garage_id).await?;
    Ok(Json(garage))
}

/// PATCH /garages/:garage_id
pub async fn update(
    State(state): State<AppState>,
    _accept: RequireJsonAccept,
    Path(garage_id): Path<String>,
    JsonBody(body): JsonBody,
) -> Result<impl IntoResponse, ApiError> {
    let fields = subset_fields(&body, CREATE_FIELDS, PATCH_MSG)?;
    let patch = GaragePatch {
        name: optional_string_field(fields, "name", PATCH_MSG)?,
        city: optional_string_field(fields, "city", PATCH_MSG)?,
        state: optional_string_field(fields, "state", PATCH_MSG)?,
    };
    let garage_id = parse_id(&garage_id, NO_GARAGE_MSG)?;
    let garage = garages::update_garage(&state.store, state.base_url(), garage_id, patch).await?;
    Ok(Json(garage))
}

/// DELETE /garages/:garage_id
pub async fn remove(
    State(state): State<AppState>,
    Path(garage_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let garage_id = parse_id(&garage_id, NO_GARAGE_MSG)?;
    garages::delete_garage(&state.store, garage_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
