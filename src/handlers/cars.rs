//! Car routes, all bearer-protected.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use crate::error::ApiError;
use crate::middleware::accept::RequireJsonAccept;
use crate::middleware::auth::AuthSubject;
use crate::middleware::body::JsonBody;
use crate::services::cars::{self, CarPatch, NewCar};
use crate::state::AppState;

use super::validate::{exact_fields, optional_string_field, string_field, subset_fields};
use super::parse_id;

const CREATE_FIELDS: &[&str] = &["make", "model", "color"];
const CREATE_MSG: &str = "Cars can only have attributes make, model, and color; all required";
const PATCH_MSG: &str = "Only make, model, and/or color can be updated for a car";
const NO_CAR_MSG: &str = "No car with this car_id exists for the authenticated user";
const PAIR_MISSING_MSG: &str =
    "Either no car with this car_id or garage with this garage_id exists";

/// POST /cars
pub async fn create(
    State(state): State<AppState>,
    _accept: RequireJsonAccept,
    AuthSubject(subject): AuthSubject,
    JsonBody(body): JsonBody,
) -> Result<impl IntoResponse, ApiError> {
    let fields = exact_fields(&body, CREATE_FIELDS, CREATE_MSG)?;
    let new = NewCar {
        make: string_field(fields, "make", CREATE_MSG)?,
        model: string_field(fields, "model", CREATE_MSG)?,
        color: string_field(fields, "color", CREATE_MSG)?,
    };
    let car = cars::create_car(&state.store, state.base_url(), &subject, new).await?;
    Ok((StatusCode::CREATED, Json(car)))
}

/// GET /cars
pub async fn list(
    State(state): State<AppState>,
    _accept: RequireJsonAccept,
    AuthSubject(subject): AuthSubject,
) -> Result<impl IntoResponse, ApiError> {
    let page = cars::list_cars(&state.store, state.base_url(), &subject, None).await?;
    Ok(Json(page))
}

/// GET /cars/page/:cursor
pub async fn list_page(
    State(state): State<AppState>,
    _accept: RequireJsonAccept,
    AuthSubject(subject): AuthSubject,
    Path(cursor): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let page = cars::list_cars(&state.store, state.base_url(), &subject, Some(&cursor)).await?;
    Ok(Json(page))
}

/// GET /cars/:car_id
pub async fn fetch(
    State(state): State<AppState>,
    _accept: RequireJsonAccept,
    AuthSubject(subject): AuthSubject,
    Path(car_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let car_id = parse_id(&car_id, NO_CAR_MSG)?;
    let car = cars::get_car(&state.store, state.base_url(), &subject, car_id).await?;
    Ok(Json(car))
}

/// PATCH /cars/:car_id
pub async fn update(
    State(state): State<AppState>,
    _accept: RequireJsonAccept,
    AuthSubject(subject): AuthSubject,
    Path(car_id): Path<String>,
    JsonBody(body): JsonBody,
) -> Result<impl IntoResponse, ApiError> {
    let fields = subset_fields(&body, CREATE_FIELDS, PATCH_MSG)?;
    let patch = CarPatch {
        make: optional_string_field(fields, "make", PATCH_MSG)?,
        model: optional_string_field(fields, "model", PATCH_MSG)?,
        color: optional_string_field(fields, "color", PATCH_MSG)?,
    };
    let car_id = parse_id(&car_id, NO_CAR_MSG)?;
    let car = cars::update_car(&state.store, state.base_url(), &subject, car_id, patch).await?;
    Ok(Json(car))
}

/// DELETE /cars/:car_id. No Accept check, the success path has no body.
pub async fn remove(
    State(state): State<AppState>,
    AuthSubject(subject): AuthSubject,
    Path(car_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let car_id = parse_id(&car_id, NO_CAR_MSG)?;
    cars::delete_car(&state.store, &subject, car_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /cars/:car_id/garages/:garage_id
pub async fn assign(
    State(state): State<AppState>,
    AuthSubject(subject): AuthSubject,
    Path((car_id, garage_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let car_id = parse_id(&car_id, PAIR_MISSING_MSG)?;
    let garage_id = parse_id(&garage_id, PAIR_MISSING_MSG)?;
    cars::assign_to_garage(&state.store, &subject, car_id, garage_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /cars/:car_id/garages/:garage_id
pub async fn unassign(
    State(state): State<AppState>,
    AuthSubject(subject): AuthSubject,
    Path((car_id, garage_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let car_id = parse_id(&car_id, PAIR_MISSING_MSG)?;
    let garage_id = parse_id(&garage_id, PAIR_MISSING_MSG)?;
    cars::remove_from_garage(&state.store, &subject, car_id, garage_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
