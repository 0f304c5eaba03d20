use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers;
use crate::state::AppState;

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        // Sign-in flow
        .route("/authReq", get(handlers::oauth::auth_request))
        .route("/oauth", get(handlers::oauth::callback))
        // Users
        .route("/users", get(handlers::users::list))
        // Cars (bearer-protected)
        .route(
            "/cars",
            post(handlers::cars::create)
                .get(handlers::cars::list)
                .delete(handlers::collection_not_allowed),
        )
        .route("/cars/page/:cursor", get(handlers::cars::list_page))
        .route(
            "/cars/:car_id",
            get(handlers::cars::fetch)
                .patch(handlers::cars::update)
                .delete(handlers::cars::remove),
        )
        // Car <-> garage relationship
        .route(
            "/cars/:car_id/garages/:garage_id",
            put(handlers::cars::assign).delete(handlers::cars::unassign),
        )
        // Garages (unauthenticated)
        .route(
            "/garages",
            post(handlers::garages::create)
                .get(handlers::garages::list)
                .delete(handlers::collection_not_allowed),
        )
        .route("/garages/page/:cursor", get(handlers::garages::list_page))
        .route(
            "/garages/:garage_id",
            get(handlers::garages::fetch)
                .patch(handlers::garages::update)
                .delete(handlers::garages::remove),
        )
        // Global middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "name": "Carport API",
        "version": version,
        "description": "REST API for tracking cars and the garages they live in",
        "endpoints": {
            "sign_in": "/authReq (public - starts the OAuth2 flow)",
            "users": "/users (public)",
            "cars": "/cars[/:car_id] (bearer)",
            "garages": "/garages[/:garage_id] (public)",
            "relationship": "/cars/:car_id/garages/:garage_id (bearer)",
        }
    }))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.store.ping().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "timestamp": now,
                "datastore": "ok"
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "degraded",
                "timestamp": now,
                "datastore_error": e.to_string()
            })),
        ),
    }
}
