//! Sign-in flow: redirect to the identity provider, then handle its
//! callback by exchanging the code, provisioning the account on first
//! login, and showing the issued token.

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse};
use serde::Deserialize;
use tracing::{error, warn};

use crate::error::ApiError;
use crate::services::users;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
}

/// GET /authReq: 302 to the provider's authorization endpoint.
pub async fn auth_request(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let redirect_uri = state.config.oauth_redirect_uri();
    let url = state.verifier.authorization_url(&redirect_uri).map_err(|e| {
        error!("cannot build authorization URL: {}", e);
        ApiError::internal("Identity provider is misconfigured")
    })?;
    Ok((StatusCode::FOUND, [(header::LOCATION, url)]))
}

/// GET /oauth, the provider callback. Verifies the issued id token, creates
/// the user account on first sign-in, and echoes the token for API use.
pub async fn callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Result<Html<String>, ApiError> {
    let code = query
        .code
        .as_deref()
        .ok_or_else(|| ApiError::validation("Missing authorization code"))?;

    let redirect_uri = state.config.oauth_redirect_uri();
    let (identity, id_token) = state
        .verifier
        .exchange_code(code, &redirect_uri)
        .await
        .map_err(|e| {
            warn!("authorization code exchange failed: {}", e);
            ApiError::unauthorized("Authorization code could not be exchanged for a token")
        })?;

    let account = users::ensure_user(&state.store, &identity).await?;
    Ok(Html(welcome_page(
        state.base_url(),
        &account.name,
        &account.user_id,
        &id_token,
    )))
}

fn welcome_page(base: &str, name: &str, user_id: &str, token: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
    <head>
        <meta charset="UTF-8" />
        <meta name="viewport" content="width=device-width, initial-scale=1.0" />
        <title>Carport</title>
    </head>
    <body>
        <div style="display:flex;flex-direction:column;justify-content:center;align-items:center;word-break:break-all;">
            <h1>User Account Info</h1>
            <div>Welcome {name}!</div><br>
            <div><b>Unique User ID:</b></div>
            <div>{user_id}</div><br>
            <div><b>Issued JWT:</b></div>
            <div>{token}</div><br>
            <div><a href="{base}">Return Home</a></div>
        </div>
    </body>
</html>"#
    )
}
