//! Bearer-token authentication for protected routes.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{header, HeaderMap};

use crate::error::ApiError;
use crate::state::AppState;

/// Verified subject identifier of the calling user, extracted from the
/// `Authorization: Bearer` header on protected routes.
#[derive(Clone, Debug)]
pub struct AuthSubject(pub String);

#[async_trait]
impl FromRequestParts<AppState> for AuthSubject {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // A missing header and a token that fails verification are
        // distinct states internally but produce the same response, so
        // callers learn nothing about why they were refused.
        let token = bearer_token(&parts.headers).ok_or_else(unauthorized)?;
        let identity = state.verifier.verify(token).await.ok_or_else(unauthorized)?;
        Ok(Self(identity.sub))
    }
}

fn unauthorized() -> ApiError {
    ApiError::unauthorized("Missing or invalid bearer token")
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn extracts_bearer_token() {
        assert_eq!(bearer_token(&headers("Bearer abc.def.ghi")), Some("abc.def.ghi"));
    }

    #[test]
    fn rejects_missing_or_malformed_header() {
        assert_eq!(bearer_token(&HeaderMap::new()), None);
        assert_eq!(bearer_token(&headers("Basic dXNlcjpwdw")), None);
        assert_eq!(bearer_token(&headers("Bearer ")), None);
        assert_eq!(bearer_token(&headers("abc.def.ghi")), None);
    }
}
