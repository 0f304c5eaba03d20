//! Content negotiation for body-returning endpoints.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;

use crate::error::ApiError;

const ACCEPT_TYPE: &str = "application/json";

/// Extractor that rejects with 406 unless the caller accepts JSON.
/// Endpoints without response bodies (deletes, relationship updates) do
/// not use it.
pub struct RequireJsonAccept;

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for RequireJsonAccept {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.headers.get(header::ACCEPT).and_then(|v| v.to_str().ok()) {
            // An absent Accept header means the caller takes anything.
            None => Ok(Self),
            Some(accept) if accepts_json(accept) => Ok(Self),
            Some(accept) => Err(ApiError::not_acceptable(format!(
                "Unsupported Accept MIME type {}. Must accept {}",
                accept, ACCEPT_TYPE
            ))),
        }
    }
}

fn accepts_json(accept: &str) -> bool {
    accept
        .split(',')
        .filter_map(|part| part.split(';').next())
        .map(str::trim)
        .any(|media_type| {
            media_type.eq_ignore_ascii_case(ACCEPT_TYPE)
                || media_type.eq_ignore_ascii_case("application/*")
                || media_type == "*/*"
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_and_wildcards_are_acceptable() {
        assert!(accepts_json("application/json"));
        assert!(accepts_json("application/*"));
        assert!(accepts_json("*/*"));
        assert!(accepts_json("text/html, application/json;q=0.9"));
        assert!(accepts_json("Application/JSON"));
    }

    #[test]
    fn non_json_types_are_not_acceptable() {
        assert!(!accepts_json("text/html"));
        assert!(!accepts_json("application/xml"));
        assert!(!accepts_json("text/*"));
    }
}
