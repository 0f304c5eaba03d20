//! JSON request-body extraction.

use axum::async_trait;
use axum::extract::{FromRequest, Request};
use axum::Json;
use serde_json::Value;

use crate::error::ApiError;

/// Extracts the request body as JSON. Unlike the plain [`Json`]
/// extractor, a body that fails to parse (or a missing JSON content
/// type) is reported through the API's own error body, not axum's
/// plain-text rejection.
#[derive(Debug)]
pub struct JsonBody(pub Value);

#[async_trait]
impl<S> FromRequest<S> for JsonBody
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<Value>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(ApiError::validation(rejection.body_text())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request as HttpRequest, StatusCode};

    fn post_json(body: &'static str) -> Request {
        HttpRequest::builder()
            .method("POST")
            .uri("/")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn well_formed_body_passes_through() {
        let JsonBody(value) = JsonBody::from_request(post_json(r#"{"make":"Honda"}"#), &())
            .await
            .unwrap();
        assert_eq!(value["make"], "Honda");
    }

    #[tokio::test]
    async fn malformed_body_becomes_a_validation_error() {
        let err = JsonBody::from_request(post_json("{\"make\": "), &())
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(err.to_json().get("Error").is_some());
    }

    #[tokio::test]
    async fn missing_content_type_becomes_a_validation_error() {
        let req = HttpRequest::builder()
            .method("POST")
            .uri("/")
            .body(Body::from("{}"))
            .unwrap();
        let err = JsonBody::from_request(req, &()).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
}
