use async_trait::async_trait;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use axum::Json;
use serde::de::DeserializeOwned;

use crate::error::ApiError;

/// JSON body extractor that rejects with the standard error envelope
/// instead of axum's plain-text 422s.
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(json_rejection_to_error(rejection)),
        }
    }
}

fn json_rejection_to_error(rejection: JsonRejection) -> ApiError {
    ApiError::validation_error(rejection.body_text(), None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request as HttpRequest};
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Payload {
        code: String,
    }

    async fn extract(body: &str, content_type: Option<&str>) -> Result<Payload, ApiError> {
        let mut builder = HttpRequest::builder().method("POST").uri("/");
        if let Some(ct) = content_type {
            builder = builder.header(header::CONTENT_TYPE, ct);
        }
        let request = builder.body(Body::from(body.to_string())).unwrap();
        ApiJson::<Payload>::from_request(request, &())
            .await
            .map(|ApiJson(value)| value)
    }

    #[tokio::test]
    async fn valid_body_deserializes() {
        let payload = extract(r#"{"code":"abc"}"#, Some("application/json"))
            .await
            .unwrap();
        assert_eq!(payload.code, "abc");
    }

    #[tokio::test]
    async fn malformed_body_maps_to_validation_error() {
        let err = extract(r#"{"code":"#, Some("application/json"))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.error_code(), "validation_error");
    }

    #[tokio::test]
    async fn missing_content_type_maps_to_validation_error() {
        let err = extract(r#"{"code":"abc"}"#, None).await.unwrap_err();
        assert_eq!(err.error_code(), "validation_error");
    }
}
