//! Extractors whose rejections render as [`AppError`] (400 with an `err` body)
//! instead of axum's plain-text defaults.

use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::{header::CONTENT_TYPE, HeaderMap};
use serde::de::DeserializeOwned;

use crate::error::AppError;

/// JSON request body.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Query string parameters.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

/// Path parameters.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

/// Write input taken from a JSON body, or from the query string when the
/// request is not JSON. List fields can only be sent in a JSON body.
pub struct ApiInput<T>(pub T);

impl<S, T> FromRequest<S> for ApiInput<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if is_json(req.headers()) {
            let ApiJson(value) = ApiJson::<T>::from_request(req, state).await?;
            return Ok(Self(value));
        }

        let (mut parts, _body) = req.into_parts();
        let ApiQuery(value) = ApiQuery::<T>::from_request_parts(&mut parts, state).await?;
        Ok(Self(value))
    }
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(|mime| {
            let mime = mime.trim();
            mime == "application/json" || mime.ends_with("+json")
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::StatusCode, routing::post, Router};
    use serde::Deserialize;
    use tower::ServiceExt;

    #[derive(Deserialize)]
    struct Shelf {
        name: String,
        size: Option<u32>,
    }

    async fn describe(ApiInput(shelf): ApiInput<Shelf>) -> String {
        format!("{}:{:?}", shelf.name, shelf.size)
    }

    async fn call(request: Request<Body>) -> (StatusCode, String) {
        let app = Router::new().route("/shelves", post(describe));
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn input_reads_json_body() {
        let request = axum::http::Request::builder()
            .method("POST")
            .uri("/shelves?name=ignored")
            .header(CONTENT_TYPE, "application/json; charset=utf-8")
            .body(Body::from(r#"{"name": "attic", "size": 3}"#))
            .unwrap();
        assert_eq!(call(request).await, (StatusCode::OK, "attic:Some(3)".to_string()));
    }

    #[tokio::test]
    async fn input_falls_back_to_query_string() {
        let request = axum::http::Request::builder()
            .method("POST")
            .uri("/shelves?name=attic&size=7")
            .body(Body::empty())
            .unwrap();
        assert_eq!(call(request).await, (StatusCode::OK, "attic:Some(7)".to_string()));
    }

    #[tokio::test]
    async fn input_rejections_are_bad_requests() {
        let missing = axum::http::Request::builder()
            .method("POST")
            .uri("/shelves")
            .body(Body::empty())
            .unwrap();
        let (status, body) = call(missing).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("\"err\""));

        let malformed = axum::http::Request::builder()
            .method("POST")
            .uri("/shelves")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, _) = call(malformed).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
