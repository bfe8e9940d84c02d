//! HTTP mapping for `OathError`.

use axum::Json;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use oathlink_core::OathError;
use serde::Serialize;
use tracing::{debug, error};

/// Body of every non-2xx response produced by a handler.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub ok: bool,
    pub error: String,
    pub detail: String,
}

impl ErrorBody {
    pub fn new(kind: &str, detail: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: kind.to_string(),
            detail: detail.into(),
        }
    }
}

/// Wrapper so handlers can return `Result<_, ApiError>` and use `?`.
#[derive(Debug)]
pub struct ApiError(pub OathError);

impl From<OathError> for ApiError {
    fn from(e: OathError) -> Self {
        Self(e)
    }
}

pub fn status_for(e: &OathError) -> StatusCode {
    match e {
        OathError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        OathError::Auth(_) => StatusCode::UNAUTHORIZED,
        OathError::Storage(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if self.0.is_retryable() {
            error!(error = %self.0, "Request failed on storage");
        } else {
            debug!(error = %self.0, status = status.as_u16(), "Request rejected");
        }

        let body = Json(ErrorBody::new(self.0.kind(), self.0.to_string()));
        if self.0.is_retryable() {
            (status, [(header::RETRY_AFTER, "1")], body).into_response()
        } else {
            (status, body).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oathlink_core::StorageError;

    #[test]
    fn status_mapping() {
        assert_eq!(
            status_for(&OathError::validation("x")),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_for(&OathError::Auth("x".into())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_for(&StorageError::Query("x".into()).into()),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn storage_errors_carry_retry_after() {
        let resp = ApiError(StorageError::Open("gone".into()).into()).into_response();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(resp.headers().get(header::RETRY_AFTER).unwrap(), "1");

        let resp = ApiError(OathError::validation("bad")).into_response();
        assert!(resp.headers().get(header::RETRY_AFTER).is_none());
    }
}
