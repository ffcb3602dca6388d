use crate::application::error::ErrorReport;
use crate::application::properties::PropertyWriteError;
use crate::application::repos::RepoError;
use crate::cache::{BackendError, CacheError, ListingError};
use crate::domain::error::DomainError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorMessage,
}

pub mod codes {
    pub const BAD_REQUEST: &str = "bad_request";
    pub const NOT_FOUND: &str = "not_found";
    pub const INVALID_INPUT: &str = "invalid_input";
    pub const INTEGRITY: &str = "integrity_error";
    pub const DB_TIMEOUT: &str = "db_timeout";
    pub const REPO: &str = "repo_error";
    pub const CACHE_UNAVAILABLE: &str = "cache_unavailable";
    pub const CACHE_PROTOCOL: &str = "cache_protocol_error";
    pub const CACHE_CODEC: &str = "cache_codec_error";
    pub const INVALIDATION: &str = "invalidation_failed";
}

#[derive(Debug, Serialize)]
pub struct ApiErrorMessage {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: &'static str,
    hint: Option<String>,
}

impl ApiError {
    pub fn new(
        status: StatusCode,
        code: &'static str,
        message: &'static str,
        hint: Option<String>,
    ) -> Self {
        Self {
            status,
            code,
            message,
            hint,
        }
    }

    pub fn bad_request(message: &'static str, hint: Option<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, codes::BAD_REQUEST, message, hint)
    }

    pub fn not_found(message: &'static str) -> Self {
        Self::new(StatusCode::NOT_FOUND, codes::NOT_FOUND, message, None)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.code
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let hint = self.hint.clone();
        let body = ApiErrorBody {
            error: ApiErrorMessage {
                code: self.code.to_string(),
                message: self.message.to_string(),
                hint: self.hint,
            },
        };
        let mut response = (self.status, Json(body)).into_response();
        ErrorReport::from_message(
            "infra::http::api",
            self.status,
            format!("{}: {}", self.code, hint.as_deref().unwrap_or(self.message)),
        )
        .attach(&mut response);
        response
    }
}

impl From<RepoError> for ApiError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound => Self::not_found("Property not found"),
            RepoError::InvalidInput { message } => Self::new(
                StatusCode::BAD_REQUEST,
                codes::INVALID_INPUT,
                "Invalid input",
                Some(message),
            ),
            RepoError::Integrity { message } => Self::new(
                StatusCode::CONFLICT,
                codes::INTEGRITY,
                "Integrity constraint violated",
                Some(message),
            ),
            RepoError::Timeout => Self::new(
                StatusCode::SERVICE_UNAVAILABLE,
                codes::DB_TIMEOUT,
                "Database timeout",
                None,
            ),
            RepoError::Persistence(message) => Self::new(
                StatusCode::SERVICE_UNAVAILABLE,
                codes::REPO,
                "Property store unavailable",
                Some(message),
            ),
        }
    }
}

impl From<BackendError> for ApiError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Unavailable { message } => Self::new(
                StatusCode::SERVICE_UNAVAILABLE,
                codes::CACHE_UNAVAILABLE,
                "Cache backend unavailable",
                Some(message),
            ),
            BackendError::Protocol { message } => Self::new(
                StatusCode::BAD_GATEWAY,
                codes::CACHE_PROTOCOL,
                "Cache backend returned an unexpected reply",
                Some(message),
            ),
        }
    }
}

impl From<CacheError> for ApiError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::Backend(err) => err.into(),
            CacheError::Codec(err) => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                codes::CACHE_CODEC,
                "Cached listing could not be decoded",
                Some(err.to_string()),
            ),
        }
    }
}

impl From<ListingError> for ApiError {
    fn from(err: ListingError) -> Self {
        match err {
            ListingError::Store(err) => err.into(),
            ListingError::Cache(err) => err.into(),
        }
    }
}

impl From<PropertyWriteError> for ApiError {
    fn from(err: PropertyWriteError) -> Self {
        match err {
            PropertyWriteError::Validation(DomainError::Validation { field, message }) => {
                Self::new(
                    StatusCode::BAD_REQUEST,
                    codes::INVALID_INPUT,
                    "Invalid property",
                    Some(format!("{field}: {message}")),
                )
            }
            PropertyWriteError::Validation(DomainError::NotFound { .. }) => {
                Self::not_found("Property not found")
            }
            PropertyWriteError::Repo(err) => err.into(),
            PropertyWriteError::Notification(err) => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                codes::INVALIDATION,
                "Change saved but the cached listing could not be invalidated",
                Some(err.to_string()),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_backend_is_service_unavailable() {
        let err = ApiError::from(ListingError::from(BackendError::unavailable("down")));
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.code(), codes::CACHE_UNAVAILABLE);
    }

    #[test]
    fn store_timeout_is_service_unavailable() {
        let err = ApiError::from(ListingError::Store(RepoError::Timeout));
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.code(), codes::DB_TIMEOUT);
    }

    #[test]
    fn validation_failure_names_the_field() {
        let err = ApiError::from(PropertyWriteError::Validation(DomainError::validation(
            "title",
            "must not be empty",
        )));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.hint.as_deref(), Some("title: must not be empty"));
    }

    #[test]
    fn failed_invalidation_is_a_server_error() {
        let err = ApiError::from(PropertyWriteError::Notification(CacheError::Backend(
            BackendError::unavailable("down"),
        )));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.code(), codes::INVALIDATION);
    }
}
