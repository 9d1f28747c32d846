use std::sync::atomic::{AtomicBool, Ordering};

use actix_web::{
    http::{header::ContentType, StatusCode},
    HttpResponse, ResponseError,
};
use log::error;
use serde_json::json;
use thiserror::Error;

static EXPOSE_DETAILS: AtomicBool = AtomicBool::new(false);

/// Include the underlying error text in 5xx bodies. Development only.
pub fn expose_internal_details(expose: bool) {
    EXPOSE_DETAILS.store(expose, Ordering::Relaxed);
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("You do not have permission to perform this action")]
    Forbidden,

    #[error("{0}")]
    NotFound(String),

    #[error("You have already created a review on this tour. You can only create one review per tour.")]
    DuplicateReview,

    #[error("Duplicate field value: {0}. Please use another value.")]
    Conflict(String),

    #[error("too many requests from this IP, try again in an hour")]
    TooManyRequests,

    #[error("Invalid token. Please log in again")]
    InvalidToken,

    #[error("Your token has expired. Please log in again")]
    TokenExpired,

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Payment processor error: {0}")]
    Payment(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        AppError::BadRequest(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        AppError::Unauthorized(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        AppError::NotFound(msg.into())
    }

    /// Expected failures whose message is safe to show to the client.
    pub fn is_operational(&self) -> bool {
        !matches!(
            self,
            AppError::Database(_) | AppError::Payment(_) | AppError::Internal(_)
        )
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::Internal(format!("JSON: {e}"))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        AppError::Payment(e.to_string())
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) | AppError::DuplicateReview | AppError::Conflict(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Unauthorized(_) | AppError::InvalidToken | AppError::TokenExpired => {
                StatusCode::UNAUTHORIZED
            }
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            AppError::Database(_) | AppError::Payment(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let kind = if status.is_client_error() { "fail" } else { "error" };

        let body = if self.is_operational() {
            json!({ "status": kind, "message": self.to_string() })
        } else {
            error!("[ERROR] {self}");
            if EXPOSE_DETAILS.load(Ordering::Relaxed) {
                json!({
                    "status": kind,
                    "message": "Something went very wrong",
                    "detail": self.to_string(),
                })
            } else {
                json!({ "status": kind, "message": "Something went very wrong" })
            }
        };

        HttpResponse::build(status)
            .insert_header(ContentType::json())
            .body(body.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[test]
    fn operational_errors_keep_their_status() {
        assert_eq!(AppError::DuplicateReview.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::TokenExpired.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::TooManyRequests.status_code(), StatusCode::TOO_MANY_REQUESTS);
        assert!(AppError::not_found("x").is_operational());
        assert!(!AppError::Internal("boom".into()).is_operational());
    }

    #[actix_web::test]
    async fn programming_errors_hide_their_message() {
        expose_internal_details(false);
        let response = AppError::Internal("secret path /etc".into()).error_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = to_bytes(response.into_body()).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["status"], "error");
        assert_eq!(value["message"], "Something went very wrong");
        assert!(value.get("detail").is_none());
    }

    #[actix_web::test]
    async fn client_errors_are_marked_fail() {
        let response = AppError::bad_request("please provide email and password").error_response();
        let body = to_bytes(response.into_body()).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["status"], "fail");
        assert_eq!(value["message"], "please provide email and password");
    }
}
