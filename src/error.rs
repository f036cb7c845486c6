use actix_web::http::{StatusCode, header};
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sea_orm::DbErr),

    #[error("Cache error: {0}")]
    CacheError(#[from] redis::RedisError),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Auth error: {0}")]
    AuthError(String),

    #[error("Too many SMS requests, retry after {retry_after} seconds")]
    RateLimitExceeded { retry_after: i64 },

    #[error("Verification session not found or expired")]
    SessionNotFound,

    #[error("Invalid verification code")]
    InvalidCode,

    #[error("SMS dispatch failed: {0}")]
    DispatchFailed(String),

    #[error("Malformed token")]
    TokenMalformed,

    #[error("Unexpected token type: expected {expected}")]
    TokenWrongType { expected: &'static str },

    #[error("Token expired")]
    TokenExpired,

    #[error("User is inactive")]
    InactiveUser,

    #[error("Not found: {message}")]
    NotFound { code: &'static str, message: String },

    #[error("Conflict: {message}")]
    Conflict { code: &'static str, message: String },

    #[error("Forbidden: {message}")]
    Forbidden { code: &'static str, message: String },

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    #[error("JSON serialization/deserialization error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),
}

impl AppError {
    /// Stable machine-readable code returned in the error body.
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::AuthError(_) => "AUTH_ERROR",
            AppError::RateLimitExceeded { .. } => "RATE_LIMIT_EXCEEDED",
            AppError::SessionNotFound => "SESSION_NOT_FOUND",
            AppError::InvalidCode => "INVALID_VERIFICATION_CODE",
            AppError::DispatchFailed(_) => "SMS_SEND_FAILED",
            AppError::TokenMalformed => "INVALID_TOKEN",
            AppError::TokenWrongType { .. } => "INVALID_TOKEN_TYPE",
            AppError::TokenExpired => "TOKEN_EXPIRED",
            AppError::InactiveUser => "USER_INACTIVE",
            AppError::NotFound { code, .. }
            | AppError::Conflict { code, .. }
            | AppError::Forbidden { code, .. } => *code,
            AppError::DatabaseError(_) => "DATABASE_ERROR",
            AppError::CacheError(_) => "CACHE_ERROR",
            _ => "INTERNAL_ERROR",
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) | AppError::SessionNotFound | AppError::InvalidCode => {
                StatusCode::BAD_REQUEST
            }
            AppError::AuthError(_)
            | AppError::TokenMalformed
            | AppError::TokenWrongType { .. }
            | AppError::TokenExpired => StatusCode::UNAUTHORIZED,
            AppError::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::InactiveUser | AppError::Forbidden { .. } => StatusCode::FORBIDDEN,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Conflict { .. } => StatusCode::CONFLICT,
            AppError::DispatchFailed(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status_code = self.status_code();
        let message = match self {
            AppError::DatabaseError(err) => {
                log::error!("Database error: {err}");
                "Database error".to_string()
            }
            AppError::CacheError(err) => {
                log::error!("Cache error: {err}");
                "Cache error".to_string()
            }
            AppError::DispatchFailed(msg) => {
                log::error!("SMS dispatch error: {msg}");
                "Failed to send verification SMS".to_string()
            }
            e if status_code.is_server_error() => {
                log::error!("Internal error: {e}");
                "Internal server error".to_string()
            }
            e => {
                log::warn!("Request rejected: {e}");
                match e {
                    AppError::ValidationError(message)
                    | AppError::AuthError(message)
                    | AppError::NotFound { message, .. }
                    | AppError::Conflict { message, .. }
                    | AppError::Forbidden { message, .. } => message.clone(),
                    other => other.to_string(),
                }
            }
        };

        let mut builder = HttpResponse::build(status_code);
        match self {
            AppError::RateLimitExceeded { retry_after } => {
                builder.insert_header((header::RETRY_AFTER, retry_after.to_string()));
            }
            _ if status_code == StatusCode::UNAUTHORIZED => {
                builder.insert_header((header::WWW_AUTHENTICATE, "Bearer"));
            }
            _ => {}
        }

        builder.json(json!({
            "success": false,
            "error": {
                "code": self.error_code(),
                "message": message
            }
        }))
    }
}
