use actix_web::{HttpResponse, ResponseError};
use crate::models::ApiResponse;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sea_orm::DbErr),

    #[error("Format error: {0}")]
    FormatError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("State error: {0}")]
    StateError(String),

    #[error("Upstream push error: {0}")]
    UpstreamPush(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Unsupported: {0}")]
    Unsupported(String),

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("HTTP request error: {0}")]
    ReqwestError(#[from] reqwest::Error),

    #[error("JSON serialization/deserialization error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),
}

impl AppError {
    /// 机器可读的错误码，HTTP 响应与同步结果共用
    pub fn code(&self) -> &'static str {
        match self {
            AppError::DatabaseError(_) => "DATABASE_ERROR",
            AppError::FormatError(_) => "FORMAT_ERROR",
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::StateError(_) => "STATE_ERROR",
            AppError::UpstreamPush(_) | AppError::ReqwestError(_) => "UPSTREAM_PUSH_ERROR",
            AppError::ConfigurationError(_) => "CONFIGURATION_ERROR",
            AppError::Unsupported(_) => "UNSUPPORTED",
            AppError::InternalError(_) | AppError::SerdeJsonError(_) => "INTERNAL_ERROR",
        }
    }

    /// 后台任务失败后是否值得重试；业务性错误重试也不会成功
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::DatabaseError(_)
                | AppError::UpstreamPush(_)
                | AppError::ReqwestError(_)
                | AppError::InternalError(_)
        )
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        use actix_web::http::StatusCode;

        let (status_code, message) = match self {
            AppError::FormatError(msg) | AppError::ValidationError(msg) => {
                log::warn!("Rejected request: {self}");
                (StatusCode::BAD_REQUEST, msg.clone())
            }
            AppError::Unsupported(msg) => {
                log::warn!("Unsupported request: {msg}");
                (StatusCode::BAD_REQUEST, msg.clone())
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::StateError(msg) => {
                log::warn!("State error: {msg}");
                (StatusCode::CONFLICT, msg.clone())
            }
            AppError::ConfigurationError(msg) => {
                log::warn!("Configuration error: {msg}");
                (StatusCode::UNPROCESSABLE_ENTITY, msg.clone())
            }
            AppError::UpstreamPush(msg) => {
                log::error!("Upstream push error: {msg}");
                (StatusCode::BAD_GATEWAY, msg.clone())
            }
            AppError::ReqwestError(err) => {
                log::error!("Upstream request error: {err}");
                (StatusCode::BAD_GATEWAY, "Upstream request failed".to_string())
            }
            AppError::DatabaseError(err) => {
                log::error!("Database error: {err}");
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error".to_string())
            }
            _ => {
                log::error!("Internal error: {self}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        HttpResponse::build(status_code).json(ApiResponse::error(self.code(), message))
    }
}
