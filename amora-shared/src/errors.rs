use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::types::ApiErrorResponse;

/// Application error codes following the pattern E{service}{sequence}
///
/// Ranges:
/// - E0xxx: Shared/infrastructure errors
/// - E1xxx: Auth errors
/// - E2xxx: Media errors (photos, voice intros)
/// - E3xxx: Report/moderation errors
/// - E4xxx: Verification errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Shared (E0xxx)
    InternalError,
    ValidationError,
    NotFound,
    Unauthorized,
    Forbidden,
    RateLimited,
    ServiceUnavailable,
    BadRequest,
    PayloadTooLarge,

    // Auth (E1xxx)
    TokenExpired,
    TokenInvalid,
    UserBanned,

    // Media (E2xxx)
    PhotoNotFound,
    PhotoUploadFailed,
    InvalidImageFormat,
    VoiceClipNotFound,
    VoiceUploadFailed,
    InvalidAudioFormat,
    AudioTooShort,
    AudioTooLong,
    MediaAccessDenied,

    // Reports/moderation (E3xxx)
    ReportNotFound,
    ReportAlreadyReviewed,
    CannotReportSelf,
    DuplicateReport,
    InvalidReportReason,

    // Verification (E4xxx)
    NoProfilePhoto,
    VerificationRateLimited,
    VerificationUnavailable,
    AttemptNotFound,
}

impl ErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            // Shared
            Self::InternalError => "E0001",
            Self::ValidationError => "E0002",
            Self::NotFound => "E0003",
            Self::Unauthorized => "E0004",
            Self::Forbidden => "E0005",
            Self::RateLimited => "E0006",
            Self::ServiceUnavailable => "E0007",
            Self::BadRequest => "E0008",
            Self::PayloadTooLarge => "E0009",

            // Auth
            Self::TokenExpired => "E1001",
            Self::TokenInvalid => "E1002",
            Self::UserBanned => "E1003",

            // Media
            Self::PhotoNotFound => "E2001",
            Self::PhotoUploadFailed => "E2002",
            Self::InvalidImageFormat => "E2003",
            Self::VoiceClipNotFound => "E2004",
            Self::VoiceUploadFailed => "E2005",
            Self::InvalidAudioFormat => "E2006",
            Self::AudioTooShort => "E2007",
            Self::AudioTooLong => "E2008",
            Self::MediaAccessDenied => "E2009",

            // Reports/moderation
            Self::ReportNotFound => "E3001",
            Self::ReportAlreadyReviewed => "E3002",
            Self::CannotReportSelf => "E3003",
            Self::DuplicateReport => "E3004",
            Self::InvalidReportReason => "E3005",

            // Verification
            Self::NoProfilePhoto => "E4001",
            Self::VerificationRateLimited => "E4002",
            Self::VerificationUnavailable => "E4003",
            Self::AttemptNotFound => "E4004",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ServiceUnavailable | Self::VerificationUnavailable => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            Self::ValidationError | Self::BadRequest | Self::InvalidImageFormat
            | Self::InvalidAudioFormat | Self::AudioTooShort | Self::AudioTooLong
            | Self::InvalidReportReason => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::NotFound | Self::PhotoNotFound | Self::VoiceClipNotFound
            | Self::ReportNotFound | Self::AttemptNotFound => StatusCode::NOT_FOUND,
            Self::Unauthorized | Self::TokenExpired | Self::TokenInvalid => {
                StatusCode::UNAUTHORIZED
            }
            Self::Forbidden | Self::UserBanned | Self::MediaAccessDenied
            | Self::CannotReportSelf | Self::NoProfilePhoto => StatusCode::FORBIDDEN,
            Self::RateLimited | Self::VerificationRateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::DuplicateReport | Self::ReportAlreadyReviewed => StatusCode::CONFLICT,
            Self::PhotoUploadFailed | Self::VoiceUploadFailed => StatusCode::BAD_REQUEST,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{message}")]
    Known {
        code: ErrorCode,
        message: String,
        details: Option<serde_json::Value>,
    },

    #[error("internal server error")]
    Internal(#[from] anyhow::Error),

    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

impl AppError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Known {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(code: ErrorCode, message: impl Into<String>, details: serde_json::Value) -> Self {
        Self::Known {
            code,
            message: message.into(),
            details: Some(details),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_response) = match &self {
            AppError::Known { code, message, details } => {
                let status = code.status_code();
                let mut resp = ApiErrorResponse::new(code.code(), message);
                if let Some(d) = details {
                    resp = resp.with_details(d.clone());
                }
                (status, resp)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiErrorResponse::new("E0001", "internal server error"),
                )
            }
            AppError::Database(err) => {
                tracing::error!(error = %err, "database error");
                match err {
                    diesel::result::Error::NotFound => (
                        StatusCode::NOT_FOUND,
                        ApiErrorResponse::new("E0003", "resource not found"),
                    ),
                    _ => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        ApiErrorResponse::new("E0001", "database error"),
                    ),
                }
            }
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ApiErrorResponse::new("E0002", msg),
            ),
        };

        (status, Json(error_response)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
