use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::types::ApiErrorResponse;

/// Application error codes following the pattern E{component}{sequence}.
///
/// Ranges:
/// - E0xxx: Shared/infrastructure errors
/// - E1xxx: Intake / webhook errors
/// - E2xxx: Orchestrator errors
/// - E3xxx: Pipeline task errors (audio, ASR, LLM)
/// - E4xxx: Persistence / data-integrity errors
/// - E5xxx: Notification dispatcher errors
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

    // Intake (E1xxx)
    InvalidSignature,
    UnknownEventType,
    DuplicateRecording,
    OrphanRecording,

    // Orchestrator (E2xxx)
    WorkflowNotFound,
    TaskNotFound,
    TaskTimedOut,
    TaskRetriesExhausted,
    WorkflowAlreadyRunning,
    WorkflowCancelled,

    // Pipeline (E3xxx)
    EmptyMix,
    MalformedContainer,
    AsrPermanentFailure,
    AsrTransientFailure,
    LlmPermanentFailure,
    LlmTransientFailure,

    // Persistence (E4xxx)
    TranscriptNotFound,
    RecordingNotFound,
    RoomNotFound,
    DataIntegrityViolation,

    // Notification (E5xxx)
    WebhookDeliveryFailed,
    ChatPostFailed,
}

impl ErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            Self::InternalError => "E0001",
            Self::ValidationError => "E0002",
            Self::NotFound => "E0003",
            Self::Unauthorized => "E0004",
            Self::Forbidden => "E0005",
            Self::RateLimited => "E0006",
            Self::ServiceUnavailable => "E0007",
            Self::BadRequest => "E0008",

            Self::InvalidSignature => "E1001",
            Self::UnknownEventType => "E1002",
            Self::DuplicateRecording => "E1003",
            Self::OrphanRecording => "E1004",

            Self::WorkflowNotFound => "E2001",
            Self::TaskNotFound => "E2002",
            Self::TaskTimedOut => "E2003",
            Self::TaskRetriesExhausted => "E2004",
            Self::WorkflowAlreadyRunning => "E2005",
            Self::WorkflowCancelled => "E2006",

            Self::EmptyMix => "E3001",
            Self::MalformedContainer => "E3002",
            Self::AsrPermanentFailure => "E3003",
            Self::AsrTransientFailure => "E3004",
            Self::LlmPermanentFailure => "E3005",
            Self::LlmTransientFailure => "E3006",

            Self::TranscriptNotFound => "E4001",
            Self::RecordingNotFound => "E4002",
            Self::RoomNotFound => "E4003",
            Self::DataIntegrityViolation => "E4004",

            Self::WebhookDeliveryFailed => "E5001",
            Self::ChatPostFailed => "E5002",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InternalError | Self::ServiceUnavailable => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ValidationError | Self::BadRequest | Self::UnknownEventType => {
                StatusCode::BAD_REQUEST
            }
            Self::NotFound
            | Self::TranscriptNotFound
            | Self::RecordingNotFound
            | Self::RoomNotFound
            | Self::WorkflowNotFound
            | Self::TaskNotFound => StatusCode::NOT_FOUND,
            Self::Unauthorized | Self::InvalidSignature => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::DuplicateRecording | Self::WorkflowAlreadyRunning => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
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

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Known { code, .. } => *code,
            Self::Internal(_) => ErrorCode::InternalError,
            Self::Database(diesel::result::Error::NotFound) => ErrorCode::NotFound,
            Self::Database(_) => ErrorCode::InternalError,
        }
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
        };

        (status, Json(error_response)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
