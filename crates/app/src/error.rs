use axum::{
    Json,
    extract::{
        multipart::MultipartError,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use services::{AuthoringError, HistoryServiceError};

use crate::extract::ExtractError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            AppError::Validation(msg) | AppError::NotFound(msg) => msg,
            AppError::Internal(details) => {
                tracing::error!(%details, "request failed");
                "An internal server error occurred".to_owned()
            }
        };

        let body = Json(json!({
            "success": false,
            "error": message,
        }));

        (status, body).into_response()
    }
}

impl From<AuthoringError> for AppError {
    fn from(err: AuthoringError) -> Self {
        if err.is_validation() {
            AppError::Validation(err.to_string())
        } else if err.is_not_found() {
            AppError::NotFound(err.to_string())
        } else {
            AppError::Internal(err.to_string())
        }
    }
}

impl From<HistoryServiceError> for AppError {
    fn from(err: HistoryServiceError) -> Self {
        match err {
            HistoryServiceError::History(_) => AppError::Validation(err.to_string()),
            HistoryServiceError::BatchNotFound(_) => AppError::NotFound(err.to_string()),
            _ => AppError::Internal(err.to_string()),
        }
    }
}

impl From<ExtractError> for AppError {
    fn from(err: ExtractError) -> Self {
        match err {
            ExtractError::NotPdf | ExtractError::Unreadable(_) => {
                AppError::Validation(err.to_string())
            }
            _ => AppError::Internal(err.to_string()),
        }
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        AppError::Validation(err.body_text())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{BatchId, HistoryError};
    use storage::repository::StorageError;

    #[test]
    fn service_errors_map_to_status_codes() {
        assert_eq!(
            AppError::from(AuthoringError::NoQuestions).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(AuthoringError::BatchNotFound(BatchId::new(3))).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::from(AuthoringError::Storage(StorageError::Connection("gone".into()))).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::from(HistoryServiceError::History(HistoryError::EmptyTitle)).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(ExtractError::Crashed).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn validation_message_is_kept() {
        let err = AppError::from(AuthoringError::NoBatchIds);
        assert_eq!(err.to_string(), "at least one batch id is required");
    }
}
