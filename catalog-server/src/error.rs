use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use catalog_db::StoreError;
use models::EditError;
use serde::Serialize;

#[derive(Debug)]
pub(crate) enum AppError {
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    StoreError(String),
    IoError(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    message: String,
    code: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message, code) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, "NOT_FOUND"),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, "BAD_REQUEST"),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg, "CONFLICT"),
            AppError::StoreError(msg) => {
                tracing::error!("store error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg, "STORE_ERROR")
            }
            AppError::IoError(msg) => {
                tracing::error!("io error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg, "IO_ERROR")
            }
        };

        (
            status,
            Json(ErrorResponse {
                message,
                code: code.to_string(),
            }),
        )
            .into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { .. } => AppError::NotFound(e.to_string()),
            StoreError::Conflict { .. } => AppError::Conflict(e.to_string()),
            StoreError::Backend(report) => AppError::StoreError(format!("{report:#}")),
        }
    }
}

impl From<EditError> for AppError {
    fn from(e: EditError) -> Self {
        match e {
            EditError::SongNotFound(_) | EditError::PlaylistNotFound(_) => {
                AppError::NotFound(e.to_string())
            }
            EditError::MissingField(_) => AppError::BadRequest(e.to_string()),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(format!("Invalid JSON body: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(format!("Invalid query: {}", rejection.body_text()))
    }
}

impl From<eyre::Report> for AppError {
    fn from(e: eyre::Report) -> Self {
        AppError::StoreError(format!("{e:#}"))
    }
}

impl AppError {
    /// Blob store failures are filesystem failures.
    pub(crate) fn blob(e: eyre::Report) -> Self {
        AppError::IoError(format!("{e:#}"))
    }
}

pub(crate) type Result<T> = std::result::Result<T, AppError>;
