use super::metrics::record_data_error;
use crate::data_error::DataError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found")]
    NotFound,

    #[error("Forbidden")]
    Forbidden,

    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    /// For validation failures of request bodies.
    pub fn invalid(err: anyhow::Error) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    kind: Option<&'static str>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, message) = match &self {
            ApiError::NotFound => (StatusCode::NOT_FOUND, None, self.to_string()),
            ApiError::Forbidden => (StatusCode::FORBIDDEN, None, self.to_string()),
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, None, message.clone()),
            ApiError::Data(err) => {
                warn!("Refusing malformed record: {}", err);
                record_data_error(err);
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    Some(err.kind()),
                    err.to_string(),
                )
            }
            ApiError::Internal(err) => {
                error!("Internal error: {:#}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    None,
                    "Internal Server Error".to_string(),
                )
            }
        };
        (
            status,
            Json(ErrorBody {
                error: message,
                kind,
            }),
        )
            .into_response()
    }
}
