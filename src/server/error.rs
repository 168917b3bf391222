//! Error types for the server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::error::ForecastError;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Forecast(#[from] ForecastError),
}

impl ServerError {
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            ServerError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ServerError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ServerError::Internal(msg) => {
                tracing::error!(detail = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                )
            }
            ServerError::Forecast(e) => match e {
                ForecastError::NotTrained { .. } => (StatusCode::NOT_FOUND, e.to_string()),
                ForecastError::InvalidCategory { .. } | ForecastError::InvalidFeature { .. } => {
                    (StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
                }
                ForecastError::MalformedDataset(_)
                | ForecastError::InsufficientData { .. }
                | ForecastError::InvalidKey(_) => (StatusCode::BAD_REQUEST, e.to_string()),
                other => {
                    tracing::error!(kind = other.kind(), detail = %other, "Forecast failure");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "A storage or model error occurred. Check server logs for details."
                            .to_string(),
                    )
                }
            },
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        (status, Json(json!({ "error": message }))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn status(e: ForecastError) -> StatusCode {
        ServerError::from(e).status_and_message().0
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status(ForecastError::NotTrained {
                restaurant_id: "r1".into(),
                menu_item: "Idli".into()
            }),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status(ForecastError::InvalidCategory {
                field: "weather".into(),
                value: "snowy".into()
            }),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status(ForecastError::InsufficientData { required: 5, actual: 1 }),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status(ForecastError::Storage("disk full".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
