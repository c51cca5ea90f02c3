use axum::{
    response::{IntoResponse, Response, Redirect},
    http::StatusCode,
};
use crate::errors::{AppError, StoreError};

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Identity(msg) => {
                Redirect::to(&format!("/register?error={}", urlencoding::encode(&msg)))
                    .into_response()
            }

            AppError::Store(StoreError::UnknownChallenge(index)) => (
                StatusCode::BAD_REQUEST,
                format!("Unknown challenge index {}", index)
            ).into_response(),

            AppError::Store(e) => {
                tracing::error!("Progress store failure: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Could not save your progress, please retry"
                ).into_response()
            }

            AppError::Database(e) => {
                tracing::error!("Database failure: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Database error: {}", e)
                ).into_response()
            }

            AppError::Template(e) => {
                tracing::error!("Template failure: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Template error: {}", e)
                ).into_response()
            }
        }
    }
}
