use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;

use super::error::ApiError;

/// Success envelope: `{"success": true, "message": ..., "data": ...}`
#[derive(Debug)]
pub struct ApiResponse<T: Serialize> {
    pub message: String,
    pub data: T,
    pub status_code: StatusCode,
}

#[derive(Serialize)]
struct Envelope<'a, T: Serialize> {
    success: bool,
    message: &'a str,
    data: &'a T,
}

impl<T: Serialize> ApiResponse<T> {
    /// 200 OK
    pub fn success(message: impl Into<String>, data: T) -> Self {
        Self {
            message: message.into(),
            data,
            status_code: StatusCode::OK,
        }
    }

    /// 201 Created
    pub fn created(message: impl Into<String>, data: T) -> Self {
        Self {
            message: message.into(),
            data,
            status_code: StatusCode::CREATED,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let envelope = Envelope {
            success: true,
            message: &self.message,
            data: &self.data,
        };

        match serde_json::to_value(&envelope) {
            Ok(value) => (self.status_code, Json(value)).into_response(),
            Err(e) => {
                tracing::error!("Failed to serialize response data: {}", e);
                ApiError::internal("Failed to serialize response data")
                    .with_detail(e.to_string())
                    .into_response()
            }
        }
    }
}

pub type ApiResult<T> = Result<ApiResponse<T>, ApiError>;
