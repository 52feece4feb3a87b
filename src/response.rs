use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// JSON body shared by every endpoint: `{ message, code, data? }`.
/// The HTTP status always mirrors `code`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub message: String,
    pub code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> (StatusCode, Json<Self>) {
        Self::with_status(StatusCode::OK, message, Some(data))
    }

    pub fn created(message: impl Into<String>, data: T) -> (StatusCode, Json<Self>) {
        Self::with_status(StatusCode::CREATED, message, Some(data))
    }

    fn with_status(
        status: StatusCode,
        message: impl Into<String>,
        data: Option<T>,
    ) -> (StatusCode, Json<Self>) {
        (
            status,
            Json(Self {
                message: message.into(),
                code: status.as_u16(),
                data,
            }),
        )
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> (StatusCode, Json<Self>) {
        Self::with_status(StatusCode::OK, message, None)
    }
}

/// Error half of the envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiResponse::<()> {
            message: self.message,
            code: self.status.as_u16(),
            data: None,
        };
        (self.status, Json(body)).into_response()
    }
}
