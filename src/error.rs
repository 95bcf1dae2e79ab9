//! 统一的 API 错误类型与 JSON 响应转换。

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json as JsonResponse, Response};
use serde_json::json;
use tracing::error;

pub const CAPACITY_MESSAGE: &str = "Only two PDFs allowed: pdf_a and pdf_b.";
const UPLOAD_FAILED_MESSAGE: &str = "Upload failed";
const READ_FILES_MESSAGE: &str = "Could not read files";

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Capacity,
    Internal(String),
    Analysis(String),
    ReadDir(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                JsonResponse(json!({ "error": msg })),
            )
                .into_response(),
            ApiError::Capacity => (
                StatusCode::BAD_REQUEST,
                JsonResponse(json!({ "error": CAPACITY_MESSAGE })),
            )
                .into_response(),
            ApiError::Internal(detail) => {
                error!(detail = %detail, "upload failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    JsonResponse(json!({ "error": UPLOAD_FAILED_MESSAGE })),
                )
                    .into_response()
            }
            ApiError::Analysis(detail) => {
                error!(detail = %detail, "analysis failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    JsonResponse(json!({ "error": UPLOAD_FAILED_MESSAGE })),
                )
                    .into_response()
            }
            ApiError::ReadDir(detail) => {
                error!(detail = %detail, "list files failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    JsonResponse(json!({ "error": READ_FILES_MESSAGE })),
                )
                    .into_response()
            }
        }
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        ApiError::Internal(err.to_string())
    }
}
