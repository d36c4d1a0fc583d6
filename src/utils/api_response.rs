use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Uniform envelope for every endpoint. Success responses carry
/// `message` and `data`; failures carry `error` (the field clients key
/// on) and optionally `details`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub status_code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> axum::response::Response {
        let status =
            StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a success response
    pub fn success(status: StatusCode, message: impl Into<String>, data: T) -> Self {
        ApiResponse {
            success: true,
            status_code: status.as_u16(),
            message: Some(message.into()),
            error: None,
            timestamp: Utc::now().to_rfc3339(),
            data: Some(data),
            details: None,
        }
    }

    /// Create an error response
    pub fn error(
        status: StatusCode,
        error: impl Into<String>,
        details: Option<serde_json::Value>,
    ) -> Self {
        ApiResponse {
            success: false,
            status_code: status.as_u16(),
            message: None,
            error: Some(error.into()),
            timestamp: Utc::now().to_rfc3339(),
            data: None,
            details,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_responses_expose_an_error_field() {
        let resp = ApiResponse::<()>::error(StatusCode::BAD_REQUEST, "start_date is required", None);
        let body = serde_json::to_value(&resp).unwrap();
        assert_eq!(body["error"], "start_date is required");
        assert_eq!(body["success"], false);
        assert_eq!(body["status_code"], 400);
        assert!(body.get("message").is_none());
        assert!(body.get("data").is_none());
        // Tests unwrap Result<_, ApiResponse<()>> all over the suite.
        assert!(format!("{:?}", resp).contains("start_date is required"));
    }

    #[test]
    fn success_responses_carry_message_and_data() {
        let resp = ApiResponse::success(StatusCode::OK, "Leave request retrieved", 42);
        let body = serde_json::to_value(&resp).unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "Leave request retrieved");
        assert_eq!(body["data"], 42);
        assert!(body.get("error").is_none());
    }
}
