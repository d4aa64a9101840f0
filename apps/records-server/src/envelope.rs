//! Response envelopes and the HTTP error taxonomy.
//!
//! Two error shapes exist side by side: `{"error": true, "message": ..}` for
//! every failure except 401, which keeps the older
//! `{"error": "Unauthorized", "message": ..}` shape that existing clients match on.

use std::fmt::Display;

use axum::http::{StatusCode, header::CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use record_store::StoreError;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

pub const UNAUTHORIZED_MESSAGE: &str = "Invalid or missing credentials";

#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
}

impl<T: Serialize> Envelope<T> {
    pub fn data(data: T) -> Self {
        Self {
            success: true,
            count: None,
            message: None,
            data: Some(data),
        }
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl Envelope<()> {
    pub fn message_only(message: impl Into<String>) -> Self {
        Self {
            success: true,
            count: None,
            message: Some(message.into()),
            data: None,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum ErrorTag {
    Flag(bool),
    Label(&'static str),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: ErrorTag,
    message: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid or missing credentials")]
    Unauthenticated,

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Server error: {0}")]
    ServerError(String),
}

impl ApiError {
    pub fn record_not_found(id: impl Display) -> Self {
        ApiError::NotFound(format!("Record with ID {id} not found"))
    }

    pub fn invalid_id() -> Self {
        ApiError::BadRequest("Invalid record ID".to_string())
    }

    pub fn invalid_json() -> Self {
        ApiError::BadRequest("Invalid JSON data".to_string())
    }

    pub fn invalid_body(reason: impl Display) -> Self {
        ApiError::BadRequest(format!("Invalid request body: {reason}"))
    }

    pub fn endpoint_not_found() -> Self {
        ApiError::NotFound("Endpoint not found".to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::ServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => ApiError::record_not_found(id),
            StoreError::InvalidPayload(_) => ApiError::ServerError(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let error = match self {
            ApiError::Unauthenticated => ErrorTag::Label("Unauthorized"),
            _ => ErrorTag::Flag(true),
        };
        let body = ErrorBody {
            error,
            message: self.to_string(),
        };
        json_response(self.status(), &body)
    }
}

/// Pretty-printed JSON body with the given status.
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response {
    match serde_json::to_string_pretty(body) {
        Ok(text) => (status, [(CONTENT_TYPE, "application/json")], text).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to serialize response body");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(CONTENT_TYPE, "application/json")],
                r#"{"error": true, "message": "Server error"}"#,
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    #[test]
    fn success_envelope_omits_absent_parts() {
        let listed = serde_json::to_value(Envelope::data(vec![1, 2]).with_count(2)).unwrap();
        assert_eq!(listed, json!({"success": true, "count": 2, "data": [1, 2]}));

        let deleted = serde_json::to_value(Envelope::message_only("Record 1 deleted successfully"))
            .unwrap();
        assert_eq!(
            deleted,
            json!({"success": true, "message": "Record 1 deleted successfully"})
        );
    }

    #[test]
    fn error_shapes_differ_only_for_unauthorized() {
        let generic = ErrorBody {
            error: ErrorTag::Flag(true),
            message: ApiError::record_not_found(999).to_string(),
        };
        assert_eq!(
            serde_json::to_value(generic).unwrap(),
            json!({"error": true, "message": "Record with ID 999 not found"})
        );

        let unauthorized = ErrorBody {
            error: ErrorTag::Label("Unauthorized"),
            message: ApiError::Unauthenticated.to_string(),
        };
        let value: Value = serde_json::to_value(unauthorized).unwrap();
        assert_eq!(value["error"], json!("Unauthorized"));
        assert_eq!(value["message"], json!(UNAUTHORIZED_MESSAGE));
    }

    #[test]
    fn store_errors_map_to_statuses() {
        assert_eq!(
            ApiError::from(StoreError::NotFound(4)).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(StoreError::InvalidPayload("array")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
