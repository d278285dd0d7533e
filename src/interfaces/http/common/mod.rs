//! Shared HTTP types: response envelope, pagination and error mapping

mod validated_json;

pub use validated_json::{ValidatedJson, ValidatedJsonRejection};

use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::error;
use utoipa::ToSchema;

use crate::domain::DomainError;
use crate::shared::ParseError;

/// Standard API response envelope
///
/// Success: `{"success": true, "message": "...", "data": {...}}`,
/// failure: `{"success": false, "error": "..."}`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: None,
            data: None,
            error: Some(message.into()),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl ApiResponse<()> {
    /// Success without payload
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: None,
            error: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
}

impl<T> PaginatedResponse<T> {
    pub fn new(items: Vec<T>, total: u64, page: u32, limit: u32, total_pages: u32) -> Self {
        Self {
            items,
            total,
            page,
            limit,
            total_pages,
        }
    }
}

/// Error half of every handler result
pub type ApiError = (StatusCode, Json<ApiResponse<()>>);

pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

pub fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(ApiResponse::error(message)))
}

pub fn status_for(e: &DomainError) -> StatusCode {
    match e {
        DomainError::InvalidInterval(_)
        | DomainError::SlotUnavailable(_)
        | DomainError::AlreadyPaid(_)
        | DomainError::InvalidTransition { .. }
        | DomainError::Validation(_) => StatusCode::BAD_REQUEST,

        DomainError::SlotNotFound(_)
        | DomainError::BookingNotFound(_)
        | DomainError::UserNotFound(_)
        | DomainError::NoSlotsAtLocation { .. }
        | DomainError::NoSlotsOfType { .. } => StatusCode::NOT_FOUND,

        DomainError::SlotConflict(_)
        | DomainError::AllSlotsBooked { .. }
        | DomainError::SlotInUse(_)
        | DomainError::Conflict(_) => StatusCode::CONFLICT,

        DomainError::Forbidden(_) => StatusCode::FORBIDDEN,
        DomainError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        DomainError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Client-facing text; details of unexpected errors stay in the logs
fn public_message(e: &DomainError) -> String {
    match e {
        DomainError::Unexpected(_) => "Internal server error".to_string(),
        DomainError::InvalidInterval(msg)
        | DomainError::Validation(msg)
        | DomainError::Conflict(msg)
        | DomainError::Unauthorized(msg)
        | DomainError::Forbidden(msg) => msg.clone(),
        other => other.to_string(),
    }
}

impl From<DomainError> for (StatusCode, Json<ApiResponse<()>>) {
    fn from(e: DomainError) -> Self {
        let status = status_for(&e);
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %e, "Request failed");
        }
        api_error(status, public_message(&e))
    }
}

impl From<ParseError> for (StatusCode, Json<ApiResponse<()>>) {
    fn from(e: ParseError) -> Self {
        api_error(StatusCode::BAD_REQUEST, e.to_string())
    }
}
