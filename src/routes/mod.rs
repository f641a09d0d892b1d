/**
 * Routes Module
 * Public site API, admin API, auth, uploads and health
 */
pub mod admin;
pub mod auth;
pub mod health;
pub mod public;
pub mod upload;

use axum::{http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use crate::backend::BackendError;
use crate::content::{ContentError, Notification};

/// Error body shared by every route.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn api_error(status: StatusCode, error: impl Into<String>, message: Option<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
            message,
        }),
    )
}

fn backend_status(error: &BackendError) -> StatusCode {
    match error {
        BackendError::NotFound { .. } => StatusCode::NOT_FOUND,
        BackendError::ForeignKey { .. } | BackendError::UniqueViolation { .. } => StatusCode::CONFLICT,
        BackendError::NotNull { .. } | BackendError::UnknownColumn { .. } | BackendError::InvalidRow(_) => {
            StatusCode::BAD_REQUEST
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// `error` carries the user-facing notification text; `message` the
/// detail for client-side mistakes.
pub fn content_error(error: ContentError) -> ApiError {
    let notification: Notification = error.notification();
    let (status, message) = match &error {
        ContentError::Validation(_) | ContentError::UnsupportedFlag { .. } => (StatusCode::BAD_REQUEST, None),
        ContentError::Fetch { .. } => (StatusCode::SERVICE_UNAVAILABLE, None),
        other => match other.backend() {
            Some(source) => {
                let status = backend_status(source);
                let detail = (status != StatusCode::INTERNAL_SERVER_ERROR).then(|| source.to_string());
                (status, detail)
            }
            None => (StatusCode::INTERNAL_SERVER_ERROR, None),
        },
    };
    api_error(status, notification.description, message)
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::Entity;
    use crate::form::ValidationError;

    #[test]
    fn test_content_error_statuses() {
        let (status, body) = content_error(ContentError::Validation(ValidationError::MissingFields(vec!["title"])));
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error, "Please fill in required fields");

        let (status, body) = content_error(ContentError::Delete {
            entity: Entity::Categories,
            source: BackendError::ForeignKey {
                table: "projects",
                column: "category_id",
            },
        });
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body.error, "Failed to delete category");
        assert!(body.message.is_some());

        let (status, _) = content_error(ContentError::Update {
            entity: Entity::Projects,
            source: BackendError::NotFound {
                table: "projects",
                id: "x".to_string(),
            },
        });
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = content_error(ContentError::Create {
            entity: Entity::Projects,
            source: BackendError::Storage("boom".to_string()),
        });
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.message.is_none());
    }
}
