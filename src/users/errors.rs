use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::images::services::UploadError;
use crate::users::password::HashingError;
use crate::users::repo::RepositoryError;

#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error("{0}")]
    Validation(&'static str),

    #[error("User not found.")]
    NotFound,

    #[error("User already exists.")]
    DuplicateKey,

    #[error("No file uploaded.")]
    MissingUpload,

    #[error("Invalid file type. Only JPEG, PNG, and GIF are allowed.")]
    InvalidFileType,

    #[error("{0:#}")]
    Repository(anyhow::Error),

    #[error(transparent)]
    Hashing(#[from] HashingError),

    #[error("{0:#}")]
    Storage(anyhow::Error),
}

pub type UserResult<T> = Result<T, UserError>;

impl From<RepositoryError> for UserError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::DuplicateKey(_) => UserError::DuplicateKey,
            RepositoryError::NotFound(_) => UserError::NotFound,
            RepositoryError::Backend(e) => UserError::Repository(e),
        }
    }
}

impl From<UploadError> for UserError {
    fn from(e: UploadError) -> Self {
        match e {
            UploadError::InvalidFileType => UserError::InvalidFileType,
            UploadError::Storage(e) => UserError::Storage(e),
        }
    }
}

impl UserError {
    pub fn status(&self) -> StatusCode {
        match self {
            UserError::Validation(_)
            | UserError::DuplicateKey
            | UserError::MissingUpload
            | UserError::InvalidFileType => StatusCode::BAD_REQUEST,
            UserError::NotFound => StatusCode::NOT_FOUND,
            UserError::Repository(_) | UserError::Hashing(_) | UserError::Storage(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Turns the error into a response body. `failure_msg` names the use
    /// case and is only shown for server errors, next to the cause.
    pub fn into_api(self, failure_msg: &'static str) -> ApiError {
        let status = self.status();
        if status.is_server_error() {
            ApiError {
                status,
                msg: failure_msg.to_string(),
                error: Some(self.to_string()),
            }
        } else {
            ApiError {
                status,
                msg: self.to_string(),
                error: None,
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub msg: String,
    pub error: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = %self.status, msg = %self.msg, error = ?self.error, "request failed");
        } else {
            warn!(status = %self.status, msg = %self.msg, "request rejected");
        }
        (
            self.status,
            Json(ErrorBody {
                msg: self.msg,
                error: self.error,
            }),
        )
            .into_response()
    }
}

/// Malformed, wrongly typed or non-JSON bodies get the same `{msg}`
/// envelope as every other client error.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        debug!(status = %rejection.status(), reason = %rejection.body_text(), "json body rejected");
        Self {
            status: StatusCode::BAD_REQUEST,
            msg: "Invalid request body.".into(),
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(UserError::Validation("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(UserError::DuplicateKey.status(), StatusCode::BAD_REQUEST);
        assert_eq!(UserError::InvalidFileType.status(), StatusCode::BAD_REQUEST);
        assert_eq!(UserError::MissingUpload.status(), StatusCode::BAD_REQUEST);
        assert_eq!(UserError::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            UserError::Repository(anyhow::anyhow!("down")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            UserError::Hashing(HashingError("rng".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn repository_errors_convert() {
        let dup: UserError = RepositoryError::DuplicateKey("a@b.edu".into()).into();
        assert!(matches!(dup, UserError::DuplicateKey));
        let missing: UserError = RepositoryError::NotFound("a@b.edu".into()).into();
        assert!(matches!(missing, UserError::NotFound));
    }

    #[test]
    fn client_errors_carry_their_own_message() {
        let api = UserError::NotFound.into_api("Error updating user");
        assert_eq!(api.status, StatusCode::NOT_FOUND);
        assert_eq!(api.msg, "User not found.");
        assert!(api.error.is_none());
    }

    #[test]
    fn server_errors_carry_use_case_message_and_cause() {
        let cause = anyhow::anyhow!("connection refused").context("insert user");
        let api = UserError::Repository(cause).into_api("Error creating user");
        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(api.msg, "Error creating user");
        assert_eq!(api.error.as_deref(), Some("insert user: connection refused"));
    }
}
