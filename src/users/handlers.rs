use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use tracing::{instrument, warn};

use crate::{
    images::services::ImageUpload,
    state::AppState,
    users::{
        dto::{
            provided, CreateUserRequest, DeleteUserRequest, EditUserRequest, MessageResponse,
            UploadResponse,
        },
        errors::{ApiError, UserError},
        repo_types::User,
    },
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/user/create", post(create_user))
        .route("/user/edit", put(edit_user))
        .route("/user/delete", delete(delete_user))
        .route("/user/getAll", get(list_users))
}

pub fn upload_routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/user/uploadImage", post(upload_image))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    let Json(payload) = payload?;
    let user = state
        .users
        .create(
            payload.name.as_deref().unwrap_or_default(),
            payload.email.as_deref().unwrap_or_default(),
            payload.password.as_deref().unwrap_or_default(),
        )
        .await
        .map_err(|e| e.into_api("Error creating user"))?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            msg: format!("User created: {}", user.name),
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn edit_user(
    State(state): State<AppState>,
    payload: Result<Json<EditUserRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Json(payload) = payload?;
    let name = provided(payload.name);
    let password = provided(payload.password);
    let user = state
        .users
        .edit(
            payload.email.as_deref().unwrap_or_default(),
            name.as_deref(),
            password.as_deref(),
        )
        .await
        .map_err(|e| e.into_api("Error updating user"))?;

    Ok(Json(MessageResponse {
        msg: format!("User {} updated successfully.", user.name),
    }))
}

#[instrument(skip(state, payload))]
pub async fn delete_user(
    State(state): State<AppState>,
    payload: Result<Json<DeleteUserRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    // No usable body means no email, which is an unknown user.
    let payload = payload.map(|Json(p)| p).unwrap_or_default();
    state
        .users
        .delete(payload.email.as_deref().unwrap_or_default())
        .await
        .map_err(|e| e.into_api("Error deleting user"))?;

    Ok(Json(MessageResponse {
        msg: "User deleted successfully.".into(),
    }))
}

#[instrument(skip(state))]
pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<User>>, ApiError> {
    let users = state
        .users
        .list_all()
        .await
        .map_err(|e| e.into_api("Error retrieving users"))?;
    Ok(Json(users))
}

/// POST /user/uploadImage (multipart)
/// Fields: `email` (text) and `photo` (a single image file).
#[instrument(skip(state, mp))]
pub async fn upload_image(
    State(state): State<AppState>,
    mut mp: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    const FAILURE: &str = "Error saving image path";

    let mut email = String::new();
    let mut photo: Option<ImageUpload> = None;
    loop {
        let field = match mp.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "malformed multipart body");
                return Err(ApiError {
                    status: e.status(),
                    msg: e.body_text(),
                    error: None,
                });
            }
        };
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("email") => {
                email = field.text().await.map_err(|e| ApiError {
                    status: e.status(),
                    msg: e.body_text(),
                    error: None,
                })?;
            }
            Some("photo") if photo.is_none() => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().unwrap_or_default().to_string();
                let body = field.bytes().await.map_err(|e| ApiError {
                    status: e.status(),
                    msg: e.body_text(),
                    error: None,
                })?;
                photo = Some(ImageUpload {
                    body,
                    file_name,
                    content_type,
                });
            }
            Some("photo") => {
                return Err(
                    UserError::Validation("Only one photo may be uploaded.").into_api(FAILURE)
                );
            }
            _ => {}
        }
    }

    let path = state
        .users
        .attach_image(&email, photo)
        .await
        .map_err(|e| e.into_api(FAILURE))?;

    Ok(Json(UploadResponse {
        msg: "File uploaded successfully.".into(),
        path,
    }))
}
