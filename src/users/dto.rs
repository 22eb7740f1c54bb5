use serde::{Deserialize, Serialize};

/// Request body for POST /user/create. Missing fields validate as empty.
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Request body for PUT /user/edit.
#[derive(Debug, Deserialize)]
pub struct EditUserRequest {
    pub email: Option<String>,
    pub name: Option<String>,
    pub password: Option<String>,
}

/// Request body for DELETE /user/delete.
#[derive(Debug, Default, Deserialize)]
pub struct DeleteUserRequest {
    pub email: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub msg: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub msg: String,
    pub path: String,
}

/// Empty strings count as "not provided", like a missing field.
pub(crate) fn provided(field: Option<String>) -> Option<String> {
    field.filter(|v| !v.is_empty())
}
