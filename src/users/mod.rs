use crate::state::AppState;
use axum::Router;

mod dto;
pub mod errors;
pub mod handlers;
pub mod memory;
pub mod password;
pub mod repo;
pub mod repo_types;
pub mod services;
pub mod validators;

pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .merge(handlers::user_routes())
        .merge(handlers::upload_routes(max_upload_bytes))
}
