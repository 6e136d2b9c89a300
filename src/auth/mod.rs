use crate::state::AppState;
use axum::Router;

pub mod claims;
mod dto;
pub mod handlers;
pub mod jwt;
pub mod password;
mod repo;

pub fn router() -> Router<AppState> {
    handlers::auth_routes()
}
