use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::LoginResponse,
        jwt::JwtKeys,
        password::{hash_password, verify_password},
        repo,
    },
    dto::MessageResponse,
    error::AppError,
    payload::{required_str, JsonObject},
    state::AppState,
    storage::{Storage, StorageError},
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

#[instrument(skip(store, body))]
pub async fn register(
    mut store: Storage,
    JsonObject(body): JsonObject,
) -> Result<(StatusCode, Json<MessageResponse>), AppError> {
    let email = required_str(&body, "email", "Email is required.")?;
    let password = required_str(&body, "password", "Password is required.")?;

    let hash = hash_password(password)?;

    match repo::insert_user(&mut store, email, &hash).await {
        Ok(user_id) => {
            store.commit().await?;
            info!(user_id, %email, "user registered");
            Ok((
                StatusCode::CREATED,
                Json(MessageResponse::new("User registered successfully.")),
            ))
        }
        Err(StorageError::ConstraintViolation(reason)) => {
            warn!(%email, %reason, "email already registered");
            Err(AppError::Conflict("User is already registered."))
        }
        Err(e) => Err(e.into()),
    }
}

#[instrument(skip(state, store, body))]
pub async fn login(
    State(state): State<AppState>,
    mut store: Storage,
    JsonObject(body): JsonObject,
) -> Result<Json<LoginResponse>, AppError> {
    let keys = JwtKeys::from_config(&state.config.jwt).ok_or(AppError::MissingSecret)?;

    let email = required_str(&body, "email", "Email is required.")?;
    let password = required_str(&body, "password", "Password is required.")?;

    let Some(user) = repo::find_credentials(&mut store, email).await? else {
        warn!(%email, "login unknown email");
        return Err(AppError::NotFound("User is not found."));
    };

    if !verify_password(password, &user.password)? {
        warn!(%email, user_id = user.id, "login invalid password");
        return Err(AppError::Unauthorized("Incorrect password."));
    }

    let token = keys.sign(user.id)?;

    info!(user_id = user.id, %email, "user logged in");
    Ok(Json(LoginResponse {
        message: "User logged in successfully.",
        token,
    }))
}
