use axum::{extract::Path, routing::get, Json, Router};
use tracing::{info, instrument, warn};

use crate::{
    auth::password::hash_password,
    dto::{DataResponse, MessageResponse},
    error::AppError,
    payload::{assignments, column_text, patch_fields, JsonObject},
    state::AppState,
    storage::Storage,
    users::repo::{self, UserProfile, EDITABLE_FIELDS, TABLE},
};

pub fn user_routes() -> Router<AppState> {
    Router::new().route(
        "/users/:id",
        get(get_user_by_id)
            .patch(edit_user_by_id)
            .delete(delete_user_by_id),
    )
}

async fn require_user(store: &mut Storage, id: i64) -> Result<UserProfile, AppError> {
    match repo::get_user(store, id).await? {
        Some(user) => Ok(user),
        None => {
            warn!(id, "user not found");
            Err(AppError::NotFound("User not found."))
        }
    }
}

#[instrument(skip(store))]
pub async fn get_user_by_id(
    mut store: Storage,
    Path(id): Path<i64>,
) -> Result<Json<DataResponse<UserProfile>>, AppError> {
    let user = require_user(&mut store, id).await?;
    Ok(Json(DataResponse::success(user)))
}

#[instrument(skip(store, body))]
pub async fn edit_user_by_id(
    mut store: Storage,
    Path(id): Path<i64>,
    body: Result<JsonObject, AppError>,
) -> Result<Json<MessageResponse>, AppError> {
    require_user(&mut store, id).await?;

    let fields = patch_fields(body)?;
    let mut columns = Vec::new();
    for (column, value) in assignments(fields, &EDITABLE_FIELDS)? {
        let text = match (column, column_text(value)) {
            ("password", Some(plain)) => Some(hash_password(&plain)?),
            (_, text) => text,
        };
        columns.push((column, text));
    }
    let edited: Vec<&str> = columns.iter().map(|(column, _)| *column).collect();

    store
        .update_by_id(TABLE, id, columns)
        .await
        .map_err(AppError::from_write)?;
    store.commit().await.map_err(AppError::from_write)?;

    info!(id, fields = ?edited, "user edited");
    Ok(Json(MessageResponse::new("User edited successfully.")))
}

#[instrument(skip(store))]
pub async fn delete_user_by_id(
    mut store: Storage,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, AppError> {
    require_user(&mut store, id).await?;

    store
        .delete_by_id(TABLE, id)
        .await
        .map_err(AppError::from_write)?;
    store.commit().await.map_err(AppError::from_write)?;

    info!(id, "user deleted");
    Ok(Json(MessageResponse::new("User deleted successfully.")))
}
