use axum::{
    extract::Path,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::{
    dto::{DataResponse, MessageResponse},
    error::{AppError, INVALID_JSON},
    links::repo::{self, Link, EDITABLE_FIELDS, TABLE},
    payload::{assignments, column_text, patch_fields, required_str, JsonObject},
    state::AppState,
    storage::{Storage, StorageError},
    users,
};

pub fn link_routes() -> Router<AppState> {
    Router::new().route("/links/", post(create_link)).route(
        "/links/:id",
        get(get_all_links)
            .patch(edit_link_by_id)
            .delete(delete_link_by_id),
    )
}

async fn require_link(store: &mut Storage, id: i64) -> Result<Link, AppError> {
    match repo::get_link(store, id).await? {
        Some(link) => Ok(link),
        None => {
            warn!(id, "link not found");
            Err(AppError::NotFound("Link not found."))
        }
    }
}

/// `GET /links/{user_id}`: every link of one user, newest first.
#[instrument(skip(store))]
pub async fn get_all_links(
    mut store: Storage,
    Path(user_id): Path<i64>,
) -> Result<Json<DataResponse<Vec<Link>>>, AppError> {
    if users::repo::get_user(&mut store, user_id).await?.is_none() {
        warn!(user_id, "user not found");
        return Err(AppError::NotFound("User not found."));
    }

    let links = repo::list_by_user(&mut store, user_id).await?;
    Ok(Json(DataResponse::success(links)))
}

/// A non-zero integer, given either as a JSON number or as numeric text.
fn owner_id(value: &Value) -> Option<i64> {
    let id = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    id.filter(|id| *id != 0)
}

#[instrument(skip(store, body))]
pub async fn create_link(
    mut store: Storage,
    JsonObject(body): JsonObject,
) -> Result<(StatusCode, Json<MessageResponse>), AppError> {
    if body.is_empty() {
        return Err(AppError::Validation(INVALID_JSON));
    }

    let user_id = body
        .get("user_id")
        .and_then(owner_id)
        .ok_or(AppError::Validation("User_id is required."))?;
    let platform = required_str(&body, "platform", "Platform is required.")?;
    let url = required_str(&body, "url", "Url is required.")?;

    let id = match repo::insert_link(&mut store, user_id, platform, url).await {
        Ok(id) => id,
        Err(StorageError::ConstraintViolation(reason)) => {
            warn!(user_id, %platform, %reason, "link rejected by constraint");
            return Err(AppError::Conflict("Failed to create link."));
        }
        Err(e) => return Err(e.into()),
    };
    store.commit().await?;

    info!(id, user_id, %platform, "link created");
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("Link created successfully.")),
    ))
}

#[instrument(skip(store, body))]
pub async fn edit_link_by_id(
    mut store: Storage,
    Path(id): Path<i64>,
    body: Result<JsonObject, AppError>,
) -> Result<Json<MessageResponse>, AppError> {
    require_link(&mut store, id).await?;

    let fields = patch_fields(body)?;
    let columns: Vec<_> = assignments(fields, &EDITABLE_FIELDS)?
        .into_iter()
        .map(|(column, value)| (column, column_text(value)))
        .collect();

    store
        .update_by_id(TABLE, id, columns)
        .await
        .map_err(AppError::from_write)?;
    store.commit().await.map_err(AppError::from_write)?;

    info!(id, "link edited");
    Ok(Json(MessageResponse::new("Link edited successfully.")))
}

#[instrument(skip(store))]
pub async fn delete_link_by_id(
    mut store: Storage,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, AppError> {
    require_link(&mut store, id).await?;

    store
        .delete_by_id(TABLE, id)
        .await
        .map_err(AppError::from_write)?;
    store.commit().await.map_err(AppError::from_write)?;

    info!(id, "link deleted");
    Ok(Json(MessageResponse::new("Link deleted successfully.")))
}
