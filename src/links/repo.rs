use serde::Serialize;
use sqlx::FromRow;

use crate::storage::{Storage, StorageError};

pub const TABLE: &str = "links";

/// Columns a partial update may touch.
pub const EDITABLE_FIELDS: [&str; 2] = ["platform", "url"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Link {
    pub id: i64,
    pub user_id: i64,
    pub platform: String,
    pub url: String,
    pub created: String,
}

pub async fn get_link(store: &mut Storage, id: i64) -> Result<Option<Link>, StorageError> {
    let link = sqlx::query_as::<_, Link>(
        "SELECT id, user_id, platform, url, created FROM links WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(store.conn())
    .await?;
    Ok(link)
}

/// Newest first.
pub async fn list_by_user(store: &mut Storage, user_id: i64) -> Result<Vec<Link>, StorageError> {
    let rows = sqlx::query_as::<_, Link>(
        r#"
        SELECT id, user_id, platform, url, created
        FROM links
        WHERE user_id = ?
        ORDER BY created DESC, id DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(store.conn())
    .await?;
    Ok(rows)
}

pub async fn insert_link(
    store: &mut Storage,
    user_id: i64,
    platform: &str,
    url: &str,
) -> Result<i64, StorageError> {
    let result = sqlx::query("INSERT INTO links (user_id, platform, url) VALUES (?, ?, ?)")
        .bind(user_id)
        .bind(platform)
        .bind(url)
        .execute(store.writer().await?)
        .await?;
    Ok(result.last_insert_rowid())
}
