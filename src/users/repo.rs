use serde::Serialize;
use sqlx::FromRow;

use crate::storage::{Storage, StorageError};

pub const TABLE: &str = "users";

/// Columns a partial update may touch.
pub const EDITABLE_FIELDS: [&str; 5] = ["email", "password", "first_name", "last_name", "image_url"];

/// Public view of a user row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct UserProfile {
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub image_url: Option<String>,
}

pub async fn get_user(store: &mut Storage, id: i64) -> Result<Option<UserProfile>, StorageError> {
    let user = sqlx::query_as::<_, UserProfile>(
        r#"
        SELECT email, first_name, last_name, image_url
        FROM users
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(store.conn())
    .await?;
    Ok(user)
}
