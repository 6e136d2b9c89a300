use sqlx::FromRow;

use crate::storage::{Storage, StorageError};

/// What login needs to check a password.
#[derive(Debug, Clone, FromRow)]
pub struct Credentials {
    pub id: i64,
    pub password: String,
}

/// Insert a new user with an already hashed password.
pub async fn insert_user(
    store: &mut Storage,
    email: &str,
    password_hash: &str,
) -> Result<i64, StorageError> {
    let result = sqlx::query("INSERT INTO users (email, password) VALUES (?, ?)")
        .bind(email)
        .bind(password_hash)
        .execute(store.writer().await?)
        .await?;
    Ok(result.last_insert_rowid())
}

pub async fn find_credentials(
    store: &mut Storage,
    email: &str,
) -> Result<Option<Credentials>, StorageError> {
    let row = sqlx::query_as::<_, Credentials>("SELECT id, password FROM users WHERE email = ?")
        .bind(email)
        .fetch_optional(store.conn())
        .await?;
    Ok(row)
}
