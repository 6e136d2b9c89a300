//! Request-scoped access to the relational store.
//!
//! Every handler that touches the database takes a [`Storage`] argument,
//! which holds one pooled connection for the life of the request. Reads run
//! in autocommit mode. The first write opens a `BEGIN IMMEDIATE` transaction,
//! so the write lock is taken up front and a second writer waits on the busy
//! timeout instead of failing a lock upgrade. The handler either calls
//! [`Storage::commit`] or drops the storage, in which case the open write is
//! rolled back before the connection goes back to the pool.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use sqlx::{
    error::ErrorKind, pool::PoolConnection, QueryBuilder, Sqlite, SqliteConnection, SqlitePool,
};
use tracing::{debug, error, warn};

use crate::error::AppError;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A write was rejected by a unique, foreign key, not-null or check rule.
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),
    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            match db_err.kind() {
                ErrorKind::UniqueViolation
                | ErrorKind::ForeignKeyViolation
                | ErrorKind::NotNullViolation
                | ErrorKind::CheckViolation => {
                    return StorageError::ConstraintViolation(db_err.message().to_string());
                }
                _ => {}
            }
        }
        StorageError::Database(err)
    }
}

pub struct Storage {
    // Only `None` once `Drop` has handed the connection to the rollback task.
    conn: Option<PoolConnection<Sqlite>>,
    writing: bool,
}

impl Storage {
    pub async fn acquire(pool: &SqlitePool) -> Result<Self, StorageError> {
        let conn = pool.acquire().await?;
        Ok(Self {
            conn: Some(conn),
            writing: false,
        })
    }

    /// Connection for reads. Inside an open write this sees the pending rows.
    pub fn conn(&mut self) -> &mut SqliteConnection {
        self.conn
            .as_deref_mut()
            .expect("storage connection is held until drop")
    }

    /// Connection for writes, opening the write transaction on first use.
    pub async fn writer(&mut self) -> Result<&mut SqliteConnection, StorageError> {
        if !self.writing {
            sqlx::query("BEGIN IMMEDIATE").execute(self.conn()).await?;
            self.writing = true;
        }
        Ok(self.conn())
    }

    /// Commits the open write, if any. Without one this only releases the
    /// connection.
    pub async fn commit(mut self) -> Result<(), StorageError> {
        if self.writing {
            sqlx::query("COMMIT").execute(self.conn()).await?;
            self.writing = false;
        }
        Ok(())
    }

    /// `UPDATE <table> SET col = ?, ... WHERE id = ?` over exactly the given
    /// columns. Column names must come from a fixed allow-list, never from
    /// request input. Returns the number of rows touched.
    pub async fn update_by_id(
        &mut self,
        table: &'static str,
        id: i64,
        assignments: Vec<(&'static str, Option<String>)>,
    ) -> Result<u64, StorageError> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!("UPDATE {table} SET "));
        let mut set = qb.separated(", ");
        for (column, value) in assignments {
            set.push(column);
            set.push_unseparated(" = ");
            set.push_bind_unseparated(value);
        }
        qb.push(" WHERE id = ").push_bind(id);

        let result = qb.build().execute(self.writer().await?).await?;
        debug!(table, id, rows = result.rows_affected(), "row updated");
        Ok(result.rows_affected())
    }

    pub async fn delete_by_id(&mut self, table: &'static str, id: i64) -> Result<u64, StorageError> {
        let result = sqlx::query(&format!("DELETE FROM {table} WHERE id = ?"))
            .bind(id)
            .execute(self.writer().await?)
            .await?;
        debug!(table, id, rows = result.rows_affected(), "row deleted");
        Ok(result.rows_affected())
    }
}

impl Drop for Storage {
    fn drop(&mut self) {
        if !self.writing {
            return;
        }
        let Some(mut conn) = self.conn.take() else {
            return;
        };
        debug!("rolling back uncommitted write");
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = sqlx::query("ROLLBACK").execute(&mut *conn).await {
                        // Closing the connection discards the transaction.
                        warn!(error = %e, "rollback failed, closing connection");
                        drop(conn.detach());
                    }
                });
            }
            Err(_) => drop(conn.detach()),
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Storage
where
    S: Send + Sync,
    SqlitePool: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(_parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let pool = SqlitePool::from_ref(state);
        Storage::acquire(&pool).await.map_err(|e| {
            error!(error = %e, "failed to acquire database connection");
            AppError::Storage(e)
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::test_support::{file_state, test_state};
    use crate::users::repo::get_user;

    #[tokio::test]
    async fn duplicate_email_is_a_constraint_violation() {
        let state = test_state().await;
        let mut store = Storage::acquire(&state.db).await.unwrap();
        let err = sqlx::query("INSERT INTO users (email, password) VALUES ('test@gmail.com', 'x')")
            .execute(store.writer().await.unwrap())
            .await
            .map_err(StorageError::from)
            .unwrap_err();
        assert!(matches!(err, StorageError::ConstraintViolation(_)), "{err:?}");
    }

    #[tokio::test]
    async fn other_failures_are_generic() {
        let state = test_state().await;
        let mut store = Storage::acquire(&state.db).await.unwrap();
        let err = sqlx::query("SELECT * FROM no_such_table")
            .execute(store.conn())
            .await
            .map_err(StorageError::from)
            .unwrap_err();
        assert!(matches!(err, StorageError::Database(_)), "{err:?}");
    }

    #[tokio::test]
    async fn dropped_storage_rolls_back() {
        let state = test_state().await;
        {
            let mut store = Storage::acquire(&state.db).await.unwrap();
            store.delete_by_id("links", 1).await.unwrap();
        }
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM links WHERE id = 1")
            .fetch_one(&state.db)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn failed_write_leaves_connection_usable() {
        let state = test_state().await;
        {
            let mut store = Storage::acquire(&state.db).await.unwrap();
            let err = store
                .update_by_id("users", 1, vec![("email", None)])
                .await
                .unwrap_err();
            assert!(matches!(err, StorageError::ConstraintViolation(_)), "{err:?}");
        }

        // Same single connection: a dangling transaction would make this BEGIN fail.
        let mut store = Storage::acquire(&state.db).await.unwrap();
        store.delete_by_id("links", 1).await.unwrap();
        store.commit().await.unwrap();
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM links")
            .fetch_one(&state.db)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn update_touches_only_given_columns() {
        let state = test_state().await;
        let mut store = Storage::acquire(&state.db).await.unwrap();
        let rows = store
            .update_by_id("users", 1, vec![("first_name", Some("Atest".into()))])
            .await
            .unwrap();
        store.commit().await.unwrap();
        assert_eq!(rows, 1);

        let (first, last): (Option<String>, Option<String>) =
            sqlx::query_as("SELECT first_name, last_name FROM users WHERE id = 1")
                .fetch_one(&state.db)
                .await
                .unwrap();
        assert_eq!(first.as_deref(), Some("Atest"));
        assert_eq!(last.as_deref(), Some("Testowy"));
    }

    #[tokio::test]
    async fn overlapping_writers_wait_for_each_other() {
        let (_dir, state) = file_state().await;
        let mut a = Storage::acquire(&state.db).await.unwrap();
        let mut b = Storage::acquire(&state.db).await.unwrap();

        // Both look the row up before either writes.
        assert!(get_user(&mut a, 1).await.unwrap().is_some());
        assert!(get_user(&mut b, 1).await.unwrap().is_some());

        a.update_by_id("users", 1, vec![("first_name", Some("A".into()))])
            .await
            .unwrap();
        let second = tokio::spawn(async move {
            b.update_by_id("users", 1, vec![("first_name", Some("B".into()))])
                .await?;
            b.commit().await
        });
        tokio::time::sleep(Duration::from_millis(100)).await;
        a.commit().await.unwrap();
        second.await.unwrap().unwrap();

        let first: Option<String> = sqlx::query_scalar("SELECT first_name FROM users WHERE id = 1")
            .fetch_one(&state.db)
            .await
            .unwrap();
        assert_eq!(first.as_deref(), Some("B"));
    }
}
