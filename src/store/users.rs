use async_trait::async_trait;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};

use crate::db::models::{NewUser, User};
use crate::state::DbPool;
use crate::store::{StoreError, UserStore};

const USER_COLUMNS: &str =
    "id, username, email, password_hash, display_name, avatar_url, created_at";

pub struct SqliteUserStore {
    pool: DbPool,
}

impl SqliteUserStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        display_name: row.get(4)?,
        avatar_url: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn fetch_where(
    conn: &Connection,
    clause: &str,
    value: &dyn rusqlite::ToSql,
) -> Result<Option<User>, StoreError> {
    let user = conn
        .query_row(
            &format!("SELECT {} FROM users WHERE {} = ?1", USER_COLUMNS, clause),
            params![value],
            user_from_row,
        )
        .optional()?;
    Ok(user)
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    )
}

#[async_trait]
impl UserStore for SqliteUserStore {
    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        let conn = self.pool.get()?;

        let inserted = conn.execute(
            "INSERT INTO users (username, email, password_hash, display_name, avatar_url)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                user.username,
                user.email,
                user.password_hash,
                user.display_name,
                user.avatar_url,
            ],
        );

        match inserted {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => {
                return Err(StoreError::Conflict("User already exists".into()));
            }
            Err(e) => return Err(e.into()),
        }

        let id = conn.last_insert_rowid();
        fetch_where(&conn, "id", &id)?.ok_or(StoreError::Sql(rusqlite::Error::QueryReturnedNoRows))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, StoreError> {
        let conn = self.pool.get()?;
        fetch_where(&conn, "id", &id)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let conn = self.pool.get()?;
        fetch_where(&conn, "email", &email)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let conn = self.pool.get()?;
        fetch_where(&conn, "username", &username)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn store() -> SqliteUserStore {
        let pool = db::create_memory_pool().unwrap();
        db::run_migrations(&pool).unwrap();
        SqliteUserStore::new(pool)
    }

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: email.to_string(),
            password_hash: "$2b$04$notarealhash".to_string(),
            display_name: "Test User".to_string(),
            avatar_url: "https://example.com/avatars/default.jpg".to_string(),
        }
    }

    #[tokio::test]
    async fn create_then_lookup_by_every_key() {
        let store = store();
        let user = store
            .create(new_user("alex", "alex@example.com"))
            .await
            .unwrap();
        assert!(user.id > 0);
        assert!(!user.created_at.is_empty());

        let by_id = store.find_by_id(user.id).await.unwrap().unwrap();
        let by_email = store
            .find_by_email("alex@example.com")
            .await
            .unwrap()
            .unwrap();
        let by_name = store.find_by_username("alex").await.unwrap().unwrap();
        assert_eq!(by_id, user);
        assert_eq!(by_email, user);
        assert_eq!(by_name, user);
    }

    #[tokio::test]
    async fn missing_user_is_none() {
        let store = store();
        assert!(store.find_by_id(1).await.unwrap().is_none());
        assert!(store
            .find_by_email("nobody@example.com")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let store = store();
        store
            .create(new_user("alex", "alex@example.com"))
            .await
            .unwrap();
        let err = store
            .create(new_user("alex2", "alex@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn duplicate_username_is_a_conflict() {
        let store = store();
        store
            .create(new_user("alex", "alex@one.com"))
            .await
            .unwrap();
        let err = store
            .create(new_user("alex", "alex@two.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }
}
