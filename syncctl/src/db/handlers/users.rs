//! Database repository for registry users.

use crate::{
    db::{
        errors::{DbError, Result},
        models::users::{LicenseStatus, UserCreateDBRequest, UserDBResponse},
    },
    types::UserId,
};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection};
use tracing::instrument;
use uuid::Uuid;

// Database entity model
#[derive(Debug, Clone, FromRow)]
struct User {
    pub id: UserId,
    pub db_id: String,
    pub username: String,
    pub license_status: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<User> for UserDBResponse {
    type Error = DbError;

    fn try_from(user: User) -> Result<Self> {
        Ok(Self {
            id: user.id,
            db_id: user.db_id,
            username: user.username,
            license_status: user.license_status.parse()?,
            created_at: user.created_at,
        })
    }
}

pub struct Users<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Users<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Insert a user, or return `None` when `(username, db_id)` is already taken.
    #[instrument(skip(self, request), fields(username = %request.username, db_id = %request.db_id), err)]
    pub async fn create(&mut self, request: &UserCreateDBRequest) -> Result<Option<UserDBResponse>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, db_id, username, password_hash, license_status)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (username, db_id) DO NOTHING
            RETURNING id, db_id, username, license_status, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&request.db_id)
        .bind(&request.username)
        .bind(&request.password_hash)
        .bind(LicenseStatus::Pending.as_str())
        .fetch_optional(&mut *self.db)
        .await?;

        user.map(UserDBResponse::try_from).transpose()
    }

    #[instrument(skip(self), err)]
    pub async fn list_by_db_id(&mut self, db_id: &str) -> Result<Vec<UserDBResponse>> {
        let users = sqlx::query_as::<_, User>(
            "SELECT id, db_id, username, license_status, created_at FROM users WHERE db_id = $1 ORDER BY username ASC",
        )
        .bind(db_id)
        .fetch_all(&mut *self.db)
        .await?;

        users.into_iter().map(UserDBResponse::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::PgPool;

    fn request(db_id: &str, username: &str) -> UserCreateDBRequest {
        UserCreateDBRequest {
            db_id: db_id.to_string(),
            username: username.to_string(),
            password_hash: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".to_string(),
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_user(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Users::new(&mut conn);

        let user = repo.create(&request("shop-1", "alice")).await.unwrap().unwrap();
        assert_eq!(user.username, "alice");
        assert_eq!(user.db_id, "shop-1");
        assert_eq!(user.license_status, LicenseStatus::Pending);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_duplicate_user_is_not_inserted(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Users::new(&mut conn);

        assert!(repo.create(&request("shop-1", "alice")).await.unwrap().is_some());
        assert!(repo.create(&request("shop-1", "alice")).await.unwrap().is_none());
        // Same username in another tenant is a different user
        assert!(repo.create(&request("shop-2", "alice")).await.unwrap().is_some());

        assert_eq!(repo.list_by_db_id("shop-1").await.unwrap().len(), 1);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_list_by_db_id_ordered_by_username(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Users::new(&mut conn);

        for name in ["carol", "alice", "bob"] {
            repo.create(&request("shop-1", name)).await.unwrap();
        }
        repo.create(&request("shop-2", "dave")).await.unwrap();

        let users = repo.list_by_db_id("shop-1").await.unwrap();
        let names: Vec<_> = users.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names, vec!["alice", "bob", "carol"]);
        assert!(repo.list_by_db_id("unknown").await.unwrap().is_empty());
    }
}
