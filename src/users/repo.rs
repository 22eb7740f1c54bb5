use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;

use crate::users::repo_types::{User, UserUpdate};

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("user with email '{0}' already exists")]
    DuplicateKey(String),
    #[error("user with email '{0}' not found")]
    NotFound(String),
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

pub type RepoResult<T> = Result<T, RepositoryError>;

/// Persistent collection of users keyed by email. Every operation is
/// atomic for a single record.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_email(&self, email: &str) -> RepoResult<Option<User>>;

    /// All users in insertion order.
    async fn find_all(&self) -> RepoResult<Vec<User>>;

    /// Fails with `DuplicateKey` if the email is taken. Concurrent inserts
    /// of one email: first writer wins.
    async fn insert(&self, user: &User) -> RepoResult<()>;

    /// Writes only the fields set in `update` and returns the stored
    /// record. Fails with `NotFound` if the email is absent.
    async fn update_existing(&self, email: &str, update: &UserUpdate) -> RepoResult<User>;

    /// Fails with `NotFound` if the email is absent.
    async fn delete_by_email(&self, email: &str) -> RepoResult<()>;

    async fn close(&self) {}
}

#[derive(Clone)]
pub struct PgUserRepository {
    db: PgPool,
}

impl PgUserRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT name, email, password_hash, image_path
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await
        .context("find user by email")?;
        Ok(user)
    }

    async fn find_all(&self) -> RepoResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT name, email, password_hash, image_path
            FROM users
            ORDER BY created_at ASC
            "#,
        )
        .fetch_all(&self.db)
        .await
        .context("list users")?;
        Ok(users)
    }

    async fn insert(&self, user: &User) -> RepoResult<()> {
        let res = sqlx::query(
            r#"
            INSERT INTO users (name, email, password_hash, image_path)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.image_path)
        .execute(&self.db)
        .await;

        match res {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(RepositoryError::DuplicateKey(user.email.clone()))
            }
            Err(e) => Err(anyhow::Error::new(e).context("insert user").into()),
        }
    }

    async fn update_existing(&self, email: &str, update: &UserUpdate) -> RepoResult<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
               SET name = COALESCE($2, name),
                   password_hash = COALESCE($3, password_hash),
                   image_path = COALESCE($4, image_path)
             WHERE email = $1
            RETURNING name, email, password_hash, image_path
            "#,
        )
        .bind(email)
        .bind(update.name.as_deref())
        .bind(update.password_hash.as_deref())
        .bind(update.image_path.as_deref())
        .fetch_optional(&self.db)
        .await
        .context("update user")?;

        user.ok_or_else(|| RepositoryError::NotFound(email.to_string()))
    }

    async fn delete_by_email(&self, email: &str) -> RepoResult<()> {
        let done = sqlx::query("DELETE FROM users WHERE email = $1")
            .bind(email)
            .execute(&self.db)
            .await
            .context("delete user")?;

        if done.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(email.to_string()));
        }
        Ok(())
    }

    async fn close(&self) {
        self.db.close().await;
    }
}
