//! User repository

use crate::domain::UserSnapshot;
use crate::error::Result;
use async_trait::async_trait;
use sqlx::MySqlPool;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<UserSnapshot>>;
    async fn find_by_phone(&self, phone: &str) -> Result<Option<UserSnapshot>>;
    /// Stored PHC-format password hash
    async fn find_password_hash(&self, id: i64) -> Result<Option<String>>;
}

pub struct UserRepositoryImpl {
    pool: MySqlPool,
}

impl UserRepositoryImpl {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for UserRepositoryImpl {
    async fn find_by_id(&self, id: i64) -> Result<Option<UserSnapshot>> {
        let user = sqlx::query_as::<_, UserSnapshot>(
            r#"
            SELECT user_id AS id, name, email, phone, is_active, is_staff, is_superuser
            FROM core_user
            WHERE user_id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_by_phone(&self, phone: &str) -> Result<Option<UserSnapshot>> {
        let user = sqlx::query_as::<_, UserSnapshot>(
            r#"
            SELECT user_id AS id, name, email, phone, is_active, is_staff, is_superuser
            FROM core_user
            WHERE phone = ?
            "#,
        )
        .bind(phone)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_password_hash(&self, id: i64) -> Result<Option<String>> {
        let hash: Option<(String,)> =
            sqlx::query_as("SELECT password FROM core_user WHERE user_id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(hash.map(|(password,)| password))
    }
}
