use async_trait::async_trait;
use time::OffsetDateTime;

use crate::application::repos::{AdminsRepo, NewAdmin, RepoError};
use crate::domain::entities::AdminRecord;

use super::PostgresRepositories;
use super::util::map_sqlx_error;

#[derive(sqlx::FromRow)]
struct AdminRow {
    id: i64,
    username: String,
    email: String,
    password: String,
    created_at: OffsetDateTime,
}

impl From<AdminRow> for AdminRecord {
    fn from(row: AdminRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            email: row.email,
            password_hash: row.password,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl AdminsRepo for PostgresRepositories {
    async fn find_for_login(&self, identifier: &str) -> Result<Option<AdminRecord>, RepoError> {
        let row = sqlx::query_as::<_, AdminRow>(
            "SELECT id, username, email, password, created_at FROM admins \
             WHERE email = $1 OR username = $1 \
             ORDER BY (email = $1) DESC, id \
             LIMIT 1",
        )
        .bind(identifier)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(AdminRecord::from))
    }

    async fn admin_exists(&self, username: &str, email: &str) -> Result<bool, RepoError> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM admins WHERE username = $1 OR email = $2)",
        )
        .bind(username)
        .bind(email)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn insert_admin(&self, admin: NewAdmin) -> Result<AdminRecord, RepoError> {
        let row = sqlx::query_as::<_, AdminRow>(
            "INSERT INTO admins (username, email, password) VALUES ($1, $2, $3) \
             RETURNING id, username, email, password, created_at",
        )
        .bind(admin.username)
        .bind(admin.email)
        .bind(admin.password_hash)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }
}
