//! Repository for the `servers` table.

use sqlx::PgPool;
use servwatch_core::types::DbId;

use crate::models::server::{CreateServer, Server};

const COLUMNS: &str =
    "id, hostname, ip_address, description, deleted_at, created_at, updated_at";

/// Provides CRUD operations for servers.
pub struct ServerRepo;

impl ServerRepo {
    pub async fn create(pool: &PgPool, input: &CreateServer) -> Result<Server, sqlx::Error> {
        let query = format!(
            "INSERT INTO servers (hostname, ip_address, description)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Server>(&query)
            .bind(&input.hostname)
            .bind(&input.ip_address)
            .bind(&input.description)
            .fetch_one(pool)
            .await
    }

    /// Find a server by id. Excludes soft-deleted rows.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Server>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM servers WHERE id = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, Server>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<Server>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM servers WHERE deleted_at IS NULL ORDER BY hostname");
        sqlx::query_as::<_, Server>(&query).fetch_all(pool).await
    }

    /// Soft-delete a server. Returns `true` if a row was marked deleted.
    pub async fn soft_delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE servers SET deleted_at = NOW(), updated_at = NOW()
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
