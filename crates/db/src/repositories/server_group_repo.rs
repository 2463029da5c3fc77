//! Repository for `server_groups` and the `server_group_servers` join table.

use sqlx::PgPool;
use servwatch_core::types::DbId;

use crate::models::server::{CreateServerGroup, ServerGroup};

const COLUMNS: &str =
    "id, name, description, parent_id, deleted_at, created_at, updated_at";

/// Provides group CRUD and membership queries.
pub struct ServerGroupRepo;

impl ServerGroupRepo {
    pub async fn create(
        pool: &PgPool,
        input: &CreateServerGroup,
    ) -> Result<ServerGroup, sqlx::Error> {
        let query = format!(
            "INSERT INTO server_groups (name, description, parent_id)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ServerGroup>(&query)
            .bind(&input.name)
            .bind(&input.description)
            .bind(input.parent_id)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<ServerGroup>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM server_groups WHERE id = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, ServerGroup>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<ServerGroup>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM server_groups WHERE deleted_at IS NULL ORDER BY name");
        sqlx::query_as::<_, ServerGroup>(&query).fetch_all(pool).await
    }

    /// Add a server to a group. Adding an existing member is a no-op.
    pub async fn add_server(
        pool: &PgPool,
        group_id: DbId,
        server_id: DbId,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO server_group_servers (group_id, server_id)
             VALUES ($1, $2)
             ON CONFLICT DO NOTHING",
        )
        .bind(group_id)
        .bind(server_id)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Remove a server from a group. Returns `true` if a membership existed.
    pub async fn remove_server(
        pool: &PgPool,
        group_id: DbId,
        server_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM server_group_servers WHERE group_id = $1 AND server_id = $2")
                .bind(group_id)
                .bind(server_id)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Ids of the groups `server_id` belongs to directly, in id order.
    ///
    /// Parent groups are not included.
    pub async fn group_ids_for_server(
        pool: &PgPool,
        server_id: DbId,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "SELECT gs.group_id
             FROM server_group_servers gs
             JOIN server_groups g ON g.id = gs.group_id
             WHERE gs.server_id = $1 AND g.deleted_at IS NULL
             ORDER BY gs.group_id",
        )
        .bind(server_id)
        .fetch_all(pool)
        .await
    }
}
