/// Task group model and database operations
///
/// A group collects tasks of the user who created it. Membership is stored
/// twice: as `task_ids` on the group (ordered for display, no duplicates) and
/// as `group_id` on each task. The multi-row operations here keep the two in
/// step inside a transaction, so a task belongs to at most one group.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE task_groups (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(100) NOT NULL,
///     task_ids UUID[] NOT NULL DEFAULT '{}',
///     created_by UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     share_token VARCHAR(255),
///     link_access VARCHAR(8) NOT NULL DEFAULT 'off',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// `share_token` and `link_access` are stored and returned, but no route grants
/// access through them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use std::fmt;
use uuid::Uuid;

use crate::store::StoreError;

/// Link sharing level of a group
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkAccess {
    /// Not shared
    #[default]
    Off,

    /// Anyone with the link may read
    Read,

    /// Anyone with the link may edit
    Edit,
}

impl LinkAccess {
    /// Converts access level to string for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkAccess::Off => "off",
            LinkAccess::Read => "read",
            LinkAccess::Edit => "edit",
        }
    }
}

impl fmt::Display for LinkAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown `link_access` value read from the database
#[derive(Debug, thiserror::Error)]
#[error("Unknown link access value: {0}")]
pub struct UnknownLinkAccess(String);

impl TryFrom<String> for LinkAccess {
    type Error = UnknownLinkAccess;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "off" => Ok(LinkAccess::Off),
            "read" => Ok(LinkAccess::Read),
            "edit" => Ok(LinkAccess::Edit),
            _ => Err(UnknownLinkAccess(value)),
        }
    }
}

/// Group of tasks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TaskGroup {
    pub id: Uuid,

    pub name: String,

    /// Member task IDs in display order, without duplicates
    pub task_ids: Vec<Uuid>,

    /// User who created the group
    pub created_by: Uuid,

    pub share_token: Option<String>,

    #[sqlx(try_from = "String")]
    pub link_access: LinkAccess,

    pub created_at: DateTime<Utc>,
}

/// Input for creating a group from a selection of tasks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTaskGroup {
    pub name: String,

    pub created_by: Uuid,

    /// Tasks to put in the group; all must belong to `created_by`
    pub task_ids: Vec<Uuid>,
}

impl CreateTaskGroup {
    /// Task ids without duplicates, first occurrence wins
    pub fn unique_task_ids(&self) -> Vec<Uuid> {
        let mut seen = Vec::with_capacity(self.task_ids.len());
        for id in &self.task_ids {
            if !seen.contains(id) {
                seen.push(*id);
            }
        }
        seen
    }
}

impl TaskGroup {
    /// Whether `task_id` is a member of the group
    pub fn contains(&self, task_id: Uuid) -> bool {
        self.task_ids.contains(&task_id)
    }

    /// Creates a group and tags each of its tasks, atomically
    ///
    /// # Errors
    ///
    /// `StoreError::NotFound` if any task doesn't exist or belongs to someone
    /// else; nothing is written in that case.
    pub async fn create_with_tasks(
        pool: &PgPool,
        data: CreateTaskGroup,
    ) -> Result<Self, StoreError> {
        let task_ids = data.unique_task_ids();
        let mut tx = pool.begin().await?;

        let owned: Vec<(Uuid,)> = sqlx::query_as(
            "SELECT id FROM tasks WHERE id = ANY($1) AND owner_id = $2 FOR UPDATE",
        )
        .bind(&task_ids)
        .bind(data.created_by)
        .fetch_all(&mut *tx)
        .await?;

        if owned.len() != task_ids.len() {
            return Err(StoreError::NotFound("Task"));
        }

        for task_id in &task_ids {
            remove_from_current_group(&mut tx, *task_id).await?;
        }

        let group = sqlx::query_as::<_, TaskGroup>(
            r#"
            INSERT INTO task_groups (name, task_ids, created_by)
            VALUES ($1, $2, $3)
            RETURNING id, name, task_ids, created_by, share_token, link_access, created_at
            "#,
        )
        .bind(&data.name)
        .bind(&task_ids)
        .bind(data.created_by)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE tasks SET group_id = $1, updated_at = NOW() WHERE id = ANY($2)")
            .bind(group.id)
            .bind(&task_ids)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(group)
    }

    /// Lists the groups a user created, oldest first
    pub async fn list_by_creator(pool: &PgPool, created_by: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, TaskGroup>(
            r#"
            SELECT id, name, task_ids, created_by, share_token, link_access, created_at
            FROM task_groups
            WHERE created_by = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(created_by)
        .fetch_all(pool)
        .await
    }

    /// Finds a group by ID, scoped to its creator
    pub async fn find_by_id_and_creator(
        pool: &PgPool,
        id: Uuid,
        created_by: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, TaskGroup>(
            r#"
            SELECT id, name, task_ids, created_by, share_token, link_access, created_at
            FROM task_groups
            WHERE id = $1 AND created_by = $2
            "#,
        )
        .bind(id)
        .bind(created_by)
        .fetch_optional(pool)
        .await
    }

    /// Deletes a group
    ///
    /// Member tasks are kept; the foreign key clears their `group_id`. The
    /// member task rows are locked before the group row, the same order
    /// [`TaskGroup::link_task`] and `Task::delete` take them in.
    pub async fn delete(pool: &PgPool, id: Uuid, created_by: Uuid) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r#"
            SELECT id FROM tasks
            WHERE group_id = $1 AND owner_id = $2
            ORDER BY id
            FOR UPDATE
            "#,
        )
        .bind(id)
        .bind(created_by)
        .fetch_all(&mut *tx)
        .await?;

        let result = sqlx::query("DELETE FROM task_groups WHERE id = $1 AND created_by = $2")
            .bind(id)
            .bind(created_by)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    /// Puts a task into a group
    ///
    /// Idempotent: linking a member again changes nothing. A task moving from
    /// another group is removed from that group's membership.
    ///
    /// # Errors
    ///
    /// `StoreError::NotFound` if the task or the group isn't the user's.
    pub async fn link_task(
        pool: &PgPool,
        group_id: Uuid,
        task_id: Uuid,
        user_id: Uuid,
    ) -> Result<Self, StoreError> {
        let mut tx = pool.begin().await?;

        lock_owned_task(&mut tx, task_id, user_id).await?;
        lock_owned_group(&mut tx, group_id, user_id).await?;

        sqlx::query(
            r#"
            UPDATE task_groups
            SET task_ids = array_remove(task_ids, $1)
            WHERE $1 = ANY(task_ids) AND id <> $2
            "#,
        )
        .bind(task_id)
        .bind(group_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE tasks SET group_id = $1, updated_at = NOW() WHERE id = $2")
            .bind(group_id)
            .bind(task_id)
            .execute(&mut *tx)
            .await?;

        let group = sqlx::query_as::<_, TaskGroup>(
            r#"
            UPDATE task_groups
            SET task_ids = CASE
                WHEN $2 = ANY(task_ids) THEN task_ids
                ELSE array_append(task_ids, $2)
            END
            WHERE id = $1
            RETURNING id, name, task_ids, created_by, share_token, link_access, created_at
            "#,
        )
        .bind(group_id)
        .bind(task_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(group)
    }

    /// Takes a task out of a group
    ///
    /// # Errors
    ///
    /// `StoreError::NotFound` if the task or the group isn't the user's, or the
    /// task isn't a member of the group.
    pub async fn unlink_task(
        pool: &PgPool,
        group_id: Uuid,
        task_id: Uuid,
        user_id: Uuid,
    ) -> Result<Self, StoreError> {
        let mut tx = pool.begin().await?;

        let current_group = lock_owned_task(&mut tx, task_id, user_id).await?;
        lock_owned_group(&mut tx, group_id, user_id).await?;

        if current_group != Some(group_id) {
            return Err(StoreError::NotFound("Task"));
        }

        sqlx::query("UPDATE tasks SET group_id = NULL, updated_at = NOW() WHERE id = $1")
            .bind(task_id)
            .execute(&mut *tx)
            .await?;

        let group = sqlx::query_as::<_, TaskGroup>(
            r#"
            UPDATE task_groups
            SET task_ids = array_remove(task_ids, $2)
            WHERE id = $1
            RETURNING id, name, task_ids, created_by, share_token, link_access, created_at
            "#,
        )
        .bind(group_id)
        .bind(task_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(group)
    }
}

/// Locks the user's task and returns its current group
async fn lock_owned_task(
    conn: &mut PgConnection,
    task_id: Uuid,
    owner_id: Uuid,
) -> Result<Option<Uuid>, StoreError> {
    let row: Option<(Option<Uuid>,)> =
        sqlx::query_as("SELECT group_id FROM tasks WHERE id = $1 AND owner_id = $2 FOR UPDATE")
            .bind(task_id)
            .bind(owner_id)
            .fetch_optional(&mut *conn)
            .await?;

    row.map(|(group_id,)| group_id)
        .ok_or(StoreError::NotFound("Task"))
}

async fn lock_owned_group(
    conn: &mut PgConnection,
    group_id: Uuid,
    created_by: Uuid,
) -> Result<(), StoreError> {
    let row: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM task_groups WHERE id = $1 AND created_by = $2 FOR UPDATE")
            .bind(group_id)
            .bind(created_by)
            .fetch_optional(&mut *conn)
            .await?;

    row.map(|_| ()).ok_or(StoreError::NotFound("Group"))
}

async fn remove_from_current_group(conn: &mut PgConnection, task_id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE task_groups SET task_ids = array_remove(task_ids, $1) WHERE $1 = ANY(task_ids)")
        .bind(task_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}
