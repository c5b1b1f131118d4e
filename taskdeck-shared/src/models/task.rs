/// Task model and database operations
///
/// Every query is scoped by `owner_id`: a task belonging to another user is
/// indistinguishable from a task that doesn't exist.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     owner_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     group_id UUID REFERENCES task_groups(id) ON DELETE SET NULL,
///     title VARCHAR(200) NOT NULL,
///     description TEXT NOT NULL DEFAULT '',
///     completed BOOLEAN NOT NULL DEFAULT FALSE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use taskdeck_shared::models::task::{Task, CreateTask};
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, owner_id: Uuid) -> Result<(), sqlx::Error> {
/// let task = Task::create(&pool, CreateTask {
///     owner_id,
///     title: "Write report".to_string(),
///     description: String::new(),
/// }).await?;
///
/// let mine = Task::list_by_owner(&pool, owner_id).await?;
/// assert!(mine.iter().any(|t| t.id == task.id));
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Task owned by a single user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    pub id: Uuid,

    pub title: String,

    pub description: String,

    pub completed: bool,

    /// User who created the task
    pub owner_id: Uuid,

    /// Group the task currently belongs to
    pub group_id: Option<Uuid>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTask {
    pub owner_id: Uuid,
    pub title: String,
    pub description: String,
}

/// Input for updating a task
///
/// Only `Some` fields are written.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTask {
    pub title: Option<String>,
    pub description: Option<String>,
    pub completed: Option<bool>,
}

impl UpdateTask {
    /// Whether no field would change
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.completed.is_none()
    }

    /// Applies the provided fields to `task`
    pub fn apply_to(self, task: &mut Task) {
        if let Some(title) = self.title {
            task.title = title;
        }
        if let Some(description) = self.description {
            task.description = description;
        }
        if let Some(completed) = self.completed {
            task.completed = completed;
        }
    }
}

impl Task {
    /// Creates a new task outside of any group
    pub async fn create(pool: &PgPool, data: CreateTask) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Task>(
            r#"
            INSERT INTO tasks (owner_id, title, description)
            VALUES ($1, $2, $3)
            RETURNING id, title, description, completed, owner_id, group_id, created_at, updated_at
            "#,
        )
        .bind(data.owner_id)
        .bind(data.title)
        .bind(data.description)
        .fetch_one(pool)
        .await
    }

    /// Lists all tasks of an owner, oldest first
    pub async fn list_by_owner(pool: &PgPool, owner_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(
            r#"
            SELECT id, title, description, completed, owner_id, group_id, created_at, updated_at
            FROM tasks
            WHERE owner_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(owner_id)
        .fetch_all(pool)
        .await
    }

    /// Fetches the owner's tasks among `ids`, in the order of `ids`
    ///
    /// Ids that don't exist or belong to someone else are skipped.
    pub async fn list_by_ids(
        pool: &PgPool,
        owner_id: Uuid,
        ids: &[Uuid],
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(
            r#"
            SELECT t.id, t.title, t.description, t.completed, t.owner_id, t.group_id,
                   t.created_at, t.updated_at
            FROM unnest($2::UUID[]) WITH ORDINALITY AS wanted(id, position)
            JOIN tasks t ON t.id = wanted.id
            WHERE t.owner_id = $1
            ORDER BY wanted.position
            "#,
        )
        .bind(owner_id)
        .bind(ids)
        .fetch_all(pool)
        .await
    }

    /// Finds a task by ID with owner isolation
    pub async fn find_by_id_and_owner(
        pool: &PgPool,
        id: Uuid,
        owner_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(
            r#"
            SELECT id, title, description, completed, owner_id, group_id, created_at, updated_at
            FROM tasks
            WHERE id = $1 AND owner_id = $2
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .fetch_optional(pool)
        .await
    }

    /// Updates title, description, or completion
    ///
    /// Returns `None` if the task doesn't exist for this owner.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        owner_id: Uuid,
        data: UpdateTask,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(
            r#"
            UPDATE tasks
            SET title = COALESCE($3, title),
                description = COALESCE($4, description),
                completed = COALESCE($5, completed),
                updated_at = NOW()
            WHERE id = $1 AND owner_id = $2
            RETURNING id, title, description, completed, owner_id, group_id, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .bind(data.title)
        .bind(data.description)
        .bind(data.completed)
        .fetch_optional(pool)
        .await
    }

    /// Deletes a task and drops it from its group's membership
    ///
    /// Both changes happen in one statement. Returns false if there was no
    /// such task for this owner.
    pub async fn delete(pool: &PgPool, id: Uuid, owner_id: Uuid) -> Result<bool, sqlx::Error> {
        let (deleted,): (i64,) = sqlx::query_as(
            r#"
            WITH deleted AS (
                DELETE FROM tasks
                WHERE id = $1 AND owner_id = $2
                RETURNING id, group_id
            ),
            unlinked AS (
                UPDATE task_groups g
                SET task_ids = array_remove(g.task_ids, deleted.id)
                FROM deleted
                WHERE g.id = deleted.group_id
                RETURNING g.id
            )
            SELECT COUNT(*) FROM deleted
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .fetch_one(pool)
        .await?;

        Ok(deleted > 0)
    }
}
