/// Store abstraction over the users, tasks, and task group collections
///
/// Routes never touch SQL directly; they go through [`Store`], which has two
/// implementations:
///
/// - [`PgStore`]: PostgreSQL through the lazily connected [`Database`](crate::db::Database)
/// - [`MemoryStore`]: in-process maps, used by tests
///
/// Every task and group operation takes the requesting user's id and only
/// ever sees that user's records.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use taskdeck_shared::store::{MemoryStore, Store};
/// use taskdeck_shared::models::task::CreateTask;
/// use uuid::Uuid;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
/// let owner_id = Uuid::new_v4();
///
/// let task = store.create_task(CreateTask {
///     owner_id,
///     title: "T1".to_string(),
///     description: String::new(),
/// }).await?;
///
/// assert_eq!(store.list_tasks(owner_id).await?, vec![task]);
/// # Ok(())
/// # }
/// ```

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use uuid::Uuid;

use crate::db::ConnectError;
use crate::models::task::{CreateTask, Task, UpdateTask};
use crate::models::task_group::{CreateTaskGroup, TaskGroup};
use crate::models::user::{CreateUser, UpdateProfile, User};

/// Store error types
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Referenced record doesn't exist for this user
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Uniqueness constraint violated
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Could not reach the database
    #[error(transparent)]
    Unavailable(#[from] ConnectError),

    /// Query failed
    #[error("Database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                StoreError::Conflict(db_err.message().to_string())
            }
            _ => StoreError::Database(err),
        }
    }
}

/// Store result type alias
pub type StoreResult<T> = Result<T, StoreError>;

/// Access to the persisted collections
#[async_trait]
pub trait Store: Send + Sync {
    /// Short name for logs and the health endpoint
    fn name(&self) -> &str;

    /// Checks that the backing store is reachable
    async fn ping(&self) -> StoreResult<()>;

    /// Creates a user; `Conflict` if the email is taken (case-insensitive)
    async fn create_user(&self, data: CreateUser) -> StoreResult<User>;

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    async fn update_profile(&self, id: Uuid, data: UpdateProfile) -> StoreResult<Option<User>>;

    async fn set_avatar_url(&self, id: Uuid, avatar_url: Option<String>)
        -> StoreResult<Option<User>>;

    async fn create_task(&self, data: CreateTask) -> StoreResult<Task>;

    /// All tasks of an owner, oldest first
    async fn list_tasks(&self, owner_id: Uuid) -> StoreResult<Vec<Task>>;

    /// The owner's tasks among `ids`, in the order of `ids`
    async fn list_tasks_by_ids(&self, owner_id: Uuid, ids: &[Uuid]) -> StoreResult<Vec<Task>>;

    async fn find_task(&self, id: Uuid, owner_id: Uuid) -> StoreResult<Option<Task>>;

    async fn update_task(
        &self,
        id: Uuid,
        owner_id: Uuid,
        data: UpdateTask,
    ) -> StoreResult<Option<Task>>;

    /// Deletes a task and drops it from its group; false if there was none
    async fn delete_task(&self, id: Uuid, owner_id: Uuid) -> StoreResult<bool>;

    /// Creates a group and tags its tasks; `NotFound` if any task isn't the creator's
    async fn create_group(&self, data: CreateTaskGroup) -> StoreResult<TaskGroup>;

    async fn list_groups(&self, created_by: Uuid) -> StoreResult<Vec<TaskGroup>>;

    async fn find_group(&self, id: Uuid, created_by: Uuid) -> StoreResult<Option<TaskGroup>>;

    /// Deletes a group and untags its tasks; false if there was none
    async fn delete_group(&self, id: Uuid, created_by: Uuid) -> StoreResult<bool>;

    /// Puts a task into a group, moving it out of any other group
    async fn link_task(&self, group_id: Uuid, task_id: Uuid, user_id: Uuid)
        -> StoreResult<TaskGroup>;

    /// Takes a task out of a group
    async fn unlink_task(
        &self,
        group_id: Uuid,
        task_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<TaskGroup>;
}
