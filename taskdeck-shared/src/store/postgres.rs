/// PostgreSQL-backed store
///
/// Delegates to the model queries. Each call goes through
/// [`Database::pool`], so the first request connects and a failed connection
/// is retried by the next one.

use async_trait::async_trait;
use uuid::Uuid;

use super::{Store, StoreResult};
use crate::db::{pool, Database};
use crate::models::task::{CreateTask, Task, UpdateTask};
use crate::models::task_group::{CreateTaskGroup, TaskGroup};
use crate::models::user::{CreateUser, UpdateProfile, User};

/// Store over the lazily connected PostgreSQL pool
pub struct PgStore {
    database: Database,
}

impl PgStore {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    /// The underlying database handle
    pub fn database(&self) -> &Database {
        &self.database
    }
}

#[async_trait]
impl Store for PgStore {
    fn name(&self) -> &str {
        "postgres"
    }

    async fn ping(&self) -> StoreResult<()> {
        let pool = self.database.pool().await?;
        pool::health_check(pool).await?;
        Ok(())
    }

    async fn create_user(&self, data: CreateUser) -> StoreResult<User> {
        let pool = self.database.pool().await?;
        Ok(User::create(pool, data).await?)
    }

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let pool = self.database.pool().await?;
        Ok(User::find_by_id(pool, id).await?)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let pool = self.database.pool().await?;
        Ok(User::find_by_email(pool, email).await?)
    }

    async fn update_profile(&self, id: Uuid, data: UpdateProfile) -> StoreResult<Option<User>> {
        let pool = self.database.pool().await?;
        Ok(User::update_profile(pool, id, data).await?)
    }

    async fn set_avatar_url(
        &self,
        id: Uuid,
        avatar_url: Option<String>,
    ) -> StoreResult<Option<User>> {
        let pool = self.database.pool().await?;
        Ok(User::set_avatar_url(pool, id, avatar_url).await?)
    }

    async fn create_task(&self, data: CreateTask) -> StoreResult<Task> {
        let pool = self.database.pool().await?;
        Ok(Task::create(pool, data).await?)
    }

    async fn list_tasks(&self, owner_id: Uuid) -> StoreResult<Vec<Task>> {
        let pool = self.database.pool().await?;
        Ok(Task::list_by_owner(pool, owner_id).await?)
    }

    async fn list_tasks_by_ids(&self, owner_id: Uuid, ids: &[Uuid]) -> StoreResult<Vec<Task>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let pool = self.database.pool().await?;
        Ok(Task::list_by_ids(pool, owner_id, ids).await?)
    }

    async fn find_task(&self, id: Uuid, owner_id: Uuid) -> StoreResult<Option<Task>> {
        let pool = self.database.pool().await?;
        Ok(Task::find_by_id_and_owner(pool, id, owner_id).await?)
    }

    async fn update_task(
        &self,
        id: Uuid,
        owner_id: Uuid,
        data: UpdateTask,
    ) -> StoreResult<Option<Task>> {
        let pool = self.database.pool().await?;
        Ok(Task::update(pool, id, owner_id, data).await?)
    }

    async fn delete_task(&self, id: Uuid, owner_id: Uuid) -> StoreResult<bool> {
        let pool = self.database.pool().await?;
        Ok(Task::delete(pool, id, owner_id).await?)
    }

    async fn create_group(&self, data: CreateTaskGroup) -> StoreResult<TaskGroup> {
        let pool = self.database.pool().await?;
        TaskGroup::create_with_tasks(pool, data).await
    }

    async fn list_groups(&self, created_by: Uuid) -> StoreResult<Vec<TaskGroup>> {
        let pool = self.database.pool().await?;
        Ok(TaskGroup::list_by_creator(pool, created_by).await?)
    }

    async fn find_group(&self, id: Uuid, created_by: Uuid) -> StoreResult<Option<TaskGroup>> {
        let pool = self.database.pool().await?;
        Ok(TaskGroup::find_by_id_and_creator(pool, id, created_by).await?)
    }

    async fn delete_group(&self, id: Uuid, created_by: Uuid) -> StoreResult<bool> {
        let pool = self.database.pool().await?;
        Ok(TaskGroup::delete(pool, id, created_by).await?)
    }

    async fn link_task(
        &self,
        group_id: Uuid,
        task_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<TaskGroup> {
        let pool = self.database.pool().await?;
        TaskGroup::link_task(pool, group_id, task_id, user_id).await
    }

    async fn unlink_task(
        &self,
        group_id: Uuid,
        task_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<TaskGroup> {
        let pool = self.database.pool().await?;
        TaskGroup::unlink_task(pool, group_id, task_id, user_id).await
    }
}
