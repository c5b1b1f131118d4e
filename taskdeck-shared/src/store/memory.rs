/// In-memory store for tests
///
/// Mirrors the PostgreSQL semantics: case-insensitive unique emails,
/// owner-scoped tasks and groups, set-like group membership kept in step with
/// `task.group_id`. Every call is counted, so tests can assert that a rejected
/// request never reached the store. [`MemoryStore::fail_from_operation`]
/// simulates the database going away part way through a request.
///
/// # Example
///
/// ```
/// use taskdeck_shared::store::{MemoryStore, Store};
/// use uuid::Uuid;
///
/// # #[tokio::main]
/// # async fn main() {
/// let store = MemoryStore::new();
/// assert!(store.list_tasks(Uuid::new_v4()).await.unwrap().is_empty());
/// assert_eq!(store.operations(), 1);
/// # }
/// ```

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Store, StoreError, StoreResult};
use crate::models::task::{CreateTask, Task, UpdateTask};
use crate::models::task_group::{CreateTaskGroup, LinkAccess, TaskGroup};
use crate::models::user::{CreateUser, UpdateProfile, User};

#[derive(Default)]
struct Collections {
    users: HashMap<Uuid, User>,
    /// Insertion order is creation order
    tasks: Vec<Task>,
    groups: Vec<TaskGroup>,
}

impl Collections {
    fn task_mut(&mut self, id: Uuid, owner_id: Uuid) -> Option<&mut Task> {
        self.tasks
            .iter_mut()
            .find(|t| t.id == id && t.owner_id == owner_id)
    }

    fn group_mut(&mut self, id: Uuid, created_by: Uuid) -> Option<&mut TaskGroup> {
        self.groups
            .iter_mut()
            .find(|g| g.id == id && g.created_by == created_by)
    }

    fn remove_from_groups(&mut self, task_id: Uuid) {
        for group in &mut self.groups {
            group.task_ids.retain(|id| *id != task_id);
        }
    }
}

/// Store backed by in-process collections
pub struct MemoryStore {
    collections: RwLock<Collections>,
    operations: AtomicUsize,
    /// Index of the first call that fails; `usize::MAX` never fails
    fail_from: AtomicUsize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            collections: RwLock::default(),
            operations: AtomicUsize::new(0),
            fail_from: AtomicUsize::new(usize::MAX),
        }
    }

    /// Number of store calls made so far
    pub fn operations(&self) -> usize {
        self.operations.load(Ordering::SeqCst)
    }

    /// Makes call number `operation` (counting from zero) and every later call
    /// fail with a database error
    pub fn fail_from_operation(&self, operation: usize) {
        self.fail_from.store(operation, Ordering::SeqCst);
    }

    /// Counts the call and applies any injected failure
    fn begin(&self) -> StoreResult<()> {
        let operation = self.operations.fetch_add(1, Ordering::SeqCst);
        if operation >= self.fail_from.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

#[async_trait]
impl Store for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn ping(&self) -> StoreResult<()> {
        self.begin()?;
        Ok(())
    }

    async fn create_user(&self, data: CreateUser) -> StoreResult<User> {
        self.begin()?;
        let mut collections = self.collections.write().await;

        let taken = collections
            .users
            .values()
            .any(|u| u.email.eq_ignore_ascii_case(&data.email));
        if taken {
            return Err(StoreError::Conflict(format!(
                "email {} already registered",
                data.email
            )));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: data.email,
            password_hash: data.password_hash,
            first_name: data.first_name,
            last_name: data.last_name,
            company: data.company,
            phone: data.phone,
            website: data.website,
            avatar_url: None,
            created_at: now,
            updated_at: now,
        };
        collections.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        self.begin()?;
        Ok(self.collections.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        self.begin()?;
        Ok(self
            .collections
            .read()
            .await
            .users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn update_profile(&self, id: Uuid, data: UpdateProfile) -> StoreResult<Option<User>> {
        self.begin()?;
        let mut collections = self.collections.write().await;
        Ok(collections.users.get_mut(&id).map(|user| {
            data.apply_to(user);
            user.updated_at = Utc::now();
            user.clone()
        }))
    }

    async fn set_avatar_url(
        &self,
        id: Uuid,
        avatar_url: Option<String>,
    ) -> StoreResult<Option<User>> {
        self.begin()?;
        let mut collections = self.collections.write().await;
        Ok(collections.users.get_mut(&id).map(|user| {
            user.avatar_url = avatar_url;
            user.updated_at = Utc::now();
            user.clone()
        }))
    }

    async fn create_task(&self, data: CreateTask) -> StoreResult<Task> {
        self.begin()?;
        let now = Utc::now();
        let task = Task {
            id: Uuid::new_v4(),
            title: data.title,
            description: data.description,
            completed: false,
            owner_id: data.owner_id,
            group_id: None,
            created_at: now,
            updated_at: now,
        };
        self.collections.write().await.tasks.push(task.clone());
        Ok(task)
    }

    async fn list_tasks(&self, owner_id: Uuid) -> StoreResult<Vec<Task>> {
        self.begin()?;
        Ok(self
            .collections
            .read()
            .await
            .tasks
            .iter()
            .filter(|t| t.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn list_tasks_by_ids(&self, owner_id: Uuid, ids: &[Uuid]) -> StoreResult<Vec<Task>> {
        self.begin()?;
        let collections = self.collections.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| {
                collections
                    .tasks
                    .iter()
                    .find(|t| t.id == *id && t.owner_id == owner_id)
                    .cloned()
            })
            .collect())
    }

    async fn find_task(&self, id: Uuid, owner_id: Uuid) -> StoreResult<Option<Task>> {
        self.begin()?;
        Ok(self
            .collections
            .read()
            .await
            .tasks
            .iter()
            .find(|t| t.id == id && t.owner_id == owner_id)
            .cloned())
    }

    async fn update_task(
        &self,
        id: Uuid,
        owner_id: Uuid,
        data: UpdateTask,
    ) -> StoreResult<Option<Task>> {
        self.begin()?;
        let mut collections = self.collections.write().await;
        Ok(collections.task_mut(id, owner_id).map(|task| {
            data.apply_to(task);
            task.updated_at = Utc::now();
            task.clone()
        }))
    }

    async fn delete_task(&self, id: Uuid, owner_id: Uuid) -> StoreResult<bool> {
        self.begin()?;
        let mut collections = self.collections.write().await;
        let before = collections.tasks.len();
        collections
            .tasks
            .retain(|t| !(t.id == id && t.owner_id == owner_id));

        if collections.tasks.len() == before {
            return Ok(false);
        }
        collections.remove_from_groups(id);
        Ok(true)
    }

    async fn create_group(&self, data: CreateTaskGroup) -> StoreResult<TaskGroup> {
        self.begin()?;
        let task_ids = data.unique_task_ids();
        let mut collections = self.collections.write().await;

        let all_owned = task_ids.iter().all(|id| {
            collections
                .tasks
                .iter()
                .any(|t| t.id == *id && t.owner_id == data.created_by)
        });
        if !all_owned {
            return Err(StoreError::NotFound("Task"));
        }

        let group = TaskGroup {
            id: Uuid::new_v4(),
            name: data.name,
            task_ids: task_ids.clone(),
            created_by: data.created_by,
            share_token: None,
            link_access: LinkAccess::Off,
            created_at: Utc::now(),
        };

        let now = Utc::now();
        for task_id in &task_ids {
            collections.remove_from_groups(*task_id);
            if let Some(task) = collections.task_mut(*task_id, data.created_by) {
                task.group_id = Some(group.id);
                task.updated_at = now;
            }
        }
        collections.groups.push(group.clone());
        Ok(group)
    }

    async fn list_groups(&self, created_by: Uuid) -> StoreResult<Vec<TaskGroup>> {
        self.begin()?;
        Ok(self
            .collections
            .read()
            .await
            .groups
            .iter()
            .filter(|g| g.created_by == created_by)
            .cloned()
            .collect())
    }

    async fn find_group(&self, id: Uuid, created_by: Uuid) -> StoreResult<Option<TaskGroup>> {
        self.begin()?;
        Ok(self
            .collections
            .read()
            .await
            .groups
            .iter()
            .find(|g| g.id == id && g.created_by == created_by)
            .cloned())
    }

    async fn delete_group(&self, id: Uuid, created_by: Uuid) -> StoreResult<bool> {
        self.begin()?;
        let mut collections = self.collections.write().await;
        let before = collections.groups.len();
        collections
            .groups
            .retain(|g| !(g.id == id && g.created_by == created_by));

        if collections.groups.len() == before {
            return Ok(false);
        }
        for task in collections.tasks.iter_mut().filter(|t| t.group_id == Some(id)) {
            task.group_id = None;
        }
        Ok(true)
    }

    async fn link_task(
        &self,
        group_id: Uuid,
        task_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<TaskGroup> {
        self.begin()?;
        let mut collections = self.collections.write().await;

        if collections.task_mut(task_id, user_id).is_none() {
            return Err(StoreError::NotFound("Task"));
        }
        if collections.group_mut(group_id, user_id).is_none() {
            return Err(StoreError::NotFound("Group"));
        }

        for group in collections.groups.iter_mut().filter(|g| g.id != group_id) {
            group.task_ids.retain(|id| *id != task_id);
        }
        if let Some(task) = collections.task_mut(task_id, user_id) {
            if task.group_id != Some(group_id) {
                task.group_id = Some(group_id);
                task.updated_at = Utc::now();
            }
        }

        let group = collections
            .group_mut(group_id, user_id)
            .ok_or(StoreError::NotFound("Group"))?;
        if !group.contains(task_id) {
            group.task_ids.push(task_id);
        }
        Ok(group.clone())
    }

    async fn unlink_task(
        &self,
        group_id: Uuid,
        task_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<TaskGroup> {
        self.begin()?;
        let mut collections = self.collections.write().await;

        let current_group = collections
            .task_mut(task_id, user_id)
            .ok_or(StoreError::NotFound("Task"))?
            .group_id;
        if collections.group_mut(group_id, user_id).is_none() {
            return Err(StoreError::NotFound("Group"));
        }
        if current_group != Some(group_id) {
            return Err(StoreError::NotFound("Task"));
        }

        if let Some(task) = collections.task_mut(task_id, user_id) {
            task.group_id = None;
            task.updated_at = Utc::now();
        }

        let group = collections
            .group_mut(group_id, user_id)
            .ok_or(StoreError::NotFound("Group"))?;
        group.task_ids.retain(|id| *id != task_id);
        Ok(group.clone())
    }
}
