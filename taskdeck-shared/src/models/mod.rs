/// Database models for TaskDeck
///
/// Each model owns its table and its SQL. Reads and writes of tasks and
/// groups are always scoped to the requesting user.
///
/// # Models
///
/// - `user`: Accounts, credentials and profile fields
/// - `task`: To-do items owned by one user
/// - `task_group`: Named collections of a user's tasks
///
/// # Example
///
/// ```no_run
/// use taskdeck_shared::models::user::{User, CreateUser};
/// use taskdeck_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(&DatabaseConfig::default()).await?;
///
/// let user = User::create(&pool, CreateUser {
///     email: "user@example.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     ..Default::default()
/// }).await?;
/// # Ok(())
/// # }
/// ```

pub mod task;
pub mod task_group;
pub mod user;
