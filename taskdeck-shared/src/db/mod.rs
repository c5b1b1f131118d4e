/// Document store connector
///
/// The process owns one [`Database`]. The first caller of [`Database::pool`]
/// pays the connection cost (pool creation, health check, migrations); every
/// later caller reuses the same pool. Concurrent first callers wait on the
/// same initialisation instead of racing to connect.
///
/// A failed connection attempt is logged and returned to the caller, which
/// surfaces it as a 500. The cell stays empty, so the next request tries again.
///
/// # Modules
///
/// - `pool`: PostgreSQL pool construction, health checks, statistics
/// - `migrations`: Embedded SQL migrations
///
/// # Example
///
/// ```no_run
/// use taskdeck_shared::db::{pool::DatabaseConfig, Database};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let database = Database::new(DatabaseConfig {
///     url: std::env::var("DATABASE_URL")?,
///     ..Default::default()
/// });
///
/// let pool = database.pool().await?;
/// sqlx::query("SELECT 1").execute(pool).await?;
/// # Ok(())
/// # }
/// ```

pub mod migrations;
pub mod pool;

use sqlx::PgPool;
use tokio::sync::OnceCell;
use tracing::error;

use self::pool::DatabaseConfig;

/// Error raised while establishing the connection
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    /// Could not create the pool or the health check failed
    #[error("Failed to connect to database: {0}")]
    Connect(#[from] sqlx::Error),

    /// Pending migrations could not be applied
    #[error("Failed to run migrations: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

/// Lazily connected, process-wide database handle
pub struct Database {
    config: DatabaseConfig,
    pool: OnceCell<PgPool>,
}

impl Database {
    /// Creates a handle without connecting
    pub fn new(config: DatabaseConfig) -> Self {
        Self {
            config,
            pool: OnceCell::new(),
        }
    }

    /// Returns the pool, connecting on first use
    ///
    /// # Errors
    ///
    /// Returns `ConnectError` if the database is unreachable or migrations fail.
    pub async fn pool(&self) -> Result<&PgPool, ConnectError> {
        self.pool
            .get_or_try_init(|| async {
                let pool = pool::create_pool(&self.config).await?;
                if self.config.run_migrations {
                    migrations::run_migrations(&pool).await?;
                }
                Ok::<_, ConnectError>(pool)
            })
            .await
            .map_err(|e| {
                error!(error = %e, "Error connecting to database");
                e
            })
    }

    /// Whether a connection has been established
    pub fn is_connected(&self) -> bool {
        self.pool.initialized()
    }

    /// Closes the pool if it was ever opened
    pub async fn close(&self) {
        if let Some(pool) = self.pool.get() {
            pool::close_pool(pool).await;
        }
    }
}
