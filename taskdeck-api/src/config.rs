/// Configuration management for the API server
///
/// This module loads configuration from environment variables (and a `.env`
/// file when present) into a type-safe configuration struct.
///
/// # Environment Variables
///
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `DATABASE_RUN_MIGRATIONS`: Apply migrations on first connect (default: true)
/// - `JWT_SECRET`: Secret key for token signing (required, at least 32 characters)
/// - `JWT_TTL_SECONDS`: Token and cookie lifetime (default: 3600, at most 30 days)
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT`: Port to bind to (default: 8080)
/// - `APP_ENV`: `production` turns on the `Secure` cookie flag and HSTS
/// - `CORS_ORIGINS`: Comma-separated allowed origins (default: `*`)
/// - `UPLOADS_DIR`: Where avatars are written (default: public/uploads)
/// - `STATIC_DIR`: Pre-built front-end files (default: public)
/// - `MAX_AVATAR_BYTES`: Avatar size limit (default: 5 MiB, at most 100 MiB)
/// - `RUST_LOG`: Log filter (default: taskdeck_api=debug,tower_http=debug)
///
/// # Example
///
/// ```no_run
/// use taskdeck_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use taskdeck_shared::auth::jwt::DEFAULT_TTL_SECONDS;
use taskdeck_shared::db::pool;

/// Default avatar size limit (5 MiB)
pub const DEFAULT_MAX_AVATAR_BYTES: usize = 5 * 1024 * 1024;

/// Largest accepted `MAX_AVATAR_BYTES` (100 MiB)
pub const MAX_AVATAR_BYTES_LIMIT: usize = 100 * 1024 * 1024;

/// Minimum accepted length of `JWT_SECRET`
pub const MIN_JWT_SECRET_LENGTH: usize = 32;

/// Longest accepted `JWT_TTL_SECONDS` (30 days)
pub const MAX_JWT_TTL_SECONDS: i64 = 30 * 24 * 60 * 60;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// API server configuration
    pub api: ApiConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// JWT configuration
    pub jwt: JwtConfig,

    /// File storage configuration
    pub storage: StorageConfig,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Whether running in production (`APP_ENV=production`)
    pub production: bool,

    /// Allowed CORS origins; `*` means any
    pub cors_origins: Vec<String>,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in pool
    pub max_connections: u32,

    /// Whether migrations run on first connect
    pub run_migrations: bool,
}

/// JWT configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// Secret key for JWT signing
    ///
    /// IMPORTANT: This must be kept secret and should be at least 32 bytes.
    /// Generate with: `openssl rand -hex 32`
    pub secret: String,

    /// Token lifetime, also used as the cookie `Max-Age`
    pub ttl_seconds: i64,
}

/// Static files and uploads
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory avatars are written to, served under `/uploads`
    pub uploads_dir: PathBuf,

    /// Directory of pre-built front-end files
    pub static_dir: PathBuf,

    /// Largest accepted avatar, in bytes
    pub max_avatar_bytes: usize,
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing
    /// - Environment variables have invalid values
    /// - `JWT_SECRET` is shorter than 32 characters
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        Self::from_vars(|key| env::var(key).ok())
    }

    /// Builds configuration from a variable lookup
    pub fn from_vars<F>(var: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_host = var("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let api_port = var("API_PORT")
            .unwrap_or_else(|| "8080".to_string())
            .parse::<u16>()?;

        let production = var("APP_ENV")
            .map(|v| v.eq_ignore_ascii_case("production"))
            .unwrap_or(false);

        let cors_origins = var("CORS_ORIGINS")
            .unwrap_or_else(|| "*".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        let database_url = var("DATABASE_URL")
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let max_connections = var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|| "10".to_string())
            .parse::<u32>()?;

        let run_migrations = var("DATABASE_RUN_MIGRATIONS")
            .unwrap_or_else(|| "true".to_string())
            .parse::<bool>()?;

        let jwt_secret = var("JWT_SECRET")
            .ok_or_else(|| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;

        if jwt_secret.chars().count() < MIN_JWT_SECRET_LENGTH {
            anyhow::bail!("JWT_SECRET must be at least 32 characters long");
        }

        let ttl_seconds = match var("JWT_TTL_SECONDS") {
            Some(v) => v.parse::<i64>()?,
            None => DEFAULT_TTL_SECONDS,
        };
        if !(1..=MAX_JWT_TTL_SECONDS).contains(&ttl_seconds) {
            anyhow::bail!(
                "JWT_TTL_SECONDS must be between 1 and {}",
                MAX_JWT_TTL_SECONDS
            );
        }

        let max_avatar_bytes = match var("MAX_AVATAR_BYTES") {
            Some(v) => v.parse::<usize>()?,
            None => DEFAULT_MAX_AVATAR_BYTES,
        };
        if max_avatar_bytes == 0 || max_avatar_bytes > MAX_AVATAR_BYTES_LIMIT {
            anyhow::bail!(
                "MAX_AVATAR_BYTES must be between 1 and {}",
                MAX_AVATAR_BYTES_LIMIT
            );
        }

        Ok(Self {
            api: ApiConfig {
                host: api_host,
                port: api_port,
                production,
                cors_origins,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections,
                run_migrations,
            },
            jwt: JwtConfig {
                secret: jwt_secret,
                ttl_seconds,
            },
            storage: StorageConfig {
                uploads_dir: PathBuf::from(
                    var("UPLOADS_DIR").unwrap_or_else(|| "public/uploads".to_string()),
                ),
                static_dir: PathBuf::from(var("STATIC_DIR").unwrap_or_else(|| "public".to_string())),
                max_avatar_bytes,
            },
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    /// Pool settings for the shared database connector
    pub fn pool_config(&self) -> pool::DatabaseConfig {
        pool::DatabaseConfig {
            url: self.database.url.clone(),
            max_connections: self.database.max_connections,
            run_migrations: self.database.run_migrations,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_vars(lookup(&[
            ("DATABASE_URL", "postgresql://localhost/test"),
            ("JWT_SECRET", SECRET),
        ]))
        .unwrap();

        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert!(!config.api.production);
        assert_eq!(config.api.cors_origins, vec!["*".to_string()]);
        assert_eq!(config.database.max_connections, 10);
        assert!(config.database.run_migrations);
        assert_eq!(config.jwt.ttl_seconds, 3600);
        assert_eq!(config.storage.uploads_dir, PathBuf::from("public/uploads"));
        assert_eq!(config.storage.static_dir, PathBuf::from("public"));
        assert_eq!(config.storage.max_avatar_bytes, DEFAULT_MAX_AVATAR_BYTES);
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_vars(lookup(&[
            ("DATABASE_URL", "postgresql://localhost/test"),
            ("JWT_SECRET", SECRET),
            ("API_HOST", "127.0.0.1"),
            ("API_PORT", "3000"),
            ("APP_ENV", "production"),
            ("CORS_ORIGINS", "https://a.example, https://b.example"),
            ("DATABASE_RUN_MIGRATIONS", "false"),
            ("JWT_TTL_SECONDS", "600"),
            ("MAX_AVATAR_BYTES", "1024"),
        ]))
        .unwrap();

        assert_eq!(config.bind_address(), "127.0.0.1:3000");
        assert!(config.api.production);
        assert_eq!(
            config.api.cors_origins,
            vec!["https://a.example".to_string(), "https://b.example".to_string()]
        );
        assert!(!config.pool_config().run_migrations);
        assert_eq!(config.jwt.ttl_seconds, 600);
        assert_eq!(config.storage.max_avatar_bytes, 1024);
    }

    #[test]
    fn test_required_and_invalid_values() {
        assert!(Config::from_vars(lookup(&[("JWT_SECRET", SECRET)])).is_err());
        assert!(Config::from_vars(lookup(&[("DATABASE_URL", "postgresql://localhost/test")])).is_err());
        assert!(Config::from_vars(lookup(&[
            ("DATABASE_URL", "postgresql://localhost/test"),
            ("JWT_SECRET", "short"),
        ]))
        .is_err());
        assert!(Config::from_vars(lookup(&[
            ("DATABASE_URL", "postgresql://localhost/test"),
            ("JWT_SECRET", SECRET),
            ("API_PORT", "not-a-port"),
        ]))
        .is_err());
    }

    #[test]
    fn test_ttl_bounds() {
        let with_ttl = |ttl: &str| {
            Config::from_vars(lookup(&[
                ("DATABASE_URL", "postgresql://localhost/test"),
                ("JWT_SECRET", SECRET),
                ("JWT_TTL_SECONDS", ttl),
            ]))
        };

        assert!(with_ttl("0").is_err());
        assert!(with_ttl("-5").is_err());
        assert!(with_ttl("9223372036854775807").is_err());
        assert!(with_ttl(&(MAX_JWT_TTL_SECONDS + 1).to_string()).is_err());
        assert_eq!(
            with_ttl(&MAX_JWT_TTL_SECONDS.to_string()).unwrap().jwt.ttl_seconds,
            MAX_JWT_TTL_SECONDS
        );
    }

    #[test]
    fn test_avatar_limit_bounds() {
        let with_limit = |bytes: &str| {
            Config::from_vars(lookup(&[
                ("DATABASE_URL", "postgresql://localhost/test"),
                ("JWT_SECRET", SECRET),
                ("MAX_AVATAR_BYTES", bytes),
            ]))
        };

        assert!(with_limit("0").is_err());
        assert!(with_limit(&usize::MAX.to_string()).is_err());
        assert!(with_limit(&(MAX_AVATAR_BYTES_LIMIT + 1).to_string()).is_err());
        assert_eq!(
            with_limit(&MAX_AVATAR_BYTES_LIMIT.to_string())
                .unwrap()
                .storage
                .max_avatar_bytes,
            MAX_AVATAR_BYTES_LIMIT
        );
    }
}
