/// Configuration management for the API server
///
/// Loads configuration from environment variables (a `.env` file is honored
/// in development) into typed structs, validating required values at
/// startup so misconfiguration fails fast instead of surfacing mid-request.
///
/// # Environment Variables
///
/// - `API_HOST`: bind host (default: 0.0.0.0)
/// - `API_PORT`: bind port (default: 3000)
/// - `API_CORS_ORIGINS`: comma-separated allowed origins (default: `*`)
/// - `APP_ENV`: `production` enables secure cookies and degraded cache
///   startup (default: development)
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: 10)
/// - `DATABASE_CONNECT_ATTEMPTS`: startup attempts before fatal (default: 5)
/// - `DATABASE_RETRY_DELAY_SECS`: delay between attempts (default: 5)
/// - `REDIS_URL`: cache URL (optional; absent means no cache)
/// - `REDIS_REQUIRED`: `true` makes an unreachable cache fatal (default: false)
/// - `JWT_SECRET`: HS256 signing secret, at least 32 bytes (required)
/// - `JWT_EXPIRE_HOURS`: token lifetime (default: 24)
/// - `RUST_LOG`: log filter (default: info)

use serde::{Deserialize, Serialize};
use std::env;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub jwt: JwtConfig,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// Allowed CORS origins; `*` means permissive (development)
    pub cors_origins: Vec<String>,

    /// Whether the process runs in production mode
    pub production: bool,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,

    /// Startup connection attempts before giving up
    pub connect_attempts: u32,

    /// Delay between startup attempts, in seconds
    pub retry_delay_secs: u64,
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Connection URL; `None` runs the service without a cache
    pub url: Option<String>,

    /// When true, an unreachable cache aborts startup
    pub required: bool,
}

/// JWT configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// Signing secret; must be at least 32 bytes.
    /// Generate with: `openssl rand -hex 32`
    pub secret: String,

    /// Token lifetime in hours
    pub expire_hours: i64,
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or malformed, or
    /// if the JWT secret is shorter than 32 bytes.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let host = env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("API_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()?;

        let cors_origins = env::var("API_CORS_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let production = env::var("APP_ENV")
            .map(|e| e == "production")
            .unwrap_or(false);

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse::<u32>()?;

        let connect_attempts = env::var("DATABASE_CONNECT_ATTEMPTS")
            .unwrap_or_else(|_| "5".to_string())
            .parse::<u32>()?;

        let retry_delay_secs = env::var("DATABASE_RETRY_DELAY_SECS")
            .unwrap_or_else(|_| "5".to_string())
            .parse::<u64>()?;

        let redis_url = env::var("REDIS_URL").ok();
        let redis_required = env::var("REDIS_REQUIRED")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;

        if jwt_secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 characters long");
        }

        let expire_hours = env::var("JWT_EXPIRE_HOURS")
            .unwrap_or_else(|_| "24".to_string())
            .parse::<i64>()?;

        Ok(Self {
            api: ApiConfig {
                host,
                port,
                cors_origins,
                production,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections,
                connect_attempts,
                retry_delay_secs,
            },
            redis: RedisConfig {
                url: redis_url,
                required: redis_required,
            },
            jwt: JwtConfig {
                secret: jwt_secret,
                expire_hours,
            },
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> Config {
        Config {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
                cors_origins: vec!["*".to_string()],
                production: false,
            },
            database: DatabaseConfig {
                url: "postgresql://localhost/taskforge_test".to_string(),
                max_connections: 10,
                connect_attempts: 5,
                retry_delay_secs: 5,
            },
            redis: RedisConfig {
                url: None,
                required: false,
            },
            jwt: JwtConfig {
                secret: "test-secret-key-at-least-32-bytes-long".to_string(),
                expire_hours: 24,
            },
        }
    }

    #[test]
    fn test_bind_address() {
        let config = sample_config();
        assert_eq!(config.bind_address(), "127.0.0.1:3000");
    }

    #[test]
    fn test_defaults() {
        let config = sample_config();
        assert!(!config.api.production);
        assert!(!config.redis.required);
        assert_eq!(config.jwt.expire_hours, 24);
    }
}
