/// Configuration management for the API server
///
/// Configuration comes from environment variables (a `.env` file is loaded
/// first when present), and a handful of command-line flags override them.
///
/// # Environment Variables
///
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT`: Port to bind to (default: 8080)
/// - `CORS_ORIGINS`: Comma-separated allowed origins (default: `*`)
/// - `JWT_SECRET`: Secret key for token signing (required, at least 32 chars)
/// - `JWT_TTL_SECONDS`: Token lifetime (default: 86400, at most ten years)
/// - `AUTH_ENABLED`: Mount the authentication gates (default: true)
/// - `ANONYMOUS_EMAIL`: Email embedded in anonymous tokens (default: test@example.com)
/// - `DATABASE_URL`: PostgreSQL connection string; in-memory store when unset
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `ARGON2_MEMORY_KIB`, `ARGON2_ITERATIONS`, `ARGON2_PARALLELISM`: hashing cost
/// - `RUST_LOG`: Log filter; `LOG_FORMAT=json` switches to JSON output
///
/// # Example
///
/// ```no_run
/// use bookvault_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use bookvault_shared::auth::{jwt::default_ttl, password::HashingConfig};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::{env, str::FromStr};

/// Minimum accepted length of `JWT_SECRET`
pub const MIN_SECRET_LEN: usize = 32;

/// Longest accepted `JWT_TTL_SECONDS` (ten years)
pub const MAX_TTL_SECONDS: i64 = 10 * 365 * 24 * 60 * 60;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// API server configuration
    pub api: ApiConfig,

    /// PostgreSQL settings; `None` selects the in-memory store
    pub database: Option<DatabaseConfig>,

    /// Token configuration
    pub jwt: JwtConfig,

    /// Authentication toggle
    pub auth: AuthConfig,

    /// Argon2 cost parameters
    pub hashing: HashingConfig,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Allowed CORS origins; `*` means permissive
    pub cors_origins: Vec<String>,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in pool
    pub max_connections: u32,
}

/// Token configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// Secret key for token signing
    ///
    /// Must be kept secret and should be at least 32 bytes.
    /// Generate with: `openssl rand -hex 32`
    pub secret: String,

    /// Token lifetime in seconds
    pub ttl_seconds: i64,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .field("ttl_seconds", &self.ttl_seconds)
            .finish()
    }
}

/// Authentication toggle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// When false no gate is mounted and every caller acts as the anonymous principal
    pub enabled: bool,

    /// Email placed in tokens issued to the anonymous principal
    pub anonymous_email: String,
}

/// Command-line flags
///
/// Each flag, when given, overrides the matching environment variable.
#[derive(Debug, Default, Parser)]
#[command(name = "bookvault-api")]
#[command(about = "BookVault API server", version)]
pub struct Cli {
    /// Host to bind to (overrides API_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides API_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Enable or disable authentication (overrides AUTH_ENABLED)
    #[arg(long)]
    pub auth: Option<bool>,
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `JWT_SECRET` is missing or shorter than 32 characters
    /// - A variable has a value that does not parse
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = lookup("JWT_SECRET")
            .ok_or_else(|| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;

        if jwt_secret.len() < MIN_SECRET_LEN {
            anyhow::bail!("JWT_SECRET must be at least {} characters long", MIN_SECRET_LEN);
        }

        let ttl_seconds: i64 = parse_or(&lookup, "JWT_TTL_SECONDS", 86_400)?;
        if ttl_seconds <= 0 {
            anyhow::bail!("JWT_TTL_SECONDS must be positive");
        }
        if ttl_seconds > MAX_TTL_SECONDS || chrono::Duration::try_seconds(ttl_seconds).is_none() {
            anyhow::bail!("JWT_TTL_SECONDS must be at most {}", MAX_TTL_SECONDS);
        }

        let cors_origins = lookup("CORS_ORIGINS")
            .unwrap_or_else(|| "*".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        let database = match lookup("DATABASE_URL").filter(|url| !url.is_empty()) {
            Some(url) => Some(DatabaseConfig {
                url,
                max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?,
            }),
            None => None,
        };

        let defaults = HashingConfig::default();

        Ok(Self {
            api: ApiConfig {
                host: lookup("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: parse_or(&lookup, "API_PORT", 8080)?,
                cors_origins,
            },
            database,
            jwt: JwtConfig {
                secret: jwt_secret,
                ttl_seconds,
            },
            auth: AuthConfig {
                enabled: match lookup("AUTH_ENABLED") {
                    Some(raw) => parse_bool("AUTH_ENABLED", &raw)?,
                    None => true,
                },
                anonymous_email: lookup("ANONYMOUS_EMAIL")
                    .unwrap_or_else(|| "test@example.com".to_string()),
            },
            hashing: HashingConfig {
                memory_kib: parse_or(&lookup, "ARGON2_MEMORY_KIB", defaults.memory_kib)?,
                iterations: parse_or(&lookup, "ARGON2_ITERATIONS", defaults.iterations)?,
                parallelism: parse_or(&lookup, "ARGON2_PARALLELISM", defaults.parallelism)?,
            },
        })
    }

    /// Applies command-line overrides
    pub fn with_overrides(mut self, cli: &Cli) -> Self {
        if let Some(host) = &cli.host {
            self.api.host = host.clone();
        }
        if let Some(port) = cli.port {
            self.api.port = port;
        }
        if let Some(enabled) = cli.auth {
            self.auth.enabled = enabled;
        }
        self
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    /// Token lifetime as a duration
    ///
    /// Falls back to the default lifetime if `ttl_seconds` was set out of range
    /// after loading.
    pub fn token_ttl(&self) -> chrono::Duration {
        chrono::Duration::try_seconds(self.jwt.ttl_seconds).unwrap_or_else(default_ttl)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("Invalid value for {}: {}", key, e)),
        None => Ok(default),
    }
}

fn parse_bool(key: &str, raw: &str) -> anyhow::Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("Invalid value for {}: {}", key, other),
    }
}
