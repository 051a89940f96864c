use std::{env, fmt, str::FromStr, time::Duration};

/// Fallback signing secret for local development only. Production refuses to start without `JWT_SECRET`.
const LOCAL_JWT_SECRET: &str = "local-development-jwt-secret-change-me";
const LOCAL_DATABASE_URL: &str = "sqlite://blog.db?mode=rwc";
/// 24 hours.
const DEFAULT_TOKEN_TTL_SECS: u64 = 24 * 60 * 60;
const DEFAULT_PORT: u16 = 3000;

/// AppConfig
///
/// Process-wide configuration, read once at startup and shared immutably
/// through the application state. The signing secret and token ttl are handed
/// to the token issuer/validator constructors from here; nothing else reads them.
#[derive(Clone)]
pub struct AppConfig {
    pub env: Env,
    pub db_url: String,
    pub jwt_secret: String,
    pub token_ttl: Duration,
    pub port: u16,
    /// Insert sample users and posts when the user table is empty.
    pub seed_sample_data: bool,
}

/// Env
///
/// Runtime context. Selects log format, defaults and which settings are mandatory.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Env {
    Local,
    Production,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set in production")]
    Missing(&'static str),
    #[error("{name} has an invalid value: {value:?}")]
    Invalid { name: &'static str, value: String },
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("db_url", &self.db_url)
            .field("jwt_secret", &"<redacted>")
            .field("token_ttl", &self.token_ttl)
            .field("port", &self.port)
            .field("seed_sample_data", &self.seed_sample_data)
            .finish()
    }
}

impl Default for AppConfig {
    /// Non-panicking configuration for tests: in-memory database, fixed secret, no seeding.
    fn default() -> Self {
        Self {
            env: Env::Local,
            db_url: "sqlite::memory:".to_string(),
            jwt_secret: LOCAL_JWT_SECRET.to_string(),
            token_ttl: Duration::from_secs(DEFAULT_TOKEN_TTL_SECS),
            port: DEFAULT_PORT,
            seed_sample_data: false,
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables. Local runs fall back
    /// to development defaults; production requires `DATABASE_URL` and
    /// `JWT_SECRET` and fails fast without them.
    pub fn load() -> Result<Self, ConfigError> {
        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };

        let jwt_secret = required_in_production("JWT_SECRET", env, LOCAL_JWT_SECRET)?;
        let db_url = required_in_production("DATABASE_URL", env, LOCAL_DATABASE_URL)?;
        let token_ttl = Duration::from_secs(parse_var("JWT_TTL_SECS", DEFAULT_TOKEN_TTL_SECS)?);
        let port = parse_var("PORT", DEFAULT_PORT)?;
        let seed_sample_data = parse_var("SEED_SAMPLE_DATA", env == Env::Local)?;

        Ok(Self {
            env,
            db_url,
            jwt_secret,
            token_ttl,
            port,
            seed_sample_data,
        })
    }
}

fn required_in_production(
    name: &'static str,
    env: Env,
    local_default: &str,
) -> Result<String, ConfigError> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ if env == Env::Production => Err(ConfigError::Missing(name)),
        _ => Ok(local_default.to_string()),
    }
}

fn parse_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        Err(_) => Ok(default),
    }
}
