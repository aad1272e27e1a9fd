use std::fmt;

use chrono::Duration;

pub const MIN_SIGNING_KEY_LEN: usize = 32;

/// HMAC secret for bearer and join tokens. Never printed.
#[derive(Clone)]
pub struct SigningKey(Vec<u8>);

impl SigningKey {
    pub fn new(secret: impl Into<Vec<u8>>) -> Result<Self, ConfigError> {
        let bytes = secret.into();
        if bytes.len() < MIN_SIGNING_KEY_LEN {
            return Err(ConfigError::Invalid {
                name: "TOKEN_SIGNING_KEY",
                reason: format!("must be at least {} bytes", MIN_SIGNING_KEY_LEN),
            });
        }
        Ok(SigningKey(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningKey(<redacted>)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableNames {
    pub queue: String,
    pub matches: String,
    pub match_events: String,
    pub match_locks: String,
    pub rating_jobs: String,
}

impl Default for TableNames {
    fn default() -> Self {
        TableNames {
            queue: "matchmaking_queue".to_string(),
            matches: "matches".to_string(),
            match_events: "match_events".to_string(),
            match_locks: "match_locks".to_string(),
            rating_jobs: "rating_jobs".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub tables: TableNames,
    pub signing_key: SigningKey,
    pub key_grace_window: Duration,
    pub lock_ttl_ms: i64,
    pub lock_attempts: u32,
    pub lock_retry_delay: std::time::Duration,
    pub drift_tolerance_ms: i64,
    pub join_token_ttl: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid { name: &'static str, reason: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(name) => write!(f, "{} environment variable must be set", name),
            ConfigError::Invalid { name, reason } => write!(f, "Invalid {}: {}", name, reason),
        }
    }
}

impl std::error::Error for ConfigError {}

fn required<F>(lookup: &F, name: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::Missing(name))
}

fn number<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(name) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            name,
            reason: format!("'{}' is not a number", raw),
        }),
    }
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from any key/value source; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let tables = TableNames {
            queue: required(&lookup, "QUEUE_TABLE")?,
            matches: required(&lookup, "MATCHES_TABLE")?,
            match_events: required(&lookup, "MATCH_EVENTS_TABLE")?,
            match_locks: required(&lookup, "MATCH_LOCKS_TABLE")?,
            rating_jobs: required(&lookup, "RATING_JOBS_TABLE")?,
        };
        let signing_key = SigningKey::new(required(&lookup, "TOKEN_SIGNING_KEY")?)?;

        let grace_ms: i64 = number(&lookup, "KEY_GRACE_WINDOW_MS", 30_000)?;
        let lock_ttl_ms: i64 = number(&lookup, "LOCK_TTL_MS", 5_000)?;
        let lock_attempts: u32 = number(&lookup, "LOCK_ATTEMPTS", 20)?;
        let lock_retry_delay_ms: u64 = number(&lookup, "LOCK_RETRY_DELAY_MS", 25)?;
        let drift_tolerance_ms: i64 = number(&lookup, "DRIFT_TOLERANCE_MS", 250)?;
        let join_token_ttl_secs: i64 = number(&lookup, "JOIN_TOKEN_TTL_SECS", 600)?;

        if lock_ttl_ms <= 0 {
            return Err(ConfigError::Invalid {
                name: "LOCK_TTL_MS",
                reason: "must be positive".to_string(),
            });
        }
        if lock_attempts == 0 {
            return Err(ConfigError::Invalid {
                name: "LOCK_ATTEMPTS",
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(ServiceConfig {
            tables,
            signing_key,
            key_grace_window: Duration::milliseconds(grace_ms.max(0)),
            lock_ttl_ms,
            lock_attempts,
            lock_retry_delay: std::time::Duration::from_millis(lock_retry_delay_ms),
            drift_tolerance_ms: drift_tolerance_ms.max(0),
            join_token_ttl: Duration::seconds(join_token_ttl_secs.max(1)),
        })
    }

    /// Defaults with default table names, for in-memory runs and tests.
    pub fn local(signing_key: SigningKey) -> Self {
        ServiceConfig {
            tables: TableNames::default(),
            signing_key,
            key_grace_window: Duration::seconds(30),
            lock_ttl_ms: 5_000,
            lock_attempts: 20,
            lock_retry_delay: std::time::Duration::from_millis(25),
            drift_tolerance_ms: 250,
            join_token_ttl: Duration::minutes(10),
        }
    }
}
