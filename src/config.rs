use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_hours: i64,
}

/// Argon2 cost parameters. Memory is in KiB.
#[derive(Debug, Clone, Copy)]
pub struct PasswordCost {
    pub m_cost: u32,
    pub t_cost: u32,
    pub p_cost: u32,
}

impl Default for PasswordCost {
    fn default() -> Self {
        Self {
            m_cost: 19 * 1024,
            t_cost: 2,
            p_cost: 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub store_timeout: Duration,
    pub session_sweep_interval: Duration,
    pub jwt: JwtConfig,
    pub password: PasswordCost,
    pub host: String,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = required("DATABASE_URL")?;
        let secret = required("JWT_SECRET")?;

        let jwt = JwtConfig {
            secret,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "todolist".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "todolist-users".into()),
            ttl_hours: checked_ttl_hours(parsed_or("JWT_TTL_HOURS", 72)?)?,
        };

        let defaults = PasswordCost::default();
        let password = PasswordCost {
            m_cost: parsed_or("ARGON2_M_COST", defaults.m_cost)?,
            t_cost: parsed_or("ARGON2_T_COST", defaults.t_cost)?,
            p_cost: parsed_or("ARGON2_P_COST", defaults.p_cost)?,
        };

        Ok(Self {
            database_url,
            db_max_connections: parsed_or("DB_MAX_CONNECTIONS", 10)?,
            store_timeout: Duration::from_secs(positive_secs("STORE_TIMEOUT_SECS", 10)?),
            session_sweep_interval: Duration::from_secs(positive_secs("SESSION_SWEEP_SECS", 3600)?),
            jwt,
            password,
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: parsed_or("APP_PORT", 8080)?,
        })
    }
}

/// Reads a variable that must be present and non-blank.
fn required(key: &'static str) -> Result<String, ConfigError> {
    match std::env::var(key) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::Missing(key)),
    }
}

fn parsed_or<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
            key,
            reason: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

/// Longest accepted token lifetime: one year.
pub const MAX_TTL_HOURS: i64 = 24 * 366;

fn checked_ttl_hours(hours: i64) -> Result<i64, ConfigError> {
    if !(1..=MAX_TTL_HOURS).contains(&hours) {
        return Err(ConfigError::Invalid {
            key: "JWT_TTL_HOURS",
            reason: format!("must be between 1 and {MAX_TTL_HOURS}"),
        });
    }
    Ok(hours)
}

fn positive_secs(key: &'static str, default: u64) -> Result<u64, ConfigError> {
    match parsed_or(key, default)? {
        0 => Err(ConfigError::Invalid {
            key,
            reason: "must be at least 1".into(),
        }),
        secs => Ok(secs),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parsed_or_falls_back_when_unset() {
        let v: u64 = parsed_or("TODOLIST_TEST_SURELY_UNSET", 42).unwrap();
        assert_eq!(v, 42);
    }

    #[test]
    fn parsed_or_rejects_garbage() {
        std::env::set_var("TODOLIST_TEST_BAD_NUMBER", "ten");
        let err = parsed_or::<u64>("TODOLIST_TEST_BAD_NUMBER", 1).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "TODOLIST_TEST_BAD_NUMBER", .. }));
    }

    #[test]
    fn required_treats_blank_as_missing() {
        std::env::set_var("TODOLIST_TEST_BLANK_SECRET", "   ");
        let err = required("TODOLIST_TEST_BLANK_SECRET").unwrap_err();
        assert!(matches!(err, ConfigError::Missing("TODOLIST_TEST_BLANK_SECRET")));
    }

    #[test]
    fn zero_durations_are_rejected() {
        std::env::set_var("TODOLIST_TEST_ZERO_SECS", "0");
        let err = positive_secs("TODOLIST_TEST_ZERO_SECS", 5).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "TODOLIST_TEST_ZERO_SECS", .. }));
        assert_eq!(positive_secs("TODOLIST_TEST_SURELY_UNSET_SECS", 5).unwrap(), 5);
    }

    #[test]
    fn ttl_hours_must_be_in_range() {
        assert_eq!(checked_ttl_hours(72).unwrap(), 72);
        assert_eq!(checked_ttl_hours(MAX_TTL_HOURS).unwrap(), MAX_TTL_HOURS);
        for bad in [0, -1, MAX_TTL_HOURS + 1, 100_000_000, i64::MAX] {
            let err = checked_ttl_hours(bad).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid { key: "JWT_TTL_HOURS", .. }));
        }
    }
}
