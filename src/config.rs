use anyhow::{Context, Result};
use std::{str::FromStr, time::Duration};

use crate::service::LinkPolicy;

/// Upper bound for `SESSION_DURATION_HOURS` (ten years).
pub const MAX_SESSION_DURATION_HOURS: u64 = 24 * 365 * 10;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Visit quota applied when a link is created without an explicit limit
    pub default_visit_limit: u32,

    /// Lifetime of every link, counted from creation
    pub default_ttl_minutes: u32,

    /// Seconds between two background expiry sweeps
    pub sweep_interval_seconds: u64,

    /// Prefix used to display short links, e.g. "clck.ru/".
    /// Always ends with a slash.
    pub display_domain: String,

    /// Host to bind the HTTP server to, e.g. "0.0.0.0"
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// How many hours an issued owner session token remains valid
    pub session_duration_hours: u64,
}

impl AppConfig {
    /// Load configuration from environment variables (populated by dotenvy before this is called).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from any key lookup, falling back to defaults
    /// for missing keys.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let default_visit_limit = positive(&lookup, "DEFAULT_VISIT_LIMIT", 5u32)?;
        let default_ttl_minutes = positive(&lookup, "DEFAULT_TTL_MINUTES", 1440u32)?;
        let sweep_interval_seconds = positive(&lookup, "SWEEP_INTERVAL_SECONDS", 60u64)?;
        let session_duration_hours = positive(&lookup, "SESSION_DURATION_HOURS", 24u64)?;
        if session_duration_hours > MAX_SESSION_DURATION_HOURS {
            anyhow::bail!(
                "SESSION_DURATION_HOURS must be at most {MAX_SESSION_DURATION_HOURS}, got {session_duration_hours}"
            );
        }

        let port = lookup("PORT")
            .unwrap_or_else(|| "3000".into())
            .trim()
            .parse::<u16>()
            .context("PORT must be a valid port number (1–65535)")?;

        let display_domain = lookup("DISPLAY_DOMAIN").unwrap_or_else(|| "clck.ru/".into());
        let display_domain = display_domain.trim().trim_end_matches('/');
        if display_domain.is_empty() {
            anyhow::bail!("DISPLAY_DOMAIN must not be empty");
        }

        Ok(Self {
            default_visit_limit,
            default_ttl_minutes,
            sweep_interval_seconds,
            display_domain: format!("{display_domain}/"),
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            session_duration_hours,
        })
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_seconds)
    }

    /// The subset of settings the link lifecycle engine needs.
    pub fn link_policy(&self) -> LinkPolicy {
        LinkPolicy {
            default_visit_limit: self.default_visit_limit,
            ttl: chrono::Duration::minutes(i64::from(self.default_ttl_minutes)),
            display_domain: self.display_domain.clone(),
        }
    }
}

/// Parse `key` as a strictly positive integer, or use `default` when unset.
fn positive<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr + PartialOrd + Default,
{
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };
    let value = raw
        .trim()
        .parse::<T>()
        .ok()
        .with_context(|| format!("{key} must be a positive integer, got '{raw}'"))?;
    if value <= T::default() {
        anyhow::bail!("{key} must be a positive integer, got '{raw}'");
    }
    Ok(value)
}
