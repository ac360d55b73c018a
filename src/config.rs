// config.rs
use std::env;
use std::time::Duration;

use crate::errors::{AppError, Result};

const DEFAULT_DATABASE_NAME: &str = "clashdb";
const DEFAULT_PORT: u16 = 10000;
const DEFAULT_SITE_BASE_URL: &str = "https://fanclash.app";
const DEFAULT_FEED_BASE_URL: &str = "https://v3.football.api-sports.io";
const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;
const MIN_POLL_INTERVAL_SECS: u64 = 5;
const DEFAULT_SHUTDOWN_GRACE_SECS: u64 = 10;
const DEFAULT_PUSH_CONCURRENCY: usize = 16;
pub const DEFAULT_VAPID_SUBJECT: &str = "mailto:alerts@fanclash.app";

// Secret variables: (primary, fallback)
pub const FEED_API_KEY_VARS: (&str, &str) = ("LIVE_FEED_API_KEY", "API_FOOTBALL_KEY");
pub const VAPID_PUBLIC_KEY_VARS: (&str, &str) = ("VAPID_PUBLIC_KEY", "WEBPUSH_PUBLIC_KEY");
pub const VAPID_PRIVATE_KEY_VARS: (&str, &str) = ("VAPID_PRIVATE_KEY", "WEBPUSH_PRIVATE_KEY");
pub const VAPID_SUBJECT_VARS: (&str, &str) = ("VAPID_SUBJECT", "WEBPUSH_SUBJECT");

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub database_name: String,
    pub port: u16,
    pub site_base_url: String,
    pub feed_base_url: String,
    pub poll_interval: Duration,
    pub shutdown_grace: Duration,
    pub push_concurrency: usize,
    pub run_once: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let database_url = non_empty_var("DATABASE_URL")
            .ok_or_else(|| AppError::configuration("DATABASE_URL must be set"))?;

        let poll_secs = parse_var("POLL_INTERVAL_SECONDS", DEFAULT_POLL_INTERVAL_SECS)
            .max(MIN_POLL_INTERVAL_SECS);

        Ok(AppConfig {
            database_url,
            database_name: non_empty_var("DATABASE_NAME")
                .unwrap_or_else(|| DEFAULT_DATABASE_NAME.to_string()),
            port: parse_var("PORT", DEFAULT_PORT),
            site_base_url: non_empty_var("SITE_BASE_URL")
                .unwrap_or_else(|| DEFAULT_SITE_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            feed_base_url: non_empty_var("LIVE_FEED_BASE_URL")
                .unwrap_or_else(|| DEFAULT_FEED_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            poll_interval: Duration::from_secs(poll_secs),
            shutdown_grace: Duration::from_secs(parse_var(
                "SHUTDOWN_GRACE_SECONDS",
                DEFAULT_SHUTDOWN_GRACE_SECS,
            )),
            push_concurrency: parse_var("PUSH_CONCURRENCY", DEFAULT_PUSH_CONCURRENCY).max(1),
            run_once: non_empty_var("RUN_ONCE")
                .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
                .unwrap_or(false),
        })
    }

    pub fn describe(&self) -> serde_json::Value {
        serde_json::json!({
            "database_name": self.database_name,
            "port": self.port,
            "site_base_url": self.site_base_url,
            "feed_base_url": self.feed_base_url,
            "poll_interval_secs": self.poll_interval.as_secs(),
            "shutdown_grace_secs": self.shutdown_grace.as_secs(),
            "push_concurrency": self.push_concurrency,
            "run_once": self.run_once,
        })
    }
}

/// VAPID signing material for the push channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VapidKeys {
    pub public_key: String,
    pub private_key: String,
    pub subject: String,
}

/// Secrets required to run one polling cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleSecrets {
    pub feed_api_key: String,
    pub vapid: VapidKeys,
}

/// Resolves cycle secrets. Called once per cycle so rotated values are picked
/// up without a restart. `None` means the deployment is not configured and the
/// cycle should be skipped.
pub trait SecretSource: Send + Sync {
    fn resolve(&self) -> Option<CycleSecrets>;
}

/// Reads secrets from the process environment.
#[derive(Debug, Default, Clone)]
pub struct EnvSecrets;

impl SecretSource for EnvSecrets {
    fn resolve(&self) -> Option<CycleSecrets> {
        secrets_from(|name| env::var(name).ok())
    }
}

/// Builds `CycleSecrets` from any variable lookup. Each value is read from its
/// primary name first, then from its fallback name.
pub fn secrets_from<F>(lookup: F) -> Option<CycleSecrets>
where
    F: Fn(&str) -> Option<String>,
{
    let read = |(primary, fallback): (&str, &str)| {
        clean(lookup(primary)).or_else(|| clean(lookup(fallback)))
    };

    let feed_api_key = read(FEED_API_KEY_VARS)?;
    let public_key = read(VAPID_PUBLIC_KEY_VARS)?;
    let private_key = read(VAPID_PRIVATE_KEY_VARS)?;
    let subject = read(VAPID_SUBJECT_VARS).unwrap_or_else(|| DEFAULT_VAPID_SUBJECT.to_string());

    Some(CycleSecrets {
        feed_api_key,
        vapid: VapidKeys {
            public_key,
            private_key,
            subject,
        },
    })
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn non_empty_var(name: &str) -> Option<String> {
    clean(env::var(name).ok())
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> T {
    match non_empty_var(name) {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!("{} has invalid value {:?}, using default", name, raw);
            default
        }),
        None => default,
    }
}
