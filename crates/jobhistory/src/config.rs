use std::path::PathBuf;
use std::time::Duration;

use crate::jobs::logs::DEFAULT_LOG_TAIL_LINES;

const MAX_LOG_TAIL_LINES: usize = 10_000;

// Config is a central place for runtime configuration.
// It loads values from environment variables (and `.env` when present).
#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub api_addr: Option<String>,
    pub migrate_on_startup: bool,
    pub log_root: Option<PathBuf>,
    pub log_tail_lines: usize,
    pub query_timeout: Option<Duration>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL is missing"))?;

        let api_addr = match env_or_fallback("JOBHIST_API_ADDR", "API_ADDR") {
            Some(v) => normalize_optional_addr(&v),
            None => Some("127.0.0.1:8080".to_string()),
        };

        let migrate_on_startup = env_bool("JOBHIST_MIGRATE_ON_STARTUP").unwrap_or(false);

        let log_root = env_or_fallback("JOBHIST_LOG_ROOT", "LOG_ROOT").map(PathBuf::from);

        let log_tail_lines = parse_tail_lines(env_or_fallback(
            "JOBHIST_LOG_TAIL_LINES",
            "LOG_TAIL_LINES",
        ));

        let query_timeout = parse_timeout_ms(env_or_fallback(
            "JOBHIST_QUERY_TIMEOUT_MS",
            "QUERY_TIMEOUT_MS",
        ));

        Ok(Self {
            database_url,
            api_addr,
            migrate_on_startup,
            log_root,
            log_tail_lines,
            query_timeout,
        })
    }
}

fn env_or_fallback(primary: &str, fallback: &str) -> Option<String> {
    std::env::var(primary)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .or_else(|| std::env::var(fallback).ok().filter(|s| !s.trim().is_empty()))
}

fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
}

fn normalize_optional_addr(value: &str) -> Option<String> {
    let v = value.trim();
    if v.is_empty() {
        return None;
    }
    if matches!(v.to_lowercase().as_str(), "0" | "off" | "false" | "none") {
        return None;
    }
    Some(v.to_string())
}

fn parse_tail_lines(value: Option<String>) -> usize {
    value
        .and_then(|s| s.trim().parse::<usize>().ok())
        .unwrap_or(DEFAULT_LOG_TAIL_LINES)
        .clamp(1, MAX_LOG_TAIL_LINES)
}

// 0 disables the timeout
fn parse_timeout_ms(value: Option<String>) -> Option<Duration> {
    let ms = value
        .and_then(|s| s.trim().parse::<u64>().ok())
        .unwrap_or(10_000);
    (ms > 0).then(|| Duration::from_millis(ms))
}
