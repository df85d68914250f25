//! Application configuration loaded from environment variables.

use std::str::FromStr;

use backoffice::{DEFAULT_MAX_DOCS, DEFAULT_MAX_STATUS_CORRECTIONS, DEFAULT_PAGE_SIZE};
use domain::Money;

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` bind address (default: `"0.0.0.0"`)
/// - `PORT` listen port (default: `3000`)
/// - `RUST_LOG` tracing filter directive (default: `"info"`)
/// - `DATABASE_URL` PostgreSQL connection string; unset runs on the
///   in-memory store
/// - `SHIPPING_FEE_CENTS` flat shipping fee per order (default: `0`)
/// - `MAX_STATUS_CORRECTIONS` status rewrites per order list load
///   (default: `20`)
/// - `REPORT_PAGE_SIZE` orders per report query page (default: `500`)
/// - `REPORT_MAX_DOCS` historic report document cap (default: `5000`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub database_url: Option<String>,
    pub shipping_fee: Money,
    pub max_status_corrections: usize,
    pub report_page_size: usize,
    pub report_max_docs: usize,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    ///
    /// Values that fail to parse fall back to their default as well.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse_with(&lookup, "PORT").unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            shipping_fee: parse_with::<i64>(&lookup, "SHIPPING_FEE_CENTS")
                .map(Money::from_cents)
                .unwrap_or(defaults.shipping_fee),
            max_status_corrections: parse_with(&lookup, "MAX_STATUS_CORRECTIONS")
                .unwrap_or(defaults.max_status_corrections),
            report_page_size: parse_with(&lookup, "REPORT_PAGE_SIZE")
                .unwrap_or(defaults.report_page_size),
            report_max_docs: parse_with(&lookup, "REPORT_MAX_DOCS")
                .unwrap_or(defaults.report_max_docs),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_with<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|v| v.trim().parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            database_url: None,
            shipping_fee: Money::zero(),
            max_status_corrections: DEFAULT_MAX_STATUS_CORRECTIONS,
            report_page_size: DEFAULT_PAGE_SIZE,
            report_max_docs: DEFAULT_MAX_DOCS,
        }
    }
}
