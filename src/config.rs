//! Runtime configuration loaded from environment variables.

use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;

use crate::dashboard::PollIntervals;
use crate::gateway::DEFAULT_PREDICTION_URL;

/// Default port if not specified via environment variable.
const DEFAULT_PORT: u16 = 3000;

/// Service configuration.
///
/// | Env Var                               | Default                 |
/// |---------------------------------------|-------------------------|
/// | `FLEETWATCH_PORT`                     | `3000`                  |
/// | `FLEETWATCH_DATABASE_URL`             | unset (in-memory ledger)|
/// | `FLEETWATCH_PREDICTION_URL`           | `http://127.0.0.1:8000` |
/// | `FLEETWATCH_PREDICTION_TIMEOUT_SECS`  | unset (no timeout)      |
/// | `FLEETWATCH_TELEMETRY_POLL_SECS`      | `5`                     |
/// | `FLEETWATCH_FORECAST_POLL_SECS`       | `5`                     |
/// | `FLEETWATCH_LOG_POLL_SECS`            | `10`                    |
/// | `FLEETWATCH_MAINTENANCE_POLL_SECS`    | `10`                    |
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: Option<String>,
    pub prediction_url: String,
    pub prediction_timeout: Option<Duration>,
    pub poll_intervals: PollIntervals,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = parse_or(&get, "FLEETWATCH_PORT", DEFAULT_PORT)?;
        let database_url = get("FLEETWATCH_DATABASE_URL");
        let prediction_url =
            get("FLEETWATCH_PREDICTION_URL").unwrap_or_else(|| DEFAULT_PREDICTION_URL.to_string());
        let prediction_timeout = get("FLEETWATCH_PREDICTION_TIMEOUT_SECS")
            .map(|raw| parse_secs("FLEETWATCH_PREDICTION_TIMEOUT_SECS", &raw))
            .transpose()?;

        let defaults = PollIntervals::default();
        let poll_intervals = PollIntervals {
            fleet: secs_or(&get, "FLEETWATCH_TELEMETRY_POLL_SECS", defaults.fleet)?,
            forecasts: secs_or(&get, "FLEETWATCH_FORECAST_POLL_SECS", defaults.forecasts)?,
            reports: secs_or(&get, "FLEETWATCH_LOG_POLL_SECS", defaults.reports)?,
            maintenance: secs_or(
                &get,
                "FLEETWATCH_MAINTENANCE_POLL_SECS",
                defaults.maintenance,
            )?,
        };

        Ok(Self {
            port,
            database_url,
            prediction_url,
            prediction_timeout,
            poll_intervals,
        })
    }
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has invalid value '{raw}'")),
        None => Ok(default),
    }
}

fn secs_or(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: Duration,
) -> anyhow::Result<Duration> {
    match get(key) {
        Some(raw) => parse_secs(key, &raw),
        None => Ok(default),
    }
}

fn parse_secs(key: &str, raw: &str) -> anyhow::Result<Duration> {
    let secs: u64 = raw
        .trim()
        .parse()
        .with_context(|| format!("{key} has invalid value '{raw}'"))?;
    anyhow::ensure!(secs > 0, "{key} must be at least 1 second");
    Ok(Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();

        assert_eq!(config.port, 3000);
        assert!(config.database_url.is_none());
        assert_eq!(config.prediction_url, "http://127.0.0.1:8000");
        assert!(config.prediction_timeout.is_none());
        assert_eq!(config.poll_intervals.fleet, Duration::from_secs(5));
        assert_eq!(config.poll_intervals.forecasts, Duration::from_secs(5));
        assert_eq!(config.poll_intervals.reports, Duration::from_secs(10));
        assert_eq!(config.poll_intervals.maintenance, Duration::from_secs(10));
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("FLEETWATCH_PORT", "8080"),
            ("FLEETWATCH_DATABASE_URL", "sqlite:fleet.db?mode=rwc"),
            ("FLEETWATCH_PREDICTION_URL", "http://scorer:9000"),
            ("FLEETWATCH_PREDICTION_TIMEOUT_SECS", "3"),
            ("FLEETWATCH_LOG_POLL_SECS", "30"),
            ("FLEETWATCH_MAINTENANCE_POLL_SECS", "60"),
        ])
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.database_url.as_deref(), Some("sqlite:fleet.db?mode=rwc"));
        assert_eq!(config.prediction_url, "http://scorer:9000");
        assert_eq!(config.prediction_timeout, Some(Duration::from_secs(3)));
        assert_eq!(config.poll_intervals.reports, Duration::from_secs(30));
        assert_eq!(config.poll_intervals.maintenance, Duration::from_secs(60));
    }

    #[test]
    fn test_blank_values_are_unset() {
        let config = config_from(&[("FLEETWATCH_DATABASE_URL", "  ")]).unwrap();
        assert!(config.database_url.is_none());
    }

    #[test]
    fn test_invalid_values_are_errors() {
        assert!(config_from(&[("FLEETWATCH_PORT", "eighty")]).is_err());
        assert!(config_from(&[("FLEETWATCH_TELEMETRY_POLL_SECS", "0")]).is_err());
        assert!(config_from(&[("FLEETWATCH_PREDICTION_TIMEOUT_SECS", "-1")]).is_err());
    }
}
