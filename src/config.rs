use crate::catalog::{DEFAULT_CATALOG_URL, SyncMode};
use crate::stats::ChartScale;
use std::{env, net::SocketAddr, path::PathBuf, time::Duration};
use tracing::warn;

#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub port: u16,
    pub catalog_url: String,
    pub catalog_interval: Duration,
    pub catalog_mode: SyncMode,
    pub catalog_enabled: bool,
    pub chart_scale: ChartScale,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            port: 8080,
            catalog_url: DEFAULT_CATALOG_URL.to_string(),
            catalog_interval: Duration::from_secs(60),
            catalog_mode: SyncMode::default(),
            catalog_enabled: true,
            chart_scale: ChartScale::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Unparseable values are logged and replaced by the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let var = |name: &str| lookup(name).filter(|raw| !raw.trim().is_empty());

        Self {
            data_dir: var("APP_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            port: parse_var(&var, "PORT", |raw| raw.trim().parse().ok()).unwrap_or(defaults.port),
            catalog_url: var("CATALOG_URL").unwrap_or(defaults.catalog_url),
            catalog_interval: parse_var(&var, "CATALOG_INTERVAL_SECS", |raw| {
                raw.trim().parse::<u64>().ok().filter(|secs| *secs > 0)
            })
            .map(Duration::from_secs)
            .unwrap_or(defaults.catalog_interval),
            catalog_mode: parse_var(&var, "CATALOG_MODE", SyncMode::parse)
                .unwrap_or(defaults.catalog_mode),
            catalog_enabled: var("CATALOG_SYNC")
                .map(|raw| !matches!(raw.trim().to_ascii_lowercase().as_str(), "off" | "0" | "false"))
                .unwrap_or(defaults.catalog_enabled),
            chart_scale: parse_var(&var, "CHART_SCALE", ChartScale::parse)
                .unwrap_or(defaults.chart_scale),
        }
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }
}

fn parse_var<T>(
    var: &impl Fn(&str) -> Option<String>,
    name: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> Option<T> {
    let raw = var(name)?;
    let value = parse(&raw);
    if value.is_none() {
        warn!("ignoring {name}={raw:?}");
    }
    value
}
