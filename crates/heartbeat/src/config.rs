//! Configuration loading for heartbeat.
//!
//! Each setting resolves from, highest to lowest precedence: command-line
//! flags, `HEARTBEAT_*` environment variables, the YAML config file, and
//! built-in defaults.

use clap::Parser;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// Prefix for environment variable overrides
pub const ENV_PREFIX: &str = "HEARTBEAT";

/// Default interval between printed messages
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Interval used when a tick interval value cannot be parsed
pub const FALLBACK_TICK_INTERVAL: Duration = Duration::from_secs(5);

/// Default text printed on every tick
pub const DEFAULT_MESSAGE: &str = "Hello, world!";

/// Default port of the `/metrics` endpoint
pub const DEFAULT_METRICS_PORT: &str = "2112";

/// Default port of the `/healthz` endpoint
pub const DEFAULT_HEALTH_PORT: &str = "8080";

const CONFIG_FILE_NAME: &str = "heartbeat.yaml";

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse command line: {0}")]
    Args(#[from] clap::Error),

    #[error("Failed to read configuration file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Resolved configuration, built once at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Interval between printed messages, always non-zero
    pub tick_interval: Duration,
    /// Text printed on every tick
    pub message: String,
    /// Port of the `/metrics` endpoint
    pub metrics_port: String,
    /// Port of the `/healthz` endpoint
    pub health_port: String,
    /// Config file path given via `--config` or `HEARTBEAT_CONFIG`, empty if none
    pub config_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tick_interval: DEFAULT_TICK_INTERVAL,
            message: DEFAULT_MESSAGE.to_string(),
            metrics_port: DEFAULT_METRICS_PORT.to_string(),
            health_port: DEFAULT_HEALTH_PORT.to_string(),
            config_file: String::new(),
        }
    }
}

impl Config {
    /// Load configuration from the process arguments and environment
    pub fn load() -> Result<Self, ConfigError> {
        ConfigLoader::from_process_env().load(std::env::args_os())
    }

    /// Listen address of the metrics server
    pub fn metrics_addr(&self) -> String {
        format!("0.0.0.0:{}", self.metrics_port)
    }

    /// Listen address of the health server
    pub fn health_addr(&self) -> String {
        format!("0.0.0.0:{}", self.health_port)
    }
}

/// Command-line flags. Every value is optional so that unset flags fall
/// through to the lower-precedence sources.
#[derive(Debug, Parser)]
#[command(
    name = "heartbeat",
    version,
    about = "Periodically prints a message and exposes metrics and a liveness probe"
)]
struct Args {
    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    config: Option<String>,

    /// Tick interval for printing messages (e.g. 1s, 500ms)
    #[arg(long = "tick_interval", value_name = "DURATION")]
    tick_interval: Option<String>,

    /// Message to display
    #[arg(long)]
    message: Option<String>,

    /// Port for metrics endpoint
    #[arg(long = "metrics_port", value_name = "PORT")]
    metrics_port: Option<String>,

    /// Port for health check endpoint
    #[arg(long = "health_port", value_name = "PORT")]
    health_port: Option<String>,
}

/// Values read from the YAML config file
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    #[serde(default, deserialize_with = "scalar")]
    tick_interval: Option<String>,

    #[serde(default, deserialize_with = "scalar")]
    message: Option<String>,

    #[serde(default, deserialize_with = "scalar")]
    metrics_port: Option<String>,

    #[serde(default, deserialize_with = "scalar")]
    health_port: Option<String>,
}

/// Accept strings, numbers and booleans, keeping their text form
fn scalar<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<serde_yaml::Value>::deserialize(deserializer)? {
        None | Some(serde_yaml::Value::Null) => Ok(None),
        Some(serde_yaml::Value::String(s)) => Ok(Some(s)),
        Some(serde_yaml::Value::Number(n)) => Ok(Some(n.to_string())),
        Some(serde_yaml::Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(other) => Err(D::Error::custom(format!(
            "expected a scalar value, found {:?}",
            other
        ))),
    }
}

/// Environment variable name for a config key
pub fn env_key(key: &str) -> String {
    format!("{}_{}", ENV_PREFIX, key.replace('.', "_").to_uppercase())
}

/// Parse a tick interval, substituting [`FALLBACK_TICK_INTERVAL`] for
/// values that do not parse, are zero, or are too large for a timer
/// deadline.
pub fn parse_tick_interval(raw: &str) -> Duration {
    match humantime::parse_duration(raw.trim()) {
        Ok(interval) if interval.is_zero() => {
            warn!(
                value = raw,
                fallback = ?FALLBACK_TICK_INTERVAL,
                "Zero duration for tick_interval, using fallback"
            );
            FALLBACK_TICK_INTERVAL
        }
        Ok(interval) if std::time::Instant::now().checked_add(interval).is_none() => {
            warn!(
                value = raw,
                fallback = ?FALLBACK_TICK_INTERVAL,
                "Duration for tick_interval out of range, using fallback"
            );
            FALLBACK_TICK_INTERVAL
        }
        Ok(interval) => interval,
        Err(e) => {
            warn!(
                value = raw,
                error = %e,
                fallback = ?FALLBACK_TICK_INTERVAL,
                "Invalid duration for tick_interval, using fallback"
            );
            FALLBACK_TICK_INTERVAL
        }
    }
}

/// Builds a [`Config`] from arguments, an environment snapshot and an
/// optional config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    env: HashMap<String, String>,
    search_paths: Vec<PathBuf>,
}

impl ConfigLoader {
    /// Loader with an empty environment and no default file search
    pub fn new() -> Self {
        Self::default()
    }

    /// Loader over the real process environment and standard file locations
    pub fn from_process_env() -> Self {
        Self {
            env: std::env::vars().collect(),
            search_paths: default_search_paths(),
        }
    }

    /// Add an environment variable to the snapshot
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Replace the locations probed when no config path is given
    pub fn with_search_paths(mut self, paths: Vec<PathBuf>) -> Self {
        self.search_paths = paths;
        self
    }

    /// Resolve the configuration. The first argument is the binary name.
    ///
    /// Prints the explicit config file path (possibly empty) to stdout.
    pub fn load<I, T>(&self, args: I) -> Result<Config, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let args = Args::try_parse_from(args)?;

        let config_file = args
            .config
            .or_else(|| self.env_value("config"))
            .unwrap_or_default();
        println!("{}", config_file);

        let file = if config_file.is_empty() {
            self.read_default_file()
        } else {
            read_config_file(Path::new(&config_file))?
        };

        let tick_interval = self
            .resolve("tick_interval", args.tick_interval, file.tick_interval)
            .map(|raw| parse_tick_interval(&raw))
            .unwrap_or(DEFAULT_TICK_INTERVAL);

        Ok(Config {
            tick_interval,
            message: self
                .resolve("message", args.message, file.message)
                .unwrap_or_else(|| DEFAULT_MESSAGE.to_string()),
            metrics_port: self
                .resolve("metrics_port", args.metrics_port, file.metrics_port)
                .unwrap_or_else(|| DEFAULT_METRICS_PORT.to_string()),
            health_port: self
                .resolve("health_port", args.health_port, file.health_port)
                .unwrap_or_else(|| DEFAULT_HEALTH_PORT.to_string()),
            config_file,
        })
    }

    fn resolve(&self, key: &str, flag: Option<String>, file: Option<String>) -> Option<String> {
        flag.or_else(|| self.env_value(key)).or(file)
    }

    fn env_value(&self, key: &str) -> Option<String> {
        self.env
            .get(&env_key(key))
            .filter(|value| !value.is_empty())
            .cloned()
    }

    /// Read the first config file found in the search paths. Absence is
    /// silent; a file that fails to load is reported and skipped.
    fn read_default_file(&self) -> FileConfig {
        let Some(path) = self.search_paths.iter().find(|p| p.is_file()) else {
            return FileConfig::default();
        };

        match read_config_file(path) {
            Ok(file) => {
                info!(path = %path.display(), "Loaded configuration file");
                file
            }
            Err(e) => {
                warn!(error = %e, "Ignoring default configuration file");
                FileConfig::default()
            }
        }
    }
}

fn read_config_file(path: &Path) -> Result<FileConfig, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    if contents.trim().is_empty() {
        return Ok(FileConfig::default());
    }

    serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Standard config file locations, in lookup order
fn default_search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("/etc/heartbeat").join(CONFIG_FILE_NAME)];

    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(".config/heartbeat").join(CONFIG_FILE_NAME));
    }

    paths.push(PathBuf::from(".").join(CONFIG_FILE_NAME));
    paths
}
