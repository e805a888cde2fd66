//! Layered settings: built-in defaults, then an optional TOML file, then
//! `MLB_STATS_*` environment variables. CLI flags are applied on top by main.
//!
//! ```text
//! MLB_STATS_BROKER__HOST=rabbit.internal
//! MLB_STATS_LOGGING__FORMAT=json
//! ```

use clap::ValueEnum;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use mlb_stats_infra_amqp::AmqpEndpoint;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "mlb-stats";
pub const DEFAULT_CSV_PATH: &str = "mlb-player-stats-Batters.csv";
const ENV_PREFIX: &str = "MLB_STATS";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub broker: BrokerSettings,
    pub producer: ProducerSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BrokerSettings {
    pub host: String,
    pub port: u16,
    pub vhost: String,
}

impl BrokerSettings {
    pub fn endpoint(&self) -> AmqpEndpoint {
        AmqpEndpoint {
            host: self.host.clone(),
            port: self.port,
            vhost: self.vhost.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProducerSettings {
    pub csv_path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    pub format: LogFormat,
    /// Also write logs to `<directory>/mlb-stats.log`
    pub directory: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable, colored
    Pretty,
    /// One JSON object per event
    Json,
}

impl Settings {
    /// Load settings. `file` must exist when given; otherwise
    /// `./mlb-stats.{toml,yaml,json}` is read if present.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let builder = defaults()?;
        let builder = match file {
            Some(path) => builder.add_source(File::from(path).required(true)),
            None => builder.add_source(File::with_name(DEFAULT_CONFIG_FILE).required(false)),
        };
        builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let endpoint = AmqpEndpoint::default();
    Config::builder()
        .set_default("broker.host", endpoint.host)?
        .set_default("broker.port", i64::from(endpoint.port))?
        .set_default("broker.vhost", endpoint.vhost)?
        .set_default("producer.csv_path", DEFAULT_CSV_PATH)?
        .set_default("logging.format", "pretty")
}
