use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

const DEFAULT_CONFIG_FILES: &[&str] = &[
    "jordnaer.toml",
    "config/jordnaer.toml",
    "crates/config/jordnaer.toml",
    "../jordnaer.toml",
    "../config/jordnaer.toml",
    "../crates/config/jordnaer.toml",
];

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub database: DatabaseConfig,
    pub messaging: MessagingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub address: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            port: 7080,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://jordnaer.db".to_string(),
            max_connections: 10,
        }
    }
}

/// Settings for the in-process command queues.
///
/// ```
/// use jordnaer_config::MessagingConfig;
///
/// let messaging = MessagingConfig::default();
/// assert_eq!(messaging.queue_capacity, 256);
/// assert_eq!(messaging.redelivery_limit, 5);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagingConfig {
    /// Bounded capacity of each command queue.
    #[serde(default = "MessagingConfig::default_queue_capacity")]
    pub queue_capacity: usize,
    /// How many times a command is redelivered after a transient failure
    /// before it is dropped.
    #[serde(default = "MessagingConfig::default_redelivery_limit")]
    pub redelivery_limit: u32,
}

impl MessagingConfig {
    const fn default_queue_capacity() -> usize {
        256
    }

    const fn default_redelivery_limit() -> u32 {
        5
    }
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            queue_capacity: Self::default_queue_capacity(),
            redelivery_limit: Self::default_redelivery_limit(),
        }
    }
}

/// Load the application configuration by combining defaults, files, and environment overrides.
///
/// ```
/// use jordnaer_config::load;
///
/// std::env::remove_var("JORDNAER_CONFIG");
///
/// let config = load().expect("configuration should load with defaults");
/// assert!(!config.http.address.is_empty());
/// ```
pub fn load() -> anyhow::Result<AppConfig> {
    let defaults = AppConfig::default();

    let mut builder = config::Config::builder();
    builder = builder
        .set_default("http.address", defaults.http.address.clone())
        .unwrap()
        .set_default("http.port", i64::from(defaults.http.port))
        .unwrap()
        .set_default("database.url", defaults.database.url.clone())
        .unwrap()
        .set_default(
            "database.max_connections",
            i64::from(defaults.database.max_connections),
        )
        .unwrap()
        .set_default(
            "messaging.queue_capacity",
            i64::try_from(defaults.messaging.queue_capacity).unwrap_or(i64::MAX),
        )
        .unwrap()
        .set_default(
            "messaging.redelivery_limit",
            i64::from(defaults.messaging.redelivery_limit),
        )
        .unwrap();

    let environment_overrides = config::Environment::with_prefix("JORDNAER").separator("__");

    let mut config_file_attached = false;

    if let Ok(path) = std::env::var("JORDNAER_CONFIG") {
        builder = builder.add_source(config::File::from(PathBuf::from(&path)));
        config_file_attached = true;
        debug!(path, "loading configuration via JORDNAER_CONFIG");
    } else if let Ok(cwd) = std::env::current_dir() {
        let fallback = DEFAULT_CONFIG_FILES
            .iter()
            .map(|candidate| cwd.join(candidate))
            .find(|path| path.exists());

        if let Some(path) = fallback {
            debug!(path = %path.display(), "loading configuration file");
            builder = builder.add_source(config::File::from(path));
            config_file_attached = true;
        }
    }

    if !config_file_attached {
        debug!("no configuration file found, relying on defaults and environment overrides");
    }

    builder = builder.add_source(environment_overrides);

    let cfg = builder.build().context("unable to build configuration")?;

    let config = cfg
        .try_deserialize::<AppConfig>()
        .context("invalid configuration")?;

    debug!(?config, "loaded backend configuration");
    Ok(config)
}
