//! Configuration management for SkuWatch.
//!
//! Uses `figment` for layered configuration: defaults -> config file -> environment -> CLI args.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file picked up from the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "skuwatch.toml";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkuwatchConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub artifact: ArtifactConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Allow cross-origin requests from any origin.
    #[serde(default)]
    pub cors_permissive: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            cors_permissive: false,
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Where the model artifact lives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactConfig {
    /// Path to the artifact JSON, relative to the working directory unless absolute.
    pub path: PathBuf,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("model_artifact.json"),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive for the stderr layer.
    pub filter: String,
    /// Directory for daily JSON log files. Disabled when unset.
    #[serde(default)]
    pub json_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            json_dir: None,
        }
    }
}

/// Values supplied on the command line, applied last.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub artifact_path: Option<PathBuf>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub log_filter: Option<String>,
}

/// Load configuration from layered sources.
///
/// Priority (highest to lowest):
/// 1. Explicit overrides
/// 2. Environment variables (prefixed with `SKUWATCH_`, nested with `__`)
/// 3. Config file (`config_file`, or `skuwatch.toml` in the working directory)
/// 4. Built-in defaults
pub fn load_config(
    config_file: Option<&Path>,
    overrides: &ConfigOverrides,
) -> Result<SkuwatchConfig, Box<figment::Error>> {
    let mut figment = Figment::from(Serialized::defaults(SkuwatchConfig::default()));

    match config_file {
        Some(path) if !path.exists() => {
            return Err(Box::new(figment::Error::from(format!(
                "config file {} does not exist",
                path.display()
            ))));
        }
        Some(path) => figment = figment.merge(Toml::file(path)),
        None => {
            let local = Path::new(DEFAULT_CONFIG_FILE);
            if local.exists() {
                figment = figment.merge(Toml::file(local));
            }
        }
    }

    // Environment variables (SKUWATCH_SERVER__PORT, SKUWATCH_ARTIFACT__PATH, etc.)
    figment = figment.merge(Env::prefixed("SKUWATCH_").split("__"));

    if let Some(path) = &overrides.artifact_path {
        figment = figment.merge(Serialized::default("artifact.path", path));
    }
    if let Some(host) = &overrides.host {
        figment = figment.merge(Serialized::default("server.host", host));
    }
    if let Some(port) = overrides.port {
        figment = figment.merge(Serialized::default("server.port", port));
    }
    if let Some(filter) = &overrides.log_filter {
        figment = figment.merge(Serialized::default("logging.filter", filter));
    }

    figment.extract().map_err(Box::new)
}
