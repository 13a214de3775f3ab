use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

use crate::http::parser::ParserConfig;
use crate::server::ServerOptions;

/// Environment variable naming a YAML config file.
pub const CONFIG_ENV: &str = "PLAINHTTP_CONFIG";
/// Environment variable overriding `listen_addr`.
pub const LISTEN_ENV: &str = "LISTEN";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub listen_addr: String,
    pub tls: Option<TlsConfig>,
    pub static_files: Option<StaticFilesConfig>,
    pub timeouts: TimeoutConfig,
    pub limits: LimitConfig,
    /// Put panic messages in 500 bodies. Turn off in production.
    pub debug_panic_response: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TlsConfig {
    pub listen_addr: String,
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StaticFilesConfig {
    pub root: PathBuf,
    #[serde(default = "default_static_prefix")]
    pub prefix: String,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub request_line_ms: u64,
    pub body_ms: u64,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct LimitConfig {
    pub max_line_length: usize,
    pub max_body_size: usize,
}

fn default_static_prefix() -> String {
    "/static/".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".to_string(),
            tls: None,
            static_files: None,
            timeouts: TimeoutConfig::default(),
            limits: LimitConfig::default(),
            debug_panic_response: true,
        }
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_line_ms: 3000,
            body_ms: 3000,
        }
    }
}

impl Default for LimitConfig {
    fn default() -> Self {
        let parser = ParserConfig::default();
        Self {
            max_line_length: parser.max_line_length,
            max_body_size: parser.max_body_size,
        }
    }
}

impl Config {
    /// Defaults, overlaid by the file named in `PLAINHTTP_CONFIG` (if set),
    /// overlaid by `LISTEN` (if set).
    pub fn load() -> anyhow::Result<Self> {
        let mut cfg = match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };

        if let Ok(addr) = std::env::var(LISTEN_ENV) {
            cfg.listen_addr = addr;
        }
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_yaml_str(&text).with_context(|| format!("Invalid config {}", path.display()))
    }

    pub fn from_yaml_str(text: &str) -> anyhow::Result<Self> {
        // an empty document deserializes to unit, not to a default mapping
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn parser_config(&self) -> ParserConfig {
        ParserConfig {
            line_timeout: Duration::from_millis(self.timeouts.request_line_ms),
            body_timeout: Duration::from_millis(self.timeouts.body_ms),
            max_line_length: self.limits.max_line_length,
            max_body_size: self.limits.max_body_size,
        }
    }

    pub fn server_options(&self) -> ServerOptions {
        ServerOptions {
            parser: self.parser_config(),
            debug_panic_response: self.debug_panic_response,
        }
    }
}
