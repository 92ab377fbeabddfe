//! Configuration loading and validation
//!
//! Layered sources, later ones winning: built-in defaults, an optional
//! `aegis.toml`, environment variables prefixed `AEGIS_` (nested keys
//! separated by `__`, e.g. `AEGIS_SERVER__PORT`), then CLI flags. The
//! validator rejects unusable values before startup.

use std::path::Path;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

pub mod validator;

use crate::cli::Cli;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub gateway: GatewaySettings,
    pub agent: AgentSettings,
    pub quote_api: QuoteApiSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Connection URL; sqlite, postgres, and mysql schemes are supported.
    pub url: String,
    pub max_connections: u32,
    pub connect_timeout_secs: u64,
    /// Seed the demo dataset when the database is empty.
    pub seed_demo_data: bool,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: "sqlite://aegis.db".to_string(),
            max_connections: 5,
            connect_timeout_secs: 30,
            seed_demo_data: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewaySettings {
    /// OpenAI-compatible chat completions endpoint root.
    pub base_url: String,
    pub api_key: String,
    pub default_model: String,
    /// Model substituted when the client asks for web search.
    pub web_search_model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            base_url: "https://ai-gateway.vercel.sh/v1".to_string(),
            api_key: String::new(),
            default_model: "openai/gpt-oss-120b".to_string(),
            web_search_model: "perplexity/sonar".to_string(),
            temperature: None,
            max_tokens: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(default)]
pub struct AgentSettings {
    /// Model invocations allowed per chat run.
    pub max_steps: u32,
    /// Wall-clock ceiling per chat run.
    pub run_timeout_secs: u64,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_steps: 5,
            run_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct QuoteApiSettings {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for QuoteApiSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.aegis-assurances.tn/devis".to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Tracing filter directive, overridden by `RUST_LOG` when set.
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Settings {
    /// Load from the default `aegis.toml` location and validate.
    pub fn new() -> Result<Self, anyhow::Error> {
        let settings = Self::load(Path::new("aegis.toml"))?;
        Self::validated(settings)
    }

    /// Load from the CLI-selected file, apply CLI overrides, validate.
    pub fn new_with_cli(cli: &Cli) -> Result<Self, anyhow::Error> {
        let mut settings = Self::load(&cli.config)?;
        settings.apply_cli_overrides(cli);
        Self::validated(settings)
    }

    fn load(config_path: &Path) -> Result<Self, anyhow::Error> {
        let s = Config::builder()
            .add_source(File::from(config_path.to_path_buf()).required(false))
            .add_source(
                Environment::with_prefix("AEGIS")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        Ok(s.try_deserialize()?)
    }

    fn apply_cli_overrides(&mut self, cli: &Cli) {
        if let Some(host) = &cli.host {
            self.server.host = host.clone();
        }
        if let Some(port) = cli.port {
            self.server.port = port;
        }
        if let Some(url) = &cli.database_url {
            self.database.url = url.clone();
        }
        if let Some(level) = &cli.log_level {
            self.logging.level = level.clone();
        }
    }

    fn validated(settings: Settings) -> Result<Self, anyhow::Error> {
        validator::ConfigValidator::validate(&settings).map_err(|errors| {
            let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            anyhow::anyhow!("Configuration validation failed:\n{}", messages.join("\n"))
        })?;
        Ok(settings)
    }
}
