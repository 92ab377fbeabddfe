use clap::Parser;
use std::path::PathBuf;

/// Aegis Assurances - conversational insurance assistant backend
#[derive(Parser, Debug, Clone)]
#[command(name = "aegis", version, about, long_about = None)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, env = "AEGIS_CONFIG", default_value = "aegis.toml")]
    pub config: PathBuf,

    /// Server host address
    #[arg(long, env = "AEGIS_HOST")]
    pub host: Option<String>,

    /// Server port
    #[arg(long, env = "AEGIS_PORT")]
    pub port: Option<u16>,

    /// Database connection URL
    #[arg(long, env = "AEGIS_DATABASE_URL")]
    pub database_url: Option<String>,

    /// Log level filter (e.g. "info", "aegis=debug")
    #[arg(long, env = "AEGIS_LOG_LEVEL")]
    pub log_level: Option<String>,
}
