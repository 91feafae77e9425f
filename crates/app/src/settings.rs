//! Handles settings for the application. Configuration is read from an
//! optional `settings.toml` and from `LEDGER_REPORTS__*` environment
//! variables, then command line flags override both.
use std::path::PathBuf;

use clap::Parser;
use config::{Config, Environment, File};
use engine::Taxonomy;
use serde::Deserialize;

use crate::error::Result;

const DEFAULT_CONFIG_PATH: &str = "settings";
const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Parser)]
#[command(name = "ledger_reports", version)]
pub struct Args {
    /// Config file path, with or without the `.toml` extension.
    #[arg(long)]
    config: Option<String>,
    /// Override the ledger directory.
    #[arg(long)]
    source_dir: Option<PathBuf>,
    /// Override the report directory.
    #[arg(long)]
    output_dir: Option<PathBuf>,
    /// Serve the HTTP API even without a `[server]` section.
    #[arg(long)]
    serve: bool,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct App {
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Reports {
    pub source_dir: PathBuf,
    pub output_dir: PathBuf,
    pub taxonomy: Option<Taxonomy>,
}

impl Default for Reports {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("tmp"),
            output_dir: PathBuf::from("out"),
            taxonomy: None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Server {
    pub bind: Option<String>,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub app: App,
    #[serde(default)]
    pub reports: Reports,
    pub server: Option<Server>,
}

impl Settings {
    pub fn new() -> Result<Self> {
        let args = Args::parse();
        Self::from_args(args)
    }

    fn from_args(args: Args) -> Result<Self> {
        let config_path = args.config.as_deref().unwrap_or(DEFAULT_CONFIG_PATH);
        let settings = Config::builder()
            .add_source(File::with_name(config_path).required(false))
            .add_source(Environment::with_prefix("LEDGER_REPORTS").separator("__"))
            .build()?;
        let mut settings: Settings = settings.try_deserialize()?;

        if let Some(source_dir) = args.source_dir {
            settings.reports.source_dir = source_dir;
        }
        if let Some(output_dir) = args.output_dir {
            settings.reports.output_dir = output_dir;
        }
        if args.serve && settings.server.is_none() {
            settings.server = Some(Server {
                bind: None,
                port: DEFAULT_PORT,
            });
        }

        Ok(settings)
    }
}
