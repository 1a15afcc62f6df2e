use clap::Parser;
use std::path::PathBuf;

use crate::config::Config;

#[derive(Debug, Parser)]
#[command(name = "calculator-service", version, about = "Arithmetic over HTTP with a persistent history")]
pub struct Args {
    /// Address to bind, overrides CALC_HOST
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on, overrides CALC_PORT
    #[arg(long)]
    pub port: Option<u16>,

    /// SQLite database file, overrides CALC_DB_PATH
    #[arg(long)]
    pub db_path: Option<PathBuf>,

    /// Directory for combined.log and error.log, overrides CALC_LOG_DIR
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Keep history in process memory instead of SQLite
    #[arg(long)]
    pub in_memory: bool,
}

impl Args {
    /// Apply command-line overrides on top of the environment config.
    pub fn apply(&self, config: &mut Config) {
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(path) = &self.db_path {
            config.database.path = path.clone();
        }
        if let Some(dir) = &self.log_dir {
            config.log_dir = dir.clone();
        }
    }
}
