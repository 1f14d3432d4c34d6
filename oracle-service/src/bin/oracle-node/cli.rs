use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "oracle-node")]
#[command(about = "Bitcoin contract oracle node", long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override data directory
    #[arg(short, long)]
    pub data_dir: Option<PathBuf>,

    /// Log filters, e.g. `info` or `info,oracle_core=debug`
    #[arg(short, long, default_value = "info")]
    pub log_level: String,

    /// Also write rolling log files into this directory
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Print pending tasks and locked transactions as JSON and exit
    #[arg(long)]
    pub dump_tasks: bool,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn apply_to_env(&self) {
        if let Some(config_path) = &self.config {
            std::env::set_var(oracle_core::foundation::ORACLE_CONFIG_PATH_ENV, config_path);
        }

        if let Some(data_dir) = &self.data_dir {
            std::env::set_var(oracle_core::foundation::ORACLE_DATA_DIR_ENV, data_dir);
        }
    }
}
