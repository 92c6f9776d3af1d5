use std::path::PathBuf;

use clap::Parser;

/// Watches the campus event listing for free food and keeps a deduplicated list.
#[derive(Debug, Parser)]
#[command(name = "foodscout", version, about)]
pub struct Cli {
    /// Path to a RON configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Credential for the extraction service.
    #[arg(long, env = "FOODSCOUT_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Enable the weekly auto-check at startup.
    #[arg(long)]
    pub auto: bool,

    /// Directory used by `export` when no path is given.
    #[arg(long, default_value = ".")]
    pub export_dir: PathBuf,

    /// Also write process logs to this file.
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Log at debug level.
    #[arg(short, long)]
    pub verbose: bool,
}
