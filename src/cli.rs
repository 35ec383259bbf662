//! Command-line interface argument parsing.

use crate::config::Config;
use clap::Parser;
use std::path::PathBuf;

/// resultd - multi-school result portal
///
/// Serves the result portal over HTTP by default. With --stdio, reads one
/// JSON request per line on stdin and answers on stdout.
///
/// Examples:
///   resultd --bind 0.0.0.0:10000 --root ./school_data
///   resultd --stdio
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    ///
    /// If not specified, looks for resultd.toml in the current directory
    #[arg(short, long, value_name = "FILE", env = "RESULTD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address for the HTTP server (overrides [server] bind)
    #[arg(long, value_name = "ADDR", env = "RESULTD_BIND")]
    pub bind: Option<String>,

    /// Storage root holding schools.json and data/ (overrides [storage] root)
    #[arg(long, value_name = "DIR", env = "RESULTD_ROOT")]
    pub root: Option<PathBuf>,

    /// Serve line-delimited JSON on stdin/stdout instead of HTTP
    #[arg(long)]
    pub stdio: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Default tracing filter when RUST_LOG is unset.
    pub fn log_filter(&self) -> &'static str {
        if self.verbose {
            "resultd=debug,tower_http=debug"
        } else {
            "resultd=info,tower_http=info"
        }
    }

    /// Command-line values win over the config file.
    pub fn apply(&self, config: &mut Config) {
        if let Some(bind) = &self.bind {
            config.server.bind = bind.clone();
        }
        if let Some(root) = &self.root {
            config.storage.root = root.clone();
        }
    }
}
