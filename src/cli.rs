//! Command line interface for viewer-load, built on clap.

use std::path::PathBuf;

use clap::Parser;

/// Resubmits exported workflows to a workflow viewer and waits for the imports to finish.
#[derive(Debug, Parser)]
#[command(name = "viewer-load", version, about)]
pub struct Cli {
    /// Export document to read (`-` for stdin). A `.gz` suffix is decompressed.
    #[arg(default_value = "-")]
    pub input: String,

    /// Base URL of the workflow viewer. Overrides the config file.
    pub base_url: Option<String>,

    /// Skip workflows whose branch is a 40-character commit hash.
    #[arg(long, default_value_t = false)]
    pub no_commits: bool,

    /// Maximum number of queued imports tracked at once.
    #[arg(long)]
    pub max_concurrent: Option<usize>,

    /// Milliseconds to wait between polls of a full queue.
    #[arg(long)]
    pub poll_interval_ms: Option<u64>,

    /// Path to an alternative config file.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable debug diagnostics.
    #[arg(long, short, default_value_t = false)]
    pub verbose: bool,
}

impl Cli {
    /// `None` means standard input.
    pub fn input_path(&self) -> Option<PathBuf> {
        if self.input == "-" {
            None
        } else {
            Some(PathBuf::from(&self.input))
        }
    }
}
