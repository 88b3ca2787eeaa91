//! Command-line interface, built on clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// dripfeed — rate-limited batch harvester for TDM article downloads.
#[derive(Debug, Parser)]
#[command(name = "dripfeed", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging.
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Query the catalog and download every article not yet on disk.
    Fetch {
        /// Directory the PDFs are written to.
        #[arg(long, default_value = "articles")]
        out_dir: PathBuf,

        /// Catalog journal id to enumerate.
        #[arg(long, default_value_t = 10808620)]
        journal_id: u64,

        /// First publication year to include.
        #[arg(long)]
        start_year: i32,

        /// Last publication year to include; defaults to the start year.
        #[arg(long)]
        end_year: Option<i32>,

        /// Download service token. Falls back to the TDM_API_KEY environment
        /// variable or the config file.
        #[arg(long)]
        api_key: Option<String>,

        /// Save the raw catalog response next to the articles.
        #[arg(long, default_value_t = false)]
        save_catalog: bool,

        /// Maximum calls per rolling window.
        #[arg(long)]
        calls: Option<u32>,

        /// Window length in seconds.
        #[arg(long)]
        per_secs: Option<u64>,

        /// Maximum instantaneous permits (1 = no burst).
        #[arg(long)]
        burst: Option<u32>,

        /// Dispatch worker pool size.
        #[arg(long)]
        workers: Option<usize>,

        /// Give up on a permit after this many seconds.
        #[arg(long)]
        max_wait_secs: Option<u64>,
    },
}
