//! CLI argument definitions for dmd.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `feeds` | List the published feeds |
//! | `schema` | Print a feed's destination table schema |
//! | `paths` | Print the artifact paths of one trading day |
//! | `extract` | Log in and extract today's session as NDJSON |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--config` | none | YAML config file |
//! | `--pretty` | `false` | Pretty-print JSON documents |
//!
//! # Examples
//!
//! ```bash
//! dmd feeds
//! dmd schema LSE-Post-Trade --pretty
//! dmd paths tqex_pre_trade --date 2024-03-05
//! DMD_USERNAME=ops DMD_PASSWORD=... dmd extract LSE-Post-Trade TRADEcho-NL-Post-Trade
//! ```

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

/// Trade-transparency file extractor for the LSEG data-download portal.
#[derive(Debug, Parser)]
#[command(
    name = "dmd",
    author,
    version,
    about = "Trade-transparency file extractor for the LSEG data-download portal",
    long_about = "Logs in to the LSEG data-download portal, walks today's trading session \
minute by minute and writes the normalized pre- and post-trade records as NDJSON.\n\
\n\
Credentials come from the config file or DMD_USERNAME / DMD_PASSWORD. \
Logging is controlled with RUST_LOG."
)]
pub struct Cli {
    /// YAML config file. `DMD_*` environment variables override its values.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Pretty-print JSON documents (`schema` only; NDJSON stays one line per record).
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List the published feeds with their tables and portal folders.
    Feeds,

    /// Print the destination table schema of a feed.
    ///
    ///   dmd schema LSE-Post-Trade
    ///   dmd schema eceu_post_trade --pretty
    Schema(SchemaArgs),

    /// Print every artifact path of a trading day without fetching anything.
    ///
    ///   dmd paths LSE-Pre-Trade
    ///   dmd paths Turquoise-Europe-Post-Trade --date 2024-03-05
    Paths(PathsArgs),

    /// Log in and extract today's session for the given feeds (all when none given).
    ///
    ///   dmd extract
    ///   dmd extract LSE-Post-Trade --strict
    Extract(ExtractArgs),
}

#[derive(Debug, Args)]
pub struct SchemaArgs {
    /// Portal feed name or table name.
    pub feed: String,
}

#[derive(Debug, Args)]
pub struct PathsArgs {
    /// Portal feed name or table name.
    pub feed: String,

    /// Trading date (YYYY-MM-DD); defaults to today.
    #[arg(long)]
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Args)]
pub struct ExtractArgs {
    /// Portal feed names or table names.
    pub feeds: Vec<String>,

    /// Exit with code 5 when any cursor failed or any row was malformed.
    #[arg(long, default_value_t = false)]
    pub strict: bool,
}
