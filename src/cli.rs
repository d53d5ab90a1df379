//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use room_export::api::constants::{DEFAULT_MAX_ROOMS, DEFAULT_PAGE_SIZE};

/// Export rooms, messages and attachments to local JSON.
///
/// Reads the bearer token from WEBEX_APIKEY (and an optional API host from
/// WEBEX_API_BASE_URL), lists rooms by last activity, and writes
/// `<output>/rooms.json` plus one directory per room.
#[derive(Parser, Debug)]
#[command(name = "room-export")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Maximum number of rooms to fetch
    #[arg(long, default_value_t = DEFAULT_MAX_ROOMS, value_parser = clap::value_parser!(u32).range(1..))]
    pub rooms: u32,

    /// Output directory
    #[arg(short, long, default_value = "./webexmessages")]
    pub output: PathBuf,

    /// Only fetch rooms, not messages
    #[arg(long)]
    pub only_rooms: bool,

    /// Do not download attached files
    #[arg(long)]
    pub no_files: bool,

    /// JSON file with the rooms to export (same shape as rooms.json)
    #[arg(long, value_name = "PATH")]
    pub room_file: Option<PathBuf>,

    /// Only export messages after this time (RFC 3339, e.g. 2024-01-31T00:00:00Z)
    #[arg(long, value_name = "TIME")]
    pub after: Option<String>,

    /// Only request messages before this time (RFC 3339)
    #[arg(long, value_name = "TIME")]
    pub before: Option<String>,

    /// Messages per page request (1-1000)
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE, value_parser = clap::value_parser!(u32).range(1..=1000))]
    pub page_size: u32,

    /// Give up on a throttled request after this many attempts (default: never)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_retries: Option<u32>,

    /// Give up on a throttled request after waiting this many seconds in total (default: never)
    #[arg(long, value_name = "SECS")]
    pub max_rate_limit_wait: Option<u64>,
}
