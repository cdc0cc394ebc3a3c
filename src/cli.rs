use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version, about = "cbz-ops: fetch, combine and split CBZ manga archives")]
pub struct Cli {
    /// More log output (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Combine per-chapter image directories into one CBZ
    Combine(CombineArgs),
    /// Download a manga from MangaDex into a combined CBZ
    Fetch(FetchArgs),
    /// Split an oversized CBZ into size-bounded parts
    Split(SplitArgs),
}

#[derive(Args, Debug)]
pub struct CombineArgs {
    /// Directory holding one subdirectory per manga (offered as the default)
    #[arg(short, long, value_name = "DIR", env = "CBZ_OPS_SOURCE_DIR", default_value = ".")]
    pub source_dir: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct FetchArgs {
    /// Title to search for; asked interactively when omitted
    pub title: Option<String>,
    /// Where per-manga download folders are created
    #[arg(short, long, value_name = "DIR", default_value = "downloads")]
    pub downloads_dir: PathBuf,
    /// Translated language to download
    #[arg(short, long, default_value = "en")]
    pub language: String,
    /// MangaDex API base URL
    #[arg(long, value_name = "URL", env = "MANGADEX_API", default_value = "https://api.mangadex.org")]
    pub api_url: String,
    /// Cover image host
    #[arg(long, value_name = "URL", default_value = "https://uploads.mangadex.org")]
    pub uploads_url: String,
}

#[derive(Args, Debug)]
pub struct SplitArgs {
    /// Archive to split; chosen from --downloads-dir when omitted
    #[arg(short = 'i', long, value_name = "FILE")]
    pub input: Option<PathBuf>,
    /// Directory searched for archives when --input is not given
    #[arg(long, value_name = "DIR", default_value = "downloads")]
    pub downloads_dir: PathBuf,
    /// Output directory
    #[arg(short = 'o', long, value_name = "DIR", default_value = "split_output")]
    pub output_dir: PathBuf,
    /// Largest uncompressed size of one part, in GiB
    #[arg(short = 'm', long, value_name = "GB", default_value_t = 3.5)]
    pub max_size: f64,
    /// Output filename pattern, supports {base},{index}
    #[arg(long, value_name = "PATTERN", default_value = "{base}_part{index}.cbz")]
    pub pattern: String,
    /// Overwrite output files if they already exist
    #[arg(long)]
    pub force: bool,
}
