use std::path::PathBuf;
use clap::builder::RangedU64ValueParser;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(author, version, about = "Download a file over parallel HTTP range requests")]
pub struct CliArgs {
    /// Url of the file, must advertise `Accept-Ranges: bytes`
    pub url: String,

    /// Number of parts, defaults to the CPU count
    #[arg(short, long, value_parser = RangedU64ValueParser::<usize>::new().range(1..))]
    pub split: Option<usize>,

    /// Directory receiving the parts and the final file
    #[arg(short, long)]
    pub dir: Option<PathBuf>,

    /// JSON config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub log_file: Option<String>,

    #[arg(short, long)]
    pub verbose: bool,

    /// Dump request and response headers
    #[arg(long)]
    pub dump_headers: bool,

    #[arg(long)]
    pub progress: bool,

    /// Accept any status and body length for parts
    #[arg(long)]
    pub no_strict: bool,
}
