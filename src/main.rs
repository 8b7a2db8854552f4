use std::process::ExitCode;
use std::sync::Arc;
use anyhow::Result;
use clap::Parser;
use log::{error, LevelFilter};
use split_downloader::download::config::Config;
use split_downloader::download::downloader::Downloader;
use split_downloader::download::hook::{HookSet, LogHook, ProgressHook};
use split_downloader::download::logger::setup_logger;
use crate::cli::CliArgs;

mod cli;

fn load_config(args: &CliArgs) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load_from_file(path)?,
        None => Config::default(),
    };

    if args.split.is_some() {
        config.split_count = args.split;
    }
    if let Some(dir) = &args.dir {
        config.work_dir = dir.clone();
    }
    if args.no_strict {
        config.strict_chunk_check = false;
    }

    Ok(config)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = CliArgs::parse();

    let level = if args.verbose || args.dump_headers { LevelFilter::Debug } else { LevelFilter::Info };
    setup_logger(level, args.log_file.as_deref())?;

    let config = load_config(&args)?;
    let mut hooks = HookSet::new();
    if args.dump_headers {
        hooks.push(Arc::new(LogHook));
    }
    if args.progress {
        hooks.push(Arc::new(ProgressHook::new()));
    }

    let mut downloader = Downloader::new(reqwest::Client::new(), config);
    if !hooks.is_empty() {
        downloader = downloader.with_hook(Arc::new(hooks));
    }

    match downloader.download(&args.url).await {
        Ok(path) => {
            println!("Downloaded to {}", path.display());
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            error!("{}", err);
            Ok(ExitCode::FAILURE)
        }
    }
}
