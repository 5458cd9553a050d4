use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use log::LevelFilter;

use fetch_runner::download::logger::setup_logger;
use fetch_runner::download::strategy::run_worker;
use fetch_runner::{FetchOptions, FetchRequest, Runner, RunnerConfig};

use crate::cli::{CliArgs, Command, WorkerArgs};

mod cli;

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();

    let outcome = match &args.command {
        Some(Command::Worker(worker)) => worker_main(worker).await,
        None => run_main(&args).await,
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run_main(args: &CliArgs) -> Result<()> {
    let level = if args.verbose { LevelFilter::Debug } else { LevelFilter::Info };
    setup_logger(level, args.log_file.as_deref()).context("Failed to set up logger")?;

    let config = load_config(args)?;
    let runner = Runner::new(config);

    for strategy in args.strategy.strategies() {
        runner.run(&args.urls, strategy).await?;
    }

    Ok(())
}

/// File config (explicit path, else the per-user default if present), then CLI overrides
fn load_config(args: &CliArgs) -> Result<RunnerConfig> {
    let mut config = match &args.config {
        Some(path) => RunnerConfig::load_from_file(path)?,
        None => match RunnerConfig::default_path().filter(|path| path.is_file()) {
            Some(path) => RunnerConfig::load_from_file(&path)?,
            None => RunnerConfig::default(),
        },
    };

    if let Some(output_dir) = &args.output_dir {
        config.output_dir = output_dir.clone();
    }
    if let Some(chunk_size) = args.chunk_size {
        config.chunk_size = chunk_size;
    }
    config.validate()?;

    Ok(config)
}

async fn worker_main(args: &WorkerArgs) -> Result<()> {
    let options = FetchOptions {
        output_dir: args.output_dir.clone(),
        chunk_size: args.chunk_size,
        user_agent: args.user_agent.clone(),
    };

    run_worker(FetchRequest::new(args.url.clone()), &options).await
}
