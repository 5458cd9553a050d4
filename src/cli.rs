use std::num::NonZeroUsize;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use fetch_runner::Strategy;

pub const DEFAULT_URLS: [&str; 2] = [
    "https://img3.fonwall.ru/o/fc/tree-nature-grass-swamp.jpeg",
    "https://img3.fonwall.ru/o/bx/nature-wilderness-wildlife-zoo.jpeg",
];

/// Download images by URL using threads, processes and cooperative futures
#[derive(Parser, Debug)]
#[command(author, version, about, args_conflicts_with_subcommands = true)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// URLs to download
    #[arg(short, long, num_args = 1.., default_values_t = DEFAULT_URLS.map(String::from))]
    pub urls: Vec<String>,

    #[arg(short, long, value_enum, default_value_t = StrategyChoice::All)]
    pub strategy: StrategyChoice,

    /// Directory receiving the images
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Bytes written per chunk
    #[arg(long)]
    pub chunk_size: Option<NonZeroUsize>,

    /// JSON config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Also append log records to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch a single URL and print the result as JSON (multiprocess child)
    #[command(hide = true)]
    Worker(WorkerArgs),
}

#[derive(Args, Debug)]
pub struct WorkerArgs {
    #[arg(long)]
    pub url: String,

    #[arg(long)]
    pub output_dir: PathBuf,

    #[arg(long)]
    pub chunk_size: NonZeroUsize,

    #[arg(long)]
    pub user_agent: String,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyChoice {
    Threaded,
    Multiprocess,
    Cooperative,
    All,
}

impl StrategyChoice {
    pub fn strategies(self) -> Vec<Strategy> {
        match self {
            StrategyChoice::Threaded => vec![Strategy::Threaded],
            StrategyChoice::Multiprocess => vec![Strategy::Multiprocess],
            StrategyChoice::Cooperative => vec![Strategy::Cooperative],
            StrategyChoice::All => Strategy::ALL.to_vec(),
        }
    }
}
