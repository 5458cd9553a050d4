//! Fetch a batch of URLs into local files under one of three interchangeable
//! concurrency strategies: worker threads, worker processes, or cooperative
//! single-threaded futures.

pub mod download;

pub use download::config::RunnerConfig;
pub use download::download_task::{FetchOptions, FetchRequest, FetchResult};
pub use download::downloader::Runner;
pub use download::error::{FetchErrorKind, RunError};
pub use download::report::RunReport;
pub use download::scheduler::{Scheduler, Strategy};
