pub mod config;
pub mod logger;
pub mod downloader;
pub mod download_task;
pub mod error;
pub mod report;
pub mod scheduler;
pub mod strategy;
pub mod util;
