//!
//! Runner configuration
//!

use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CHUNK_SIZE: NonZeroUsize = match NonZeroUsize::new(1024) {
    Some(size) => size,
    None => unreachable!(),
};

pub const DEFAULT_OUTPUT_DIR: &str = "./images";

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct RunnerConfig {
    /// Directory receiving the artifacts, created on demand
    pub output_dir: PathBuf,
    /// Size of the pieces the body is written in
    pub chunk_size: NonZeroUsize,
    pub user_agent: String,
    /// Executable launched for each multiprocess worker, the current one when unset
    pub worker_program: Option<PathBuf>,
}

impl RunnerConfig {
    pub fn load_from_file(file_path: &Path) -> Result<Self> {
        let config_data = fs::read_to_string(file_path)
            .with_context(|| format!("Failed to read config file: {}", file_path.display()))?;
        let config: RunnerConfig = serde_json::from_str(&config_data)
            .with_context(|| format!("Failed to parse config file: {}", file_path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// `<config dir>/fetch-runner/config.json`
    pub fn default_path() -> Option<PathBuf> {
        let mut path = dirs::config_dir()?;
        path.push(env!("CARGO_PKG_NAME"));
        path.push("config.json");

        Some(path)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(!self.output_dir.as_os_str().is_empty(), "Output directory must not be empty");
        ensure!(!self.user_agent.trim().is_empty(), "User agent must not be empty");

        Ok(())
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            chunk_size: DEFAULT_CHUNK_SIZE,
            user_agent: format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
            worker_program: None,
        }
    }
}
