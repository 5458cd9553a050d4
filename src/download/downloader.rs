use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use log::{debug, info};
use tokio::fs;

use crate::download::config::RunnerConfig;
use crate::download::download_task::{FetchOptions, FetchRequest};
use crate::download::error::RunError;
use crate::download::report::RunReport;
use crate::download::scheduler::{Scheduler, Strategy};
use crate::download::strategy::{CooperativeScheduler, ProcessScheduler, ThreadedScheduler};

/// Fetches a batch of identifiers under a chosen strategy.
/// Holds no state between runs besides its configuration.
pub struct Runner {
    config: RunnerConfig,
}

impl Runner {
    pub fn new(config: RunnerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    pub async fn run(&self, identifiers: &[String], strategy: Strategy) -> Result<RunReport, RunError> {
        if identifiers.is_empty() {
            return Ok(RunReport::empty(strategy));
        }

        let output_dir = &self.config.output_dir;
        fs::create_dir_all(output_dir)
            .await
            .map_err(|source| RunError::OutputDirectory { path: output_dir.clone(), source })?;

        let scheduler = self.scheduler(strategy)?;
        let requests: Vec<FetchRequest> = identifiers.iter().map(FetchRequest::new).collect();
        let options = Arc::new(FetchOptions::from(&self.config));

        info!("Downloading {} images - {}", requests.len(), strategy);
        let start = Instant::now();
        let results = scheduler.execute(requests, options).await;
        let report = RunReport::new(strategy, results, start.elapsed());

        debug_assert_eq!(report.len(), identifiers.len());
        report.log_summary();

        Ok(report)
    }

    fn scheduler(&self, strategy: Strategy) -> Result<Box<dyn Scheduler>, RunError> {
        let scheduler: Box<dyn Scheduler> = match strategy {
            Strategy::Threaded => Box::new(ThreadedScheduler),
            Strategy::Multiprocess => Box::new(ProcessScheduler::new(self.worker_program()?)),
            Strategy::Cooperative => Box::new(CooperativeScheduler),
        };

        Ok(scheduler)
    }

    fn worker_program(&self) -> Result<PathBuf, RunError> {
        let program = match &self.config.worker_program {
            Some(program) => program.clone(),
            None => std::env::current_exe().map_err(RunError::WorkerProgram)?,
        };
        debug!("Worker program: {}", program.display());

        Ok(program)
    }
}
