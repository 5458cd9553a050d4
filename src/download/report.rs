use std::time::Duration;

use log::info;

use crate::download::download_task::FetchResult;
use crate::download::scheduler::Strategy;

/// Aggregate of one run, built once every task has finished
#[derive(Debug, Clone)]
pub struct RunReport {
    strategy: Strategy,
    results: Vec<FetchResult>,
    elapsed: Duration,
}

impl RunReport {
    pub fn new(strategy: Strategy, results: Vec<FetchResult>, elapsed: Duration) -> Self {
        Self { strategy, results, elapsed }
    }

    pub fn empty(strategy: Strategy) -> Self {
        Self::new(strategy, Vec::new(), Duration::ZERO)
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Results in completion order, not input order
    pub fn results(&self) -> &[FetchResult] {
        &self.results
    }

    pub fn into_results(self) -> Vec<FetchResult> {
        self.results
    }

    /// Wall-clock time from first dispatch to last completion
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn get(&self, identifier: &str) -> Option<&FetchResult> {
        self.results.iter().find(|result| result.identifier() == identifier)
    }

    pub fn successes(&self) -> impl Iterator<Item = &FetchResult> {
        self.results.iter().filter(|result| result.is_success())
    }

    pub fn failures(&self) -> impl Iterator<Item = &FetchResult> {
        self.results.iter().filter(|result| !result.is_success())
    }

    pub fn success_count(&self) -> usize {
        self.successes().count()
    }

    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }

    pub fn total_bytes(&self) -> u64 {
        self.results
            .iter()
            .map(|result| match result {
                FetchResult::Success { byte_count, .. } => *byte_count,
                FetchResult::Failure { .. } => 0,
            })
            .sum()
    }

    /// One summary record per run
    pub fn log_summary(&self) {
        info!(
            "{} run of {} downloads finished in {:.2} seconds ({} failed)",
            self.strategy,
            self.len(),
            self.elapsed.as_secs_f64(),
            self.failure_count()
        );
    }
}
